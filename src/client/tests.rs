use super::broker_client::into_result;
use crate::transport::message::ServerMessage;
use crate::utils::{BrokerError, ErrorCode};

#[test]
fn test_error_reply_becomes_remote_error() {
    let reply = ServerMessage::Error {
        code: ErrorCode::Unauthorized,
        message: "unauthorized".to_string(),
    };
    match into_result(reply) {
        Err(BrokerError::Remote { code, message }) => {
            assert_eq!(code, ErrorCode::Unauthorized);
            assert_eq!(message, "unauthorized");
        }
        other => panic!("Expected remote error, got {other:?}"),
    }
}

#[test]
fn test_regular_reply_passes_through() {
    let reply = ServerMessage::Next { command: None };
    assert_eq!(into_result(reply.clone()).unwrap(), reply);
}
