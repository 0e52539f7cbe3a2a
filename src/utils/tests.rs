use super::error::{BrokerError, ErrorCode};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warning");
    logging::init("nonsense");
}

#[test]
fn test_error_codes() {
    assert_eq!(
        BrokerError::Validation("device required".into()).code(),
        ErrorCode::Validation
    );
    assert_eq!(BrokerError::Unauthorized.code(), ErrorCode::Unauthorized);
    assert_eq!(
        BrokerError::Protocol("bad frame".into()).code(),
        ErrorCode::BadRequest
    );

    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert_eq!(BrokerError::from(json_err).code(), ErrorCode::BadRequest);
}

#[test]
fn test_local_failures_are_internal() {
    let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
    assert_eq!(BrokerError::from(io_err).code(), ErrorCode::Internal);
}

#[test]
fn test_error_code_wire_names() {
    let code = serde_json::to_string(&ErrorCode::BadRequest).unwrap();
    assert_eq!(code, "\"bad_request\"");
    let parsed: ErrorCode = serde_json::from_str("\"unauthorized\"").unwrap();
    assert_eq!(parsed, ErrorCode::Unauthorized);
}

#[test]
fn test_validation_message_is_displayed_verbatim() {
    let err = BrokerError::Validation("device required".into());
    assert_eq!(err.to_string(), "device required");
}
