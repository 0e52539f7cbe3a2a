use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::broker::{CommandBroker, NewCommand};
use crate::client::BrokerClient;
use crate::config::Settings;
use crate::transport::message::ServerMessage;
use crate::transport::websocket::serve;
use crate::utils::{BrokerError, ErrorCode};

const KEY: &str = "ws_test_secret";

async fn start_server_with(max_connections: usize) -> (String, Arc<CommandBroker>) {
    let mut settings = Settings::default();
    settings.server.api_key = KEY.to_string();
    settings.server.max_connections = max_connections;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("local_addr");
    let broker = Arc::new(CommandBroker::from_settings(&settings.queue));

    tokio::spawn(serve(listener, broker.clone(), settings.server));

    (format!("ws://{addr}"), broker)
}

async fn start_server() -> (String, Arc<CommandBroker>) {
    start_server_with(16).await
}

#[tokio::test]
async fn test_submit_poll_round_trip() {
    let (url, _broker) = start_server().await;
    let mut producer = BrokerClient::connect(&url, KEY).await.expect("connect");
    let mut lamp = BrokerClient::connect(&url, KEY).await.expect("connect");

    let id = producer
        .submit("lamp-1", NewCommand::new("on").with_ttl(300.0))
        .await
        .expect("submit");

    let command = lamp
        .poll_next("lamp-1")
        .await
        .expect("poll")
        .expect("Expected a queued command");
    assert_eq!(command.id(), id);
    assert_eq!(command.intent(), Some("on"));

    assert!(lamp.poll_next("lamp-1").await.expect("poll").is_none());

    producer.close().await.expect("close");
    lamp.close().await.expect("close");
}

#[tokio::test]
async fn test_expired_commands_are_not_delivered() {
    let (url, broker) = start_server().await;
    let mut client = BrokerClient::connect(&url, KEY).await.expect("connect");

    for _ in 0..2 {
        client
            .submit("cam-2", NewCommand::new("snap").with_ttl(1.0))
            .await
            .expect("submit");
    }
    assert_eq!(broker.stats().pending, 2);

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(client.poll_next("cam-2").await.expect("poll").is_none());
    assert!(client.list("cam-2").await.expect("list").is_empty());
}

#[tokio::test]
async fn test_wrong_key_is_rejected_and_connection_survives() {
    let (url, broker) = start_server().await;
    let mut intruder = BrokerClient::connect(&url, "guess").await.expect("connect");

    match intruder.submit("lamp-1", NewCommand::new("on")).await {
        Err(BrokerError::Remote { code, .. }) => assert_eq!(code, ErrorCode::Unauthorized),
        other => panic!("Expected unauthorized, got {other:?}"),
    }
    assert_eq!(broker.stats().pending, 0);

    // health is open and the same connection still answers
    let stats = intruder.health().await.expect("health");
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_empty_device_is_validation_error() {
    let (url, _broker) = start_server().await;
    let mut client = BrokerClient::connect(&url, KEY).await.expect("connect");

    match client.poll_next("").await {
        Err(BrokerError::Remote { code, message }) => {
            assert_eq!(code, ErrorCode::Validation);
            assert_eq!(message, "device required");
        }
        other => panic!("Expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_anonymous_health() {
    let (url, broker) = start_server().await;
    broker.submit(
        &crate::broker::DeviceId::new("lamp-1").unwrap(),
        NewCommand::new("on"),
    );

    let mut client = BrokerClient::connect_anonymous(&url).await.expect("connect");
    let stats = client.health().await.expect("health");
    assert_eq!(stats.devices, 1);
    assert_eq!(stats.pending, 1);

    match client.list_all().await {
        Err(BrokerError::Remote { code, .. }) => assert_eq!(code, ErrorCode::Unauthorized),
        other => panic!("Expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_and_clear_over_the_wire() {
    let (url, _broker) = start_server().await;
    let mut client = BrokerClient::connect(&url, KEY).await.expect("connect");

    client.submit("lamp-1", NewCommand::new("on")).await.unwrap();
    client.submit("lamp-1", NewCommand::new("off")).await.unwrap();
    client.submit("cam-2", NewCommand::new("snap")).await.unwrap();

    let lamp: Vec<_> = client
        .list("lamp-1")
        .await
        .unwrap()
        .iter()
        .map(|c| c.intent().map(str::to_string))
        .collect();
    assert_eq!(lamp, vec![Some("on".to_string()), Some("off".to_string())]);

    let all = client.list_all().await.unwrap();
    assert_eq!(all.len(), 2);

    client.clear(Some("lamp-1")).await.unwrap();
    assert!(client.list("lamp-1").await.unwrap().is_empty());
    assert_eq!(client.list("cam-2").await.unwrap().len(), 1);

    client.clear(None).await.unwrap();
    assert!(client.list_all().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pollers_never_share_a_command() {
    const N: usize = 12;
    let (url, _broker) = start_server().await;

    let mut producer = BrokerClient::connect(&url, KEY).await.expect("connect");
    let mut expected = HashSet::new();
    for i in 0..N {
        let id = producer
            .submit("lamp-1", NewCommand::new(format!("step-{i}")))
            .await
            .unwrap();
        expected.insert(id);
    }

    let mut pollers = tokio::task::JoinSet::new();
    for _ in 0..N {
        let url = url.clone();
        pollers.spawn(async move {
            let mut device = BrokerClient::connect(&url, KEY).await.expect("connect");
            device.poll_next("lamp-1").await.expect("poll")
        });
    }

    let mut received = Vec::new();
    while let Some(res) = pollers.join_next().await {
        if let Some(command) = res.unwrap() {
            received.push(command.id().to_string());
        }
    }

    assert_eq!(received.len(), N);
    let unique: HashSet<String> = received.into_iter().collect();
    assert_eq!(unique, expected);
}

#[tokio::test]
async fn test_raw_frames() {
    let (url, _broker) = start_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .expect("WebSocket handshake failed");

    ws.send(WsMessage::text("{ nope".to_string())).await.unwrap();
    let reply = ws.next().await.expect("reply").unwrap();
    let parsed: ServerMessage = serde_json::from_slice(&reply.into_data()).unwrap();
    match parsed {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::BadRequest),
        other => panic!("Expected bad_request, got {other:?}"),
    }

    ws.send(WsMessage::binary(vec![1u8, 2, 3])).await.unwrap();
    let reply = ws.next().await.expect("reply").unwrap();
    let parsed: ServerMessage = serde_json::from_slice(&reply.into_data()).unwrap();
    match parsed {
        ServerMessage::Error { code, .. } => assert_eq!(code, ErrorCode::BadRequest),
        other => panic!("Expected bad_request, got {other:?}"),
    }

    let poll = serde_json::json!({"type": "poll", "api_key": KEY, "device": "lamp-1"});
    ws.send(WsMessage::text(poll.to_string())).await.unwrap();
    let reply = ws.next().await.expect("reply").unwrap();
    let parsed: ServerMessage = serde_json::from_slice(&reply.into_data()).unwrap();
    assert_eq!(parsed, ServerMessage::Next { command: None });
}

#[tokio::test]
async fn test_connection_limit() {
    let (url, _broker) = start_server_with(1).await;

    let mut first = BrokerClient::connect(&url, KEY).await.expect("connect");
    first.health().await.expect("health");

    // the second connection is closed before the handshake completes
    assert!(BrokerClient::connect(&url, KEY).await.is_err());

    first.close().await.expect("close");
    // the slot is released once the first connection's task finishes
    let mut reconnected = None;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if let Ok(client) = BrokerClient::connect(&url, KEY).await {
            reconnected = Some(client);
            break;
        }
    }
    let mut client = reconnected.expect("slot was never released");
    client.health().await.expect("health");
}
