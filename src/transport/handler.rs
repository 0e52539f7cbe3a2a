//! Request handling
//!
//! Turns one decoded `ClientRequest` into one `ServerMessage`. The credential
//! is checked here, before the broker is touched; only `health` is exempt.
//! Device validation also happens here, so the broker only ever sees valid
//! `DeviceId`s.

use chrono::Utc;

use crate::broker::{CommandBroker, DeviceId, NewCommand};
use crate::transport::message::{ClientMessage, ClientRequest, Listing, ServerMessage};
use crate::utils::BrokerError;

/// Decodes a text frame into a request.
pub fn parse_request(text: &str) -> Result<ClientRequest, BrokerError> {
    serde_json::from_str(text).map_err(|e| BrokerError::Protocol(e.to_string()))
}

/// Decodes and handles a text frame. Decoding failures become `error` replies.
pub fn handle_text(broker: &CommandBroker, api_key: &str, text: &str) -> ServerMessage {
    match parse_request(text) {
        Ok(request) => handle_request(broker, api_key, request),
        Err(err) => error_reply(&err),
    }
}

pub fn handle_request(broker: &CommandBroker, api_key: &str, request: ClientRequest) -> ServerMessage {
    dispatch(broker, api_key, request).unwrap_or_else(|err| error_reply(&err))
}

/// Compares the presented credential with the shared secret.
pub fn authorize(expected: &str, presented: Option<&str>) -> Result<(), BrokerError> {
    match presented {
        Some(key) if key == expected => Ok(()),
        _ => Err(BrokerError::Unauthorized),
    }
}

pub fn error_reply(err: &BrokerError) -> ServerMessage {
    ServerMessage::Error {
        code: err.code(),
        message: err.to_string(),
    }
}

fn dispatch(
    broker: &CommandBroker,
    api_key: &str,
    request: ClientRequest,
) -> Result<ServerMessage, BrokerError> {
    let ClientRequest {
        api_key: presented,
        message,
    } = request;

    if !matches!(message, ClientMessage::Health) {
        authorize(api_key, presented.as_deref())?;
    }

    match message {
        ClientMessage::Submit {
            device,
            intent,
            params,
            ttl,
        } => {
            let device = DeviceId::from_optional(device)?;
            let command = broker.submit(&device, NewCommand { intent, params, ttl });
            Ok(ServerMessage::Queued {
                id: command.id().to_string(),
                queued_for: device.to_string(),
            })
        }
        ClientMessage::Poll { device } => {
            let device = DeviceId::from_optional(device)?;
            Ok(ServerMessage::Next {
                command: broker.poll_next(&device),
            })
        }
        ClientMessage::List { device } => {
            let commands = match optional_device(device) {
                Some(device) => Listing::Device(broker.list(&device)),
                None => Listing::All(broker.list_all()),
            };
            Ok(ServerMessage::Commands { commands })
        }
        ClientMessage::Clear { device } => {
            let device = optional_device(device);
            match &device {
                Some(device) => broker.clear(device),
                None => broker.clear_all(),
            }
            Ok(ServerMessage::Cleared {
                device: device.map(|d| d.to_string()),
            })
        }
        ClientMessage::Health => {
            let stats = broker.stats();
            Ok(ServerMessage::Health {
                ok: true,
                time: Utc::now(),
                devices: stats.devices,
                pending: stats.pending,
            })
        }
    }
}

// An empty device on list/clear means "every device".
fn optional_device(device: Option<String>) -> Option<DeviceId> {
    device.and_then(|d| DeviceId::new(d).ok())
}
