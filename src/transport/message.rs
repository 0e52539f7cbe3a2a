//! Wire protocol
//!
//! Every request is one JSON text frame, internally tagged by `type`, with
//! the caller's credential alongside:
//!
//! ```json
//! {"type": "submit", "api_key": "...", "device": "lamp-1", "intent": "on", "ttl": 300}
//! {"type": "poll", "api_key": "...", "device": "lamp-1"}
//! {"type": "list", "api_key": "..."}
//! {"type": "clear", "api_key": "...", "device": "lamp-1"}
//! {"type": "health"}
//! ```
//!
//! The broker answers each request with exactly one `ServerMessage` frame.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::broker::{Command, CommandId, Params};
use crate::utils::ErrorCode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub message: ClientMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Submit {
        #[serde(default)]
        device: Option<String>,
        #[serde(default)]
        intent: Option<String>,
        #[serde(default)]
        params: Option<Params>,
        #[serde(default)]
        ttl: Option<f64>,
    },
    Poll {
        #[serde(default)]
        device: Option<String>,
    },
    /// Without a device, lists every queue.
    List {
        #[serde(default)]
        device: Option<String>,
    },
    /// Without a device, clears every queue.
    Clear {
        #[serde(default)]
        device: Option<String>,
    },
    Health,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Queued {
        id: CommandId,
        queued_for: String,
    },
    Next {
        command: Option<Command>,
    },
    Commands {
        commands: Listing,
    },
    Cleared {
        device: Option<String>,
    },
    Health {
        ok: bool,
        time: DateTime<Utc>,
        devices: usize,
        pending: usize,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

/// A single queue or every queue keyed by device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Listing {
    Device(Vec<Command>),
    All(BTreeMap<String, Vec<Command>>),
}
