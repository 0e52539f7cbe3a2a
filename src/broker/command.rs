//! Command definitions for the broker
//!
//! `Command` is the unit of work queued for a device. The queue never looks
//! inside `intent` or `params`; only the device-side consumer interprets them.
//!
//! Notes on fields:
//! - `id`: UUID v4 string assigned by `CommandFactory`
//! - `intent`: action name chosen by the producer, may be absent
//! - `params`: opaque JSON object, insertion order preserved
//! - `created_at`: UTC time read once when the command is built
//! - `ttl`: validity window in seconds, fractions allowed; `0` or negative
//!   never expires

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::broker::clock::{Clock, SystemClock};
use crate::utils::BrokerError;

pub type CommandId = String;

/// Loosely-typed command payload.
pub type Params = serde_json::Map<String, Value>;

/// TTL applied when neither the producer nor the configuration gives one.
pub const DEFAULT_TTL_SECS: f64 = 300.0;

/// Identifier of a device queue. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Result<Self, BrokerError> {
        let id = id.into();
        if id.is_empty() {
            return Err(BrokerError::Validation("device required".to_string()));
        }
        Ok(Self(id))
    }

    /// Validates an optional wire field. Absent and empty are both rejected.
    pub fn from_optional(id: Option<String>) -> Result<Self, BrokerError> {
        match id {
            Some(id) => Self::new(id),
            None => Err(BrokerError::Validation("device required".to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    id: CommandId,
    intent: Option<String>,
    #[serde(default)]
    params: Params,
    created_at: DateTime<Utc>,
    ttl: f64,
}

impl Command {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl(&self) -> f64 {
        self.ttl
    }

    /// Whether the command is past its TTL at `now`.
    ///
    /// Only a strictly longer interval expires: a command polled exactly
    /// `ttl` seconds after creation is still deliverable.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.ttl <= 0.0 {
            return false;
        }
        match ttl_window(self.ttl) {
            Some(ttl) => now.signed_duration_since(self.created_at) > ttl,
            // A TTL too large to represent never runs out.
            None => false,
        }
    }
}

/// Converts TTL seconds to a window with microsecond precision.
fn ttl_window(ttl: f64) -> Option<TimeDelta> {
    let micros = (ttl * 1_000_000.0).round();
    if !micros.is_finite() || micros >= i64::MAX as f64 {
        return None;
    }
    Some(TimeDelta::microseconds(micros as i64))
}

/// The producer-supplied part of a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCommand {
    pub intent: Option<String>,
    pub params: Option<Params>,
    pub ttl: Option<f64>,
}

impl NewCommand {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: Some(intent.into()),
            ..Self::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params
            .get_or_insert_with(Params::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_ttl(mut self, ttl: f64) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Builds well-formed commands: fresh id, creation time, TTL default.
#[derive(Debug, Clone)]
pub struct CommandFactory {
    clock: Arc<dyn Clock>,
    default_ttl: f64,
}

impl CommandFactory {
    pub fn new(default_ttl: f64) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: f64, clock: Arc<dyn Clock>) -> Self {
        Self { clock, default_ttl }
    }

    pub fn default_ttl(&self) -> f64 {
        self.default_ttl
    }

    /// Turns a producer request into a command. Touches no queue.
    pub fn create(&self, request: NewCommand) -> Command {
        Command {
            id: Uuid::new_v4().to_string(),
            intent: request.intent,
            params: request.params.unwrap_or_default(),
            created_at: self.clock.now(),
            ttl: request.ttl.unwrap_or(self.default_ttl),
        }
    }
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
