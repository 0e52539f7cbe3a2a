//! The `error` module defines the error types used within the `cmdbroker`
//! application.
//!
//! `BrokerError` covers both the caller-facing failures of the queue boundary
//! (validation, authorization, malformed requests) and the ambient failures
//! of running the server (I/O, WebSocket, JSON, configuration).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine-readable failure class sent to clients in `error` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Validation,
    BadRequest,
    /// Local failures (I/O, WebSocket, configuration). The request handler
    /// never answers with it; it only classifies errors on this side.
    Internal,
}

#[derive(Debug, Error)]
pub enum BrokerError {
    /// A required identifying field was missing or empty.
    #[error("{0}")]
    Validation(String),

    /// The caller's credential did not match the shared secret.
    #[error("unauthorized")]
    Unauthorized,

    /// The request frame could not be understood.
    #[error("invalid request: {0}")]
    Protocol(String),

    /// The broker answered a client request with an error response.
    #[error("broker returned {code:?}: {message}")]
    Remote { code: ErrorCode, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BrokerError {
    /// The wire code reported to clients for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            BrokerError::Validation(_) => ErrorCode::Validation,
            BrokerError::Unauthorized => ErrorCode::Unauthorized,
            BrokerError::Protocol(_) | BrokerError::Json(_) => ErrorCode::BadRequest,
            BrokerError::Remote { code, .. } => *code,
            BrokerError::Config(_) | BrokerError::Io(_) | BrokerError::WebSocket(_) => {
                ErrorCode::Internal
            }
        }
    }
}
