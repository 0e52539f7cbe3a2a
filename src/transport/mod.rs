//! The `transport` module is responsible for handling network communication
//! with producers and devices via WebSockets.
//!
//! It defines the request/response protocol, the request handler that
//! enforces the shared-secret credential and device validation, and the
//! WebSocket server itself.

pub mod handler;
pub mod message;
pub mod websocket;


#[cfg(test)]
mod websocket_tests;
