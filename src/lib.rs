//! # cmdbroker
//!
//! `cmdbroker` is an in-memory command broker. Producers submit intents for a
//! device ("turn on lamp-1"), and the device polls the broker for its queued
//! commands over WebSockets.
//!
//! ## Core Modules
//!
//! - `broker`: per-device command queues with TTL expiry, and the factory
//!   that builds commands.
//! - `client`: async client for producers and polling devices.
//! - `config`: loads server, queue and logging settings.
//! - `transport`: the WebSocket protocol, request handling and server.
//! - `utils`: error types and logging bootstrap.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;
