//! The `client` module provides an async client for the broker protocol.
//!
//! Producers use it to submit commands; devices use it to poll for their own
//! queued work. Each call sends one request frame and waits for its reply.

pub mod broker_client;
pub use broker_client::BrokerClient;

#[cfg(test)]
mod tests;
