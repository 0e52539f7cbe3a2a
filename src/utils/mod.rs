//! The `utils` module provides shared definitions used across the `cmdbroker`
//! application.
//!
//! It holds the crate-wide error type and the logging bootstrap so that the
//! broker core, the transport and the binary report failures the same way.

pub mod error;
pub mod logging;

pub use error::{BrokerError, ErrorCode};

#[cfg(test)]
mod tests;
