//! Broker engine
//!
//! `CommandBroker` is the service the transport talks to. It owns:
//! - the `CommandFactory` that stamps ids, creation times and TTLs
//! - the `QueueStore` holding every device queue
//!
//! Concurrency and usage notes:
//! - All methods take `&self`; share the broker as `Arc<CommandBroker>`.
//!   No outer lock is needed, and operations on different devices do not
//!   wait on each other.
//! - Polling never blocks. A device with nothing deliverable gets `None`
//!   right away and is expected to poll again later.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::broker::clock::{Clock, SystemClock};
use crate::broker::command::{Command, CommandFactory, DeviceId, NewCommand};
use crate::broker::queue::QueueStore;
use crate::config::QueueSettings;

/// Point-in-time counters over the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    pub devices: usize,
    pub pending: usize,
}

#[derive(Debug)]
pub struct CommandBroker {
    factory: CommandFactory,
    store: QueueStore,
}

impl CommandBroker {
    pub fn new(default_ttl: f64) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Builds a broker whose factory and store share `clock`.
    pub fn with_clock(default_ttl: f64, clock: Arc<dyn Clock>) -> Self {
        Self {
            factory: CommandFactory::with_clock(default_ttl, clock.clone()),
            store: QueueStore::with_clock(clock),
        }
    }

    pub fn from_settings(settings: &QueueSettings) -> Self {
        Self::new(settings.default_ttl_secs)
    }

    /// Creates a command from `request` and queues it for `device`.
    pub fn submit(&self, device: &DeviceId, request: NewCommand) -> Command {
        let command = self
            .store
            .enqueue_with(device, || self.factory.create(request));
        info!(
            device = %device,
            command_id = command.id(),
            intent = command.intent().unwrap_or_default(),
            ttl = command.ttl(),
            "command queued"
        );
        command
    }

    /// Hands out the oldest deliverable command for `device`, if any.
    pub fn poll_next(&self, device: &DeviceId) -> Option<Command> {
        let next = self.store.dequeue_next(device);
        match &next {
            Some(command) => info!(device = %device, command_id = command.id(), "command delivered"),
            None => debug!(device = %device, "no command pending"),
        }
        next
    }

    pub fn list(&self, device: &DeviceId) -> Vec<Command> {
        self.store.list(device)
    }

    pub fn list_all(&self) -> BTreeMap<String, Vec<Command>> {
        self.store.list_all()
    }

    pub fn clear(&self, device: &DeviceId) {
        self.store.clear(device);
        info!(device = %device, "queue cleared");
    }

    pub fn clear_all(&self) {
        self.store.clear_all();
        info!("all queues cleared");
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            devices: self.store.device_count(),
            pending: self.store.pending_total(),
        }
    }

    pub fn store(&self) -> &QueueStore {
        &self.store
    }

    pub fn factory(&self) -> &CommandFactory {
        &self.factory
    }
}

impl Default for CommandBroker {
    fn default() -> Self {
        Self::from_settings(&QueueSettings {
            default_ttl_secs: crate::broker::command::DEFAULT_TTL_SECS,
        })
    }
}
