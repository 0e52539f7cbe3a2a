//! Per-device command queues
//!
//! `QueueStore` maps each device to a FIFO of pending commands. It is safe to
//! share across tasks without an outer lock: the map is sharded, and every
//! read-modify-write on one device queue happens under that shard's write
//! lock, so two concurrent dequeues can never hand out the same command.
//!
//! Expired commands are evicted lazily. Nothing sweeps the queues in the
//! background; `dequeue_next` drops expired entries of the polled device as
//! a side effect, and that mutation sticks even when no valid command is left.
//!
//! Unknown devices behave as empty queues everywhere. Querying one does not
//! create an entry.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::broker::clock::{Clock, SystemClock};
use crate::broker::command::{Command, DeviceId};

#[derive(Debug)]
pub struct QueueStore {
    queues: DashMap<String, VecDeque<Command>>,
    clock: Arc<dyn Clock>,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            queues: DashMap::new(),
            clock,
        }
    }

    /// Appends `command` to the tail of the device's queue.
    pub fn enqueue(&self, device: &DeviceId, command: Command) {
        self.queues
            .entry(device.as_str().to_owned())
            .or_default()
            .push_back(command);
    }

    /// Builds a command while holding the device's entry guard and appends it.
    ///
    /// Reading the clock inside `build` under the guard keeps `created_at`
    /// non-decreasing along each queue, even with producers racing on the
    /// same device.
    pub fn enqueue_with<F>(&self, device: &DeviceId, build: F) -> Command
    where
        F: FnOnce() -> Command,
    {
        let mut queue = self.queues.entry(device.as_str().to_owned()).or_default();
        let command = build();
        queue.push_back(command.clone());
        command
    }

    /// Evicts expired commands of `device`, then pops the oldest remaining one.
    ///
    /// The clock is read once so every entry is judged against the same
    /// instant.
    pub fn dequeue_next(&self, device: &DeviceId) -> Option<Command> {
        let now = self.clock.now();
        let mut queue = self.queues.get_mut(device.as_str())?;

        let before = queue.len();
        queue.retain(|command| !command.is_expired(now));
        let evicted = before - queue.len();
        if evicted > 0 {
            debug!(device = %device, evicted, "evicted expired commands");
        }

        queue.pop_front()
    }

    /// Raw snapshot of one queue, expired entries included.
    pub fn list(&self, device: &DeviceId) -> Vec<Command> {
        self.queues
            .get(device.as_str())
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Raw snapshot of every queue, keyed by device.
    pub fn list_all(&self) -> BTreeMap<String, Vec<Command>> {
        self.queues
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().iter().cloned().collect()))
            .collect()
    }

    /// Empties one queue. The device key is kept.
    pub fn clear(&self, device: &DeviceId) {
        if let Some(mut queue) = self.queues.get_mut(device.as_str()) {
            queue.clear();
        }
    }

    /// Drops every queue.
    pub fn clear_all(&self) {
        self.queues.clear();
    }

    /// Number of stored commands for `device`, expired ones included.
    pub fn len(&self, device: &DeviceId) -> usize {
        self.queues
            .get(device.as_str())
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, device: &DeviceId) -> bool {
        self.len(device) == 0
    }

    pub fn device_count(&self) -> usize {
        self.queues.len()
    }

    pub fn pending_total(&self) -> usize {
        self.queues.iter().map(|entry| entry.value().len()).sum()
    }
}

impl Default for QueueStore {
    fn default() -> Self {
        Self::new()
    }
}
