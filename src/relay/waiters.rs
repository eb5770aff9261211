//! Registry of pollers parked until the next append.
//!
//! Each waiter owns the sending half of a `oneshot` channel. Resolution means
//! removing the waiter from the map and consuming that sender, so whichever
//! path gets there first (notify, expire, cancel) is the only one that can
//! answer the poller. The registry itself is not synchronized; it is owned by
//! a relay and only touched while the relay's lock is held.

use std::collections::HashMap;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::relay::log::{Cursor, MessageLog};
use crate::relay::message::Message;

pub type WaiterId = String;

#[derive(Debug)]
struct Waiter {
    cursor: Cursor,
    tx: oneshot::Sender<Vec<Message>>,
}

/// A freshly registered waiter: its id, for expiry or cancellation, and the
/// receiver the poller awaits.
#[derive(Debug)]
pub struct Registration {
    pub id: WaiterId,
    pub rx: oneshot::Receiver<Vec<Message>>,
}

#[derive(Debug, Default)]
pub struct WaiterRegistry {
    waiters: HashMap<WaiterId, Waiter>,
}

impl WaiterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            waiters: HashMap::new(),
        }
    }

    /// Parks a poller positioned at `cursor`.
    pub fn register(&mut self, cursor: impl Into<Cursor>) -> Registration {
        let cursor = cursor.into();
        let id = format!("waiter-{}", Uuid::new_v4());
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id.clone(), Waiter { cursor, tx });
        tracing::trace!(waiter = %id, ?cursor, "registered waiter");
        Registration { id, rx }
    }

    /// Resolves and removes every registered waiter.
    ///
    /// Each waiter's batch is recomputed against its own cursor, so a waiter
    /// positioned past the latest append is answered with an empty batch.
    /// Returns the number of waiters resolved.
    pub fn notify_all(&mut self, log: &MessageLog) -> usize {
        let mut resolved = 0;

        for (id, waiter) in self.waiters.drain() {
            let batch = log.after(waiter.cursor);
            if waiter.tx.send(batch).is_err() {
                tracing::trace!(waiter = %id, "poller left before delivery");
            }
            resolved += 1;
        }

        resolved
    }

    /// Resolves the waiter with an empty batch because its deadline passed.
    ///
    /// Returns `false` when the waiter was already resolved some other way.
    pub fn expire(&mut self, id: &WaiterId) -> bool {
        match self.waiters.remove(id) {
            Some(waiter) => {
                let _ = waiter.tx.send(Vec::new());
                tracing::trace!(waiter = %id, "waiter timed out");
                true
            }
            None => false,
        }
    }

    /// Drops the waiter without answering it.
    pub fn cancel(&mut self, id: &WaiterId) -> bool {
        self.waiters.remove(id).is_some()
    }

    /// Resolves every outstanding waiter with an empty batch.
    pub fn cancel_all(&mut self) -> usize {
        let released = self.waiters.len();
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.tx.send(Vec::new());
        }
        released
    }

    /// `true` while the waiter is parked.
    pub fn contains(&self, id: &WaiterId) -> bool {
        self.waiters.contains_key(id)
    }

    /// Number of parked waiters.
    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    /// `true` when no waiter is parked.
    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
