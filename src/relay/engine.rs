//! Relay engine
//!
//! A `Relay` is one independently addressable channel ("messages",
//! "commands", ...). It owns a `MessageLog` and a `WaiterRegistry` behind a
//! single mutex, which gives every operation the same ordering a
//! single-threaded event loop would:
//! - `publish` appends and notifies waiters without releasing the lock, so a
//!   resolved waiter sees the triggering append and nothing after it
//! - `fetch` either answers from the log right away or parks a waiter and
//!   suspends until the next publish, a clear, or the end of the wait window
//! - `clear` empties the log and releases every parked waiter with `[]`
//!
//! The lock is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;

use crate::relay::log::{Cursor, MessageLog};
use crate::relay::message::Message;
use crate::relay::waiters::{Registration, WaiterId, WaiterRegistry};

/// How long, in milliseconds, a poll is held open before it is answered with `[]`.
pub const DEFAULT_WAIT_WINDOW_MS: u64 = 100_000;

pub const DEFAULT_WAIT_WINDOW: Duration = Duration::from_millis(DEFAULT_WAIT_WINDOW_MS);

#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// When `false`, a fetch without a cursor only ever sees messages
    /// appended after the fetch began.
    pub persist: bool,
    pub wait_window: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            persist: true,
            wait_window: DEFAULT_WAIT_WINDOW,
        }
    }
}

#[derive(Debug, Default)]
struct RelayState {
    log: MessageLog,
    waiters: WaiterRegistry,
}

/// Cheaply cloneable handle to one relay channel.
#[derive(Debug, Clone)]
pub struct Relay {
    name: Arc<str>,
    options: RelayOptions,
    state: Arc<Mutex<RelayState>>,
}

impl Relay {
    /// Creates a relay with an empty log, mounted at `/<name>` by the transport.
    pub fn new(name: &str, options: RelayOptions) -> Self {
        Self {
            name: Arc::from(name),
            options,
            state: Arc::new(Mutex::new(RelayState::default())),
        }
    }

    /// Channel name, e.g. `messages`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether a fetch without a cursor may return history.
    pub fn persist(&self) -> bool {
        self.options.persist
    }

    /// How long a fetch stays parked before answering `[]`.
    pub fn wait_window(&self) -> Duration {
        self.options.wait_window
    }

    /// Number of messages currently in the log.
    pub fn len(&self) -> usize {
        self.lock().log.len()
    }

    /// `true` when the log holds no messages.
    pub fn is_empty(&self) -> bool {
        self.lock().log.is_empty()
    }

    /// Number of polls currently parked.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Snapshot of the log after `since`, without waiting.
    pub fn since(&self, since: Option<i64>) -> Vec<Message> {
        self.lock().log.since(since)
    }

    /// Long-poll fetch.
    ///
    /// Returns immediately when the log already holds messages past the
    /// effective cursor. Otherwise parks until the next publish (answered with
    /// whatever that publish left past the cursor, possibly nothing), a clear,
    /// or the end of the wait window; the last two yield an empty batch.
    ///
    /// On a relay that does not persist, a fetch without `since` is
    /// positioned at the log's next id, so it sees exactly the messages
    /// appended after it began, whatever their timestamps.
    pub async fn fetch(&self, since: Option<i64>) -> Vec<Message> {
        let Registration { id, mut rx } = {
            let mut state = self.lock();
            let cursor = self.effective_cursor(since, &state.log);
            let matches = state.log.after(cursor);
            if !matches.is_empty() {
                return matches;
            }
            state.waiters.register(cursor)
        };

        let mut guard = WaiterGuard {
            relay: self,
            id: Some(id),
        };

        let batch = match tokio::time::timeout(self.options.wait_window, &mut rx).await {
            Ok(delivered) => delivered.unwrap_or_default(),
            Err(_) => {
                if let Some(id) = guard.id.as_ref() {
                    self.lock().waiters.expire(id);
                }
                // The sender is gone from the registry either way: expire just
                // answered `[]`, or a publish got there first.
                rx.await.unwrap_or_default()
            }
        };

        guard.disarm();
        batch
    }

    /// Appends a message and answers every parked poll against its own cursor.
    pub fn publish(
        &self,
        payload: impl Into<String>,
        kind: impl Into<String>,
        session_token: Value,
    ) -> Message {
        let mut state = self.lock();
        let message = state
            .log
            .append(payload.into(), kind.into(), session_token);
        let RelayState { log, waiters } = &mut *state;
        let woken = waiters.notify_all(log);
        tracing::debug!(
            relay = %self.name,
            id = message.id,
            kind = %message.kind,
            woken,
            "appended message"
        );
        message
    }

    /// Empties the log and answers every parked poll with `[]`.
    ///
    /// Returns the number of polls released.
    pub fn clear(&self) -> usize {
        let mut state = self.lock();
        let dropped = state.log.len();
        state.log.clear();
        let released = state.waiters.cancel_all();
        tracing::debug!(relay = %self.name, dropped, released, "cleared log");
        released
    }

    fn effective_cursor(&self, since: Option<i64>, log: &MessageLog) -> Cursor {
        match since {
            Some(t) => Cursor::Time(t),
            None if !self.options.persist => Cursor::AfterId(log.next_id()),
            None => Cursor::All,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RelayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a parked waiter if the fetch future is dropped before it resolves,
/// e.g. when the HTTP client disconnects.
struct WaiterGuard<'a> {
    relay: &'a Relay,
    id: Option<WaiterId>,
}

impl WaiterGuard<'_> {
    fn disarm(&mut self) {
        self.id = None;
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            if self.relay.lock().waiters.cancel(&id) {
                tracing::trace!(relay = %self.relay.name, waiter = %id, "poller went away");
            }
        }
    }
}
