//! Append-only, in-process message storage for a single relay.
//!
//! The log assigns ids and receive timestamps. Ids come from a counter that
//! survives `clear`, so an id is never handed out twice during the life of
//! the process. Timestamps are wall-clock milliseconds clamped to never run
//! behind the previous entry, which keeps `received_at` sorted and lets
//! `since` binary-search for its starting point.

use chrono::Utc;
use serde_json::Value;

use crate::relay::message::Message;
use crate::relay::session::is_new_session;

/// Position in a log from which a poller wants messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// The whole log.
    All,
    /// Messages received strictly after this epoch-ms timestamp.
    Time(i64),
    /// Messages with an id of at least `n`: everything appended once
    /// `next_id()` had reached `n`.
    AfterId(u64),
}

impl From<Option<i64>> for Cursor {
    fn from(since: Option<i64>) -> Self {
        since.map_or(Cursor::All, Cursor::Time)
    }
}

#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    /// Creates an empty log whose first message gets id 0.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a message stamped with the current time and returns a copy of it.
    pub fn append(&mut self, payload: String, kind: String, session_token: Value) -> Message {
        self.append_at(Utc::now().timestamp_millis(), payload, kind, session_token)
    }

    /// Appends a message as if it arrived at `now` (epoch ms).
    pub fn append_at(
        &mut self,
        now: i64,
        payload: String,
        kind: String,
        session_token: Value,
    ) -> Message {
        let previous = self.messages.last();
        let received_at = previous.map_or(now, |prev| now.max(prev.received_at));
        let is_new_session = is_new_session(previous, &session_token);

        let message = Message {
            id: self.next_id,
            received_at,
            payload,
            kind,
            session_token,
            is_new_session,
        };

        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }

    /// Returns every message received strictly after `since`, in append order.
    ///
    /// `None` returns the whole log. The result is always an owned, dense
    /// `Vec` so it serializes as a JSON array.
    pub fn since(&self, since: Option<i64>) -> Vec<Message> {
        self.after(Cursor::from(since))
    }

    /// Returns every message past `cursor`, in append order.
    ///
    /// Both ids and timestamps are sorted, so the start is found by binary
    /// search and the tail copied into an owned `Vec`.
    pub fn after(&self, cursor: Cursor) -> Vec<Message> {
        let start = match cursor {
            Cursor::All => 0,
            Cursor::Time(t) => self.messages.partition_point(|m| m.received_at <= t),
            Cursor::AfterId(n) => self.messages.partition_point(|m| m.id < n),
        };
        self.messages[start..].to_vec()
    }

    /// Empties the log. The id counter keeps counting.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Number of messages currently held.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// `true` when nothing has been appended since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recently appended message, if any.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The id the next append will receive.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }
}
