use serde_json::Value;

use crate::relay::message::Message;

/// Decides whether a message carrying `session_token` opens a new session.
///
/// Only the immediately preceding message is consulted; an empty log always
/// starts a session.
pub fn is_new_session(previous: Option<&Message>, session_token: &Value) -> bool {
    match previous {
        None => true,
        Some(prev) => prev.session_token != *session_token,
    }
}
