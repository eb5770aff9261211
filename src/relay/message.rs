use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message stored in a relay's log.
///
/// Messages are immutable once appended. `id` and `received_at` are assigned
/// by the relay, never taken from the publisher, and `is_new_session` is fixed
/// at append time from the message that preceded it.
///
/// On the wire the field names follow the console client's record shape:
///
/// ```json
/// {"guid":0,"time":1725000000000,"message":"hi","type":"log","sessionStart":1725,"isNewSession":true}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Sequence number within the relay, strictly increasing.
    #[serde(rename = "guid")]
    pub id: u64,

    /// Milliseconds since the Unix epoch when the relay accepted the message.
    #[serde(rename = "time")]
    pub received_at: i64,

    #[serde(rename = "message")]
    pub payload: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque token identifying the producing session; `null` when absent.
    #[serde(rename = "sessionStart", default)]
    pub session_token: Value,

    #[serde(rename = "isNewSession")]
    pub is_new_session: bool,
}
