use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::error::{RelayError, Result};

/// Body of a `POST /<name>` request.
///
/// `message` and `type` are required. `sessionStart` is optional because
/// commands are sent without one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub message: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(rename = "sessionStart", default)]
    pub session_start: Value,
}

impl PublishRequest {
    /// Decodes a request body, rejecting non-JSON or missing fields.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| RelayError::MalformedPublish(e.to_string()))
    }
}

/// Query string of a `GET /<name>` request.
#[derive(Debug, Default, Deserialize)]
pub struct SinceQuery {
    pub since: Option<String>,
}

/// Parses a `since` cursor. An absent or empty value means "no cursor".
pub fn parse_since(raw: Option<&str>) -> Result<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RelayError::BadCursor(value.to_string())),
    }
}
