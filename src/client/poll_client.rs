use reqwest::StatusCode;
use serde_json::Value;

use crate::relay::Message;
use crate::transport::message::PublishRequest;
use crate::utils::error::{RelayError, Result};

/// HTTP client for one relay channel, e.g. `http://127.0.0.1:8080/messages`.
///
/// No request timeout is configured: a poll may legitimately be held open
/// for the relay's whole wait window.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    url: String,
}

impl RelayClient {
    /// Creates a client for `<base_url>/<channel>`.
    pub fn new(base_url: &str, channel: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}/{}", base_url.trim_end_matches('/'), channel),
        }
    }

    /// Full URL of the channel.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Long-polls once for messages newer than `since`.
    pub async fn poll(&self, since: Option<i64>) -> Result<Vec<Message>> {
        let mut request = self.http.get(&self.url);
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response = request.send().await?;
        expect_status(response.status(), StatusCode::OK)?;
        Ok(response.json::<Vec<Message>>().await?)
    }

    /// Appends a message to the channel; the relay answers `201`.
    pub async fn publish(
        &self,
        message: impl Into<String>,
        kind: impl Into<String>,
        session_start: Value,
    ) -> Result<()> {
        let body = PublishRequest {
            message: message.into(),
            kind: kind.into(),
            session_start,
        };
        let response = self.http.post(&self.url).json(&body).send().await?;
        expect_status(response.status(), StatusCode::CREATED)
    }

    /// Empties the channel's log; the relay answers `204`.
    pub async fn clear(&self) -> Result<()> {
        let response = self.http.delete(&self.url).send().await?;
        expect_status(response.status(), StatusCode::NO_CONTENT)
    }

    /// Polls repeatedly, handing each non-empty batch to `on_batch`.
    ///
    /// The cursor advances to the `time` of the last message received and is
    /// kept as-is across empty answers (timeouts, clears). Stops when `on_batch`
    /// returns `false`; returns the final cursor.
    pub async fn follow<F>(&self, since: Option<i64>, mut on_batch: F) -> Result<Option<i64>>
    where
        F: FnMut(Vec<Message>) -> bool,
    {
        let mut cursor = since;
        loop {
            let batch = self.poll(cursor).await?;
            let Some(last) = batch.last() else {
                tracing::trace!(url = %self.url, "empty answer, re-polling");
                continue;
            };
            cursor = Some(last.received_at);
            if !on_batch(batch) {
                return Ok(cursor);
            }
        }
    }
}

fn expect_status(actual: StatusCode, expected: StatusCode) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(RelayError::UnexpectedStatus(actual.as_u16()))
    }
}
