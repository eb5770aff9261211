//! The `error` module defines the error types used across `longpoll`.
//!
//! Request-level failures (`MalformedPublish`, `BadCursor`) are local to a
//! single request/response cycle and render as `400 Bad Request`. A waiter
//! timing out is not an error at all; it resolves with an empty batch.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The publish body was not JSON or lacked a required field.
    #[error("malformed publish: {0}")]
    MalformedPublish(String),

    /// The `since` cursor was not an integer epoch-ms value.
    #[error("invalid since cursor: {0}")]
    BadCursor(String),

    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to encode batch: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response status {0}")]
    UnexpectedStatus(u16),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// HTTP status the error renders as.
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MalformedPublish(_) | RelayError::BadCursor(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            tracing::warn!(error = %self, "rejected request");
        } else {
            tracing::error!(error = %self, "request failed");
        }
        let body = json!({ "error": self.to_string() }).to_string();
        (
            status,
            [
                ("content-type", "application/json"),
                ("connection", "close"),
            ],
            body,
        )
            .into_response()
    }
}
