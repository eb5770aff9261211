//! The `client` module provides `RelayClient`, an HTTP client for a single
//! relay channel.
//!
//! Besides one-shot `poll`, `publish` and `clear` calls it offers `follow`,
//! the re-poll loop a console uses to keep up with a channel: every answer,
//! including an empty one after a timeout, is followed by a fresh poll.

pub mod poll_client;
pub use poll_client::RelayClient;
