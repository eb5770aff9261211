//! The `transport` module exposes relays over HTTP long-polling.
//!
//! Each relay is mounted under its own path segment. A `GET` is held open
//! until the relay has something newer than the caller's cursor, `POST`
//! appends, and `DELETE` clears. Every response closes the connection; a
//! fresh poll is a fresh request.

pub mod http;
pub mod message;
