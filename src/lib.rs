//! # longpoll
//!
//! `longpoll` is a small in-memory message relay served over HTTP
//! long-polling. Each relay channel is an append-only log of timestamped
//! messages; pollers either get what is already newer than their cursor or
//! are held open until something new arrives or the wait window elapses.
//!
//! ## Core Modules
//!
//! - `relay`: the message log, session tracking, waiter registry and the
//!   `Relay` engine tying them together.
//! - `transport`: the HTTP surface (fetch, publish, clear) built on axum.
//! - `client`: a reqwest-based client for polling and publishing.
//! - `config`: loading server and channel configuration.
//! - `utils`: shared error type and logging setup.

pub mod client;
pub mod config;
pub mod relay;
pub mod transport;
pub mod utils;
