//! The `relay` module is the long-poll core: an append-only message log per
//! channel plus the registry of pollers waiting for the next append.

pub mod engine;
pub mod log;
pub mod message;
pub mod session;
pub mod waiters;

pub use engine::{Relay, RelayOptions};
pub use message::Message;

#[cfg(test)]
mod tests;
