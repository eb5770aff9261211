//! The `utils` module collects pieces shared by every other module of the
//! relay: the error taxonomy and logging setup.

pub mod error;
pub mod logging;
