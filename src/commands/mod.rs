//! Command handling module.
//!
//! Turns operator commands (reports, queries, assist exports) into
//! tracker calls and human-readable results.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{CommandResult, CooldownCommand};
