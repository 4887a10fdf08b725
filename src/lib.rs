//! Join Cooldown Library
//!
//! Learns how long to wait between manual actions on each Telegram account.
//!
//! This crate provides the core functionality for:
//! - Turning manual success / flood wait reports into a per-account delay
//! - Flagging accounts whose recent flood waits make further actions risky
//! - Persisting learned state between runs
//! - Producing join-assist lists annotated with recommended delays
//!
//! Nothing here performs actions on Telegram; every action stays manual.

pub mod assist;
pub mod commands;
pub mod config;
pub mod cooldown;
pub mod store;
