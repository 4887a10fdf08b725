//! Configuration module for the cooldown estimator.
//!
//! Handles loading and validation of estimator tuning parameters
//! and the command line front end's file locations.

mod settings;

pub use settings::{AppSettings, ConfigError, EstimatorSettings};
