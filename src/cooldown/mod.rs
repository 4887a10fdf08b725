//! Cooldown estimation module.
//!
//! Learns a safe delay between manual actions for each account from
//! operator reports (success after a delay, or a flood wait penalty)
//! and turns it into a recommendation with a risk flag.

mod estimator;
mod state;
mod tracker;

pub use estimator::{check_seconds, CooldownError, CooldownEstimator};
pub use state::{AccountCooldownState, Recommendation, ReportEvent, ReportOutcome, RiskLevel};
pub use tracker::CooldownTracker;
