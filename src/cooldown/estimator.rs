//! Cooldown update rules.
//!
//! Successes are blended into the estimate with an exponential moving
//! average. Flood waits are authoritative: the estimate jumps to at least
//! the reported penalty and is then multiplied, so one flood wait outweighs
//! any number of earlier successes. The two paths are kept separate.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::{AccountCooldownState, Recommendation, RiskLevel};
use crate::config::{ConfigError, EstimatorSettings};

/// Errors raised by estimator operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CooldownError {
    #[error("Invalid input: {field} must be a finite, non-negative number of seconds (got {value})")]
    InvalidInput { field: &'static str, value: f64 },
}

/// Rejects negative and non-finite second counts.
///
/// # Errors
///
/// Returns [`CooldownError::InvalidInput`] naming `field`.
pub fn check_seconds(field: &'static str, value: f64) -> Result<f64, CooldownError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CooldownError::InvalidInput { field, value })
    }
}

/// Applies report events to account states and derives recommendations.
#[derive(Debug, Clone, Default)]
pub struct CooldownEstimator {
    settings: EstimatorSettings,
}

impl CooldownEstimator {
    /// Creates an estimator after validating its settings.
    pub fn new(settings: EstimatorSettings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self { settings })
    }

    #[must_use]
    pub const fn settings(&self) -> &EstimatorSettings {
        &self.settings
    }

    /// Delay recommended for accounts that have no state yet.
    #[must_use]
    pub fn default_delay(&self) -> f64 {
        self.clamp(self.settings.default_delay_secs)
    }

    /// Creates the initial state for a first-seen account.
    #[must_use]
    pub fn initial_state(&self, account_id: &str, now: DateTime<Utc>) -> AccountCooldownState {
        AccountCooldownState::new(account_id, self.default_delay(), now)
    }

    /// Blends a successful observed delay into the estimate.
    pub fn apply_success(
        &self,
        state: &mut AccountCooldownState,
        observed_delay_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<(), CooldownError> {
        let observed = check_seconds("observed_delay_seconds", observed_delay_seconds)?;
        let alpha = self.settings.alpha;

        let previous = state.ema_delay_seconds;
        state.ema_delay_seconds = self.clamp(alpha.mul_add(observed, (1.0 - alpha) * previous));
        state.consecutive_flood_waits = 0;
        state.recent_flood_waits.clear();
        state.last_event_at = now;

        debug!(
            "[{}] success after {:.1}s: estimate {:.1}s -> {:.1}s",
            state.account_id, observed, previous, state.ema_delay_seconds
        );
        Ok(())
    }

    /// Pushes the estimate above a reported flood wait.
    pub fn apply_flood_wait(
        &self,
        state: &mut AccountCooldownState,
        wait_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<(), CooldownError> {
        let wait = check_seconds("wait_seconds", wait_seconds)?;

        let previous = state.ema_delay_seconds;
        state.ema_delay_seconds =
            self.clamp(previous.max(wait) * self.settings.penalty_multiplier);
        state.consecutive_flood_waits = state.consecutive_flood_waits.saturating_add(1);

        let keep_previous_max = state
            .last_flood_wait_at
            .is_some_and(|at| self.within_lookback(at, now));
        state.last_flood_wait_seconds = match state.last_flood_wait_seconds {
            Some(prev) if keep_previous_max => Some(prev.max(wait)),
            _ => Some(wait),
        };
        state.last_flood_wait_at = Some(now);
        state.last_event_at = now;

        state.recent_flood_waits.push_back(now);
        self.trim_streak(state);

        warn!(
            "[{}] flood wait of {:.0}s ({} in a row): estimate {:.1}s -> {:.1}s",
            state.account_id,
            wait,
            state.consecutive_flood_waits,
            previous,
            state.ema_delay_seconds
        );
        Ok(())
    }

    /// Derives the risk level of a state at `now`.
    ///
    /// HIGH needs the last `high_risk_threshold` flood waits of the streak to
    /// all fall inside the lookback window.
    #[must_use]
    pub fn risk_level(&self, state: &AccountCooldownState, now: DateTime<Utc>) -> RiskLevel {
        if state.consecutive_flood_waits == 0 {
            return RiskLevel::Low;
        }

        let threshold = self.settings.high_risk_threshold;
        let window_start = usize::try_from(threshold)
            .ok()
            .and_then(|n| state.nth_latest_flood_wait(n));

        match window_start {
            Some(at) if state.consecutive_flood_waits >= threshold && self.within_lookback(at, now) => {
                RiskLevel::High
            }
            _ => RiskLevel::Elevated,
        }
    }

    /// Brings a state loaded from storage back inside this estimator's bounds.
    ///
    /// Non-finite delays restart from the default delay. Returns whether the
    /// state was changed.
    pub fn normalize(&self, state: &mut AccountCooldownState) -> bool {
        let before = state.ema_delay_seconds;
        let after = if before.is_finite() {
            self.clamp(before)
        } else {
            self.default_delay()
        };
        let streak_len = state.recent_flood_waits.len();
        self.trim_streak(state);

        let estimate_changed = after.to_bits() != before.to_bits();
        if estimate_changed {
            state.ema_delay_seconds = after;
            warn!(
                "[{}] stored estimate {:.1}s outside [{:.1}s, {:.1}s], using {:.1}s",
                state.account_id,
                before,
                self.settings.floor_secs,
                self.settings.ceiling_secs,
                after
            );
        }
        estimate_changed || streak_len != state.recent_flood_waits.len()
    }

    /// Recommendation for a state, or the default one for an unseen account.
    #[must_use]
    pub fn recommend(&self, state: Option<&AccountCooldownState>, now: DateTime<Utc>) -> Recommendation {
        match state {
            Some(state) => Recommendation {
                delay_seconds: state.ema_delay_seconds,
                risk_level: self.risk_level(state, now),
            },
            None => Recommendation {
                delay_seconds: self.default_delay(),
                risk_level: RiskLevel::Low,
            },
        }
    }

    fn trim_streak(&self, state: &mut AccountCooldownState) {
        let cap = usize::try_from(self.settings.high_risk_threshold).unwrap_or(usize::MAX);
        while state.recent_flood_waits.len() > cap {
            state.recent_flood_waits.pop_front();
        }
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.settings.floor_secs, self.settings.ceiling_secs)
    }

    fn within_lookback(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(at) <= self.settings.lookback()
    }
}
