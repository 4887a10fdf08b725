//! Per-account cooldown state and the values derived from it.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Learned cooldown state for a single account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCooldownState {
    /// Opaque account key (the session name in the account store).
    pub account_id: String,

    /// Smoothed safe delay between actions, in seconds.
    pub ema_delay_seconds: f64,

    /// Flood waits reported since the last success.
    #[serde(default)]
    pub consecutive_flood_waits: u32,

    /// When the most recent report arrived.
    pub last_event_at: DateTime<Utc>,

    /// Largest penalty seen within the lookback window.
    #[serde(default)]
    pub last_flood_wait_seconds: Option<f64>,

    /// When the most recent flood wait was reported.
    #[serde(default)]
    pub last_flood_wait_at: Option<DateTime<Utc>>,

    /// Times of the latest flood waits in the current streak, oldest first.
    /// Holds at most as many entries as the HIGH risk threshold.
    #[serde(default)]
    pub recent_flood_waits: VecDeque<DateTime<Utc>>,
}

impl AccountCooldownState {
    /// Creates a fresh state with the given starting delay.
    #[must_use]
    pub fn new(account_id: impl Into<String>, initial_delay_seconds: f64, now: DateTime<Utc>) -> Self {
        Self {
            account_id: account_id.into(),
            ema_delay_seconds: initial_delay_seconds,
            consecutive_flood_waits: 0,
            last_event_at: now,
            last_flood_wait_seconds: None,
            last_flood_wait_at: None,
            recent_flood_waits: VecDeque::new(),
        }
    }

    /// Time of the `n`-th most recent flood wait in the streak (1 = latest).
    #[must_use]
    pub fn nth_latest_flood_wait(&self, n: usize) -> Option<DateTime<Utc>> {
        let len = self.recent_flood_waits.len();
        if n == 0 || n > len {
            return None;
        }
        self.recent_flood_waits.get(len - n).copied()
    }
}

/// Coarse classification of how likely the next action is to be penalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Elevated,
    High,
}

impl RiskLevel {
    /// Upper-case label as shown to operators.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Elevated => "ELEVATED",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delay recommendation returned to the join-assist list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub delay_seconds: f64,
    pub risk_level: RiskLevel,
}

/// Outcome of a manually performed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportOutcome {
    /// The action went through after waiting `value_seconds`.
    Success,
    /// The platform answered with a flood wait of `value_seconds`.
    FloodWait,
}

impl FromStr for ReportOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" | "ok" => Ok(Self::Success),
            "flood_wait" | "flood" | "floodwait" => Ok(Self::FloodWait),
            "fail" | "failed" => Err(
                "'fail' is not a report outcome: report 'flood <seconds>' with the wait Telegram returned, or 'ok <delay>' on success".to_owned(),
            ),
            other => Err(format!("unknown report outcome: '{other}'")),
        }
    }
}

/// A report event from the manual reporting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEvent {
    pub account_id: String,
    pub outcome: ReportOutcome,
    pub value_seconds: f64,
}

impl ReportEvent {
    #[must_use]
    pub fn success(account_id: impl Into<String>, observed_delay_seconds: f64) -> Self {
        Self {
            account_id: account_id.into(),
            outcome: ReportOutcome::Success,
            value_seconds: observed_delay_seconds,
        }
    }

    #[must_use]
    pub fn flood_wait(account_id: impl Into<String>, wait_seconds: f64) -> Self {
        Self {
            account_id: account_id.into(),
            outcome: ReportOutcome::FloodWait,
            value_seconds: wait_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Elevated);
        assert!(RiskLevel::Elevated < RiskLevel::High);
    }

    #[test]
    fn test_report_event_wire_format() {
        let json = r#"{"account_id":"acc1","outcome":"FLOOD_WAIT","value_seconds":120}"#;
        let event: ReportEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, ReportEvent::flood_wait("acc1", 120.0));

        let out = serde_json::to_string(&ReportEvent::success("acc1", 60.0)).unwrap();
        assert!(out.contains(r#""outcome":"SUCCESS""#));
    }

    #[test]
    fn test_recommendation_risk_serializes_upper_case() {
        let rec = Recommendation {
            delay_seconds: 30.0,
            risk_level: RiskLevel::Elevated,
        };
        let out = serde_json::to_string(&rec).unwrap();
        assert!(out.contains(r#""risk_level":"ELEVATED""#));
    }

    #[test]
    fn test_parse_outcome_aliases() {
        assert_eq!("ok".parse::<ReportOutcome>(), Ok(ReportOutcome::Success));
        assert_eq!("FLOOD".parse::<ReportOutcome>(), Ok(ReportOutcome::FloodWait));
        assert!("nope".parse::<ReportOutcome>().is_err());
    }

    #[test]
    fn test_parse_fail_explains_alternative() {
        let err = "fail".parse::<ReportOutcome>().unwrap_err();
        assert!(err.contains("'fail' is not a report outcome"));
        assert!(err.contains("flood <seconds>"));
    }

    #[test]
    fn test_nth_latest_flood_wait() {
        let t = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let mut state = AccountCooldownState::new("acc1", 120.0, t);
        assert!(state.nth_latest_flood_wait(1).is_none());

        state.recent_flood_waits.push_back(t);
        state.recent_flood_waits.push_back(t + chrono::Duration::hours(1));
        assert_eq!(state.nth_latest_flood_wait(1), Some(t + chrono::Duration::hours(1)));
        assert_eq!(state.nth_latest_flood_wait(2), Some(t));
        assert!(state.nth_latest_flood_wait(3).is_none());
        assert!(state.nth_latest_flood_wait(0).is_none());
    }

    #[test]
    fn test_state_loads_without_optional_fields() {
        let json = r#"{
            "account_id": "acc1",
            "ema_delay_seconds": 150.0,
            "last_event_at": "2026-01-01T00:00:00Z"
        }"#;
        let state: AccountCooldownState = serde_json::from_str(json).unwrap();
        assert_eq!(state.consecutive_flood_waits, 0);
        assert!(state.last_flood_wait_seconds.is_none());
        assert!(state.recent_flood_waits.is_empty());
    }
}
