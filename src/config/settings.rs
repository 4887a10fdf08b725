//! Estimator tuning and application settings.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tuning parameters for the cooldown estimator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorSettings {
    /// Smoothing factor applied to reported successes (0 < alpha <= 1).
    #[serde(default = "default_alpha")]
    pub alpha: f64,

    /// Multiplier applied on top of a flood wait (must be > 1).
    #[serde(default = "default_penalty_multiplier")]
    pub penalty_multiplier: f64,

    /// Lower bound for the recommended delay in seconds.
    #[serde(default = "default_floor_secs")]
    pub floor_secs: f64,

    /// Upper bound for the recommended delay in seconds.
    #[serde(default = "default_ceiling_secs")]
    pub ceiling_secs: f64,

    /// Delay recommended for an account that has never been reported.
    #[serde(default = "default_delay_secs")]
    pub default_delay_secs: f64,

    /// Window in which consecutive flood waits count towards HIGH risk.
    #[serde(default = "default_lookback_secs")]
    pub lookback_secs: u64,

    /// Consecutive flood waits needed for HIGH risk.
    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: u32,
}

fn default_alpha() -> f64 {
    0.2
}

fn default_penalty_multiplier() -> f64 {
    1.5
}

fn default_floor_secs() -> f64 {
    30.0
}

fn default_ceiling_secs() -> f64 {
    86_400.0 // one day
}

fn default_delay_secs() -> f64 {
    120.0
}

fn default_lookback_secs() -> u64 {
    86_400
}

fn default_high_risk_threshold() -> u32 {
    3
}

impl Default for EstimatorSettings {
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            penalty_multiplier: default_penalty_multiplier(),
            floor_secs: default_floor_secs(),
            ceiling_secs: default_ceiling_secs(),
            default_delay_secs: default_delay_secs(),
            lookback_secs: default_lookback_secs(),
            high_risk_threshold: default_high_risk_threshold(),
        }
    }
}

impl EstimatorSettings {
    /// Creates estimator settings from environment variables with defaults.
    ///
    /// Unparseable values fall back to the default for that field.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            alpha: env_or("COOLDOWN_ALPHA", default_alpha),
            penalty_multiplier: env_or("COOLDOWN_PENALTY_MULTIPLIER", default_penalty_multiplier),
            floor_secs: env_or("COOLDOWN_FLOOR_SECS", default_floor_secs),
            ceiling_secs: env_or("COOLDOWN_CEILING_SECS", default_ceiling_secs),
            default_delay_secs: env_or("COOLDOWN_DEFAULT_SECS", default_delay_secs),
            lookback_secs: env_or("COOLDOWN_LOOKBACK_SECS", default_lookback_secs),
            high_risk_threshold: env_or("COOLDOWN_HIGH_RISK_THRESHOLD", default_high_risk_threshold),
        }
    }

    /// Checks that the settings describe a usable estimator.
    ///
    /// # Errors
    ///
    /// Returns the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.alpha.is_finite() && self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(ConfigError::invalid("alpha", "must be in (0, 1]"));
        }
        if !(self.penalty_multiplier.is_finite() && self.penalty_multiplier > 1.0) {
            return Err(ConfigError::invalid("penalty_multiplier", "must be greater than 1"));
        }
        if !(self.floor_secs.is_finite() && self.floor_secs >= 0.0) {
            return Err(ConfigError::invalid("floor_secs", "must be a non-negative number"));
        }
        if !(self.ceiling_secs.is_finite() && self.ceiling_secs >= self.floor_secs) {
            return Err(ConfigError::invalid("ceiling_secs", "must be at least floor_secs"));
        }
        if !self.default_delay_secs.is_finite() || self.default_delay_secs < 0.0 {
            return Err(ConfigError::invalid("default_delay_secs", "must be a non-negative number"));
        }
        if self.high_risk_threshold == 0 {
            return Err(ConfigError::invalid("high_risk_threshold", "must be at least 1"));
        }
        Ok(())
    }

    /// Lookback window as a chrono duration.
    #[must_use]
    pub fn lookback(&self) -> Duration {
        i64::try_from(self.lookback_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

/// Settings for the command line front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Path to the JSON file holding per-account cooldown state.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Directory assist exports are written to.
    #[serde(default = "default_assist_dir")]
    pub assist_dir: PathBuf,
}

fn default_state_path() -> PathBuf {
    PathBuf::from("cooldown_state.json")
}

fn default_assist_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            assist_dir: default_assist_dir(),
        }
    }
}

impl AppSettings {
    /// Creates application settings from environment variables with defaults.
    #[must_use]
    pub fn from_env_with_defaults() -> Self {
        Self {
            state_path: std::env::var("COOLDOWN_STATE_PATH")
                .map_or_else(|_| default_state_path(), PathBuf::from),
            assist_dir: std::env::var("COOLDOWN_ASSIST_DIR")
                .map_or_else(|_| default_assist_dir(), PathBuf::from),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: fn() -> T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or_else(default)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid setting {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    const fn invalid(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidValue { name, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = EstimatorSettings::default();
        assert!((settings.alpha - 0.2).abs() < f64::EPSILON);
        assert!((settings.penalty_multiplier - 1.5).abs() < f64::EPSILON);
        assert!((settings.default_delay_secs - 120.0).abs() < f64::EPSILON);
        assert_eq!(settings.high_risk_threshold, 3);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_multiplier() {
        let settings = EstimatorSettings {
            penalty_multiplier: 1.0,
            ..EstimatorSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { name: "penalty_multiplier", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let settings = EstimatorSettings {
            floor_secs: 100.0,
            ceiling_secs: 50.0,
            ..EstimatorSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_alpha_out_of_range() {
        for alpha in [0.0, -0.1, 1.5, f64::NAN] {
            let settings = EstimatorSettings {
                alpha,
                ..EstimatorSettings::default()
            };
            assert!(settings.validate().is_err(), "alpha {alpha} accepted");
        }
    }

    #[test]
    fn test_huge_lookback_does_not_overflow() {
        let settings = EstimatorSettings {
            lookback_secs: u64::MAX,
            ..EstimatorSettings::default()
        };
        assert_eq!(settings.lookback(), Duration::MAX);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: EstimatorSettings =
            serde_json::from_str(r#"{ "floor_secs": 10.0 }"#).unwrap();
        assert!((settings.floor_secs - 10.0).abs() < f64::EPSILON);
        assert!((settings.ceiling_secs - 86_400.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_default_app_settings() {
        let settings = AppSettings::default();
        assert_eq!(settings.state_path, PathBuf::from("cooldown_state.json"));
        assert_eq!(settings.assist_dir, PathBuf::from("."));
    }
}
