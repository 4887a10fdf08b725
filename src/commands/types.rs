//! Operator command types.

use std::fmt;
use std::path::PathBuf;

use crate::cooldown::ReportEvent;

/// Operations available to the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum CooldownCommand {
    /// Record that an action succeeded after waiting `delay` seconds.
    Success { account: String, delay: f64 },

    /// Record a flood wait penalty of `seconds`.
    FloodWait { account: String, seconds: f64 },

    /// Show the recommended delay for one account.
    Recommend { account: String },

    /// List every known account, safest first.
    List,

    /// Write the join-assist export for one account.
    Assist {
        account: String,
        links_file: PathBuf,
        out_dir: Option<PathBuf>,
    },
}

impl CooldownCommand {
    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::FloodWait { .. } => "flood",
            Self::Recommend { .. } => "recommend",
            Self::List => "list",
            Self::Assist { .. } => "assist",
        }
    }

    /// Report event carried by this command, if it is a report.
    #[must_use]
    pub fn as_report(&self) -> Option<ReportEvent> {
        match self {
            Self::Success { account, delay } => Some(ReportEvent::success(account.clone(), *delay)),
            Self::FloodWait { account, seconds } => {
                Some(ReportEvent::flood_wait(account.clone(), *seconds))
            }
            _ => None,
        }
    }
}

impl From<ReportEvent> for CooldownCommand {
    fn from(event: ReportEvent) -> Self {
        use crate::cooldown::ReportOutcome;

        match event.outcome {
            ReportOutcome::Success => Self::Success {
                account: event.account_id,
                delay: event.value_seconds,
            },
            ReportOutcome::FloodWait => Self::FloodWait {
                account: event.account_id,
                seconds: event.value_seconds,
            },
        }
    }
}

impl fmt::Display for CooldownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { account, delay } => write!(f, "success {account} {delay}"),
            Self::FloodWait { account, seconds } => write!(f, "flood {account} {seconds}"),
            Self::Recommend { account } => write!(f, "recommend {account}"),
            Self::Assist { account, links_file, .. } => {
                write!(f, "assist {account} --links {}", links_file.display())
            }
            Self::List => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether the command was successful.
    pub success: bool,

    /// Response message to show the user.
    pub message: String,

    /// Whether tracked state changed and was persisted.
    pub state_changed: bool,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            state_changed: false,
        }
    }

    /// Creates a successful result for a command that changed state.
    #[must_use]
    pub fn success_with_change(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            state_changed: true,
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            state_changed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_report() {
        let cmd = CooldownCommand::FloodWait {
            account: "acc1".to_owned(),
            seconds: 120.0,
        };
        assert_eq!(cmd.as_report(), Some(ReportEvent::flood_wait("acc1", 120.0)));
        assert_eq!(CooldownCommand::List.as_report(), None);
    }

    #[test]
    fn test_from_report_event() {
        let cmd = CooldownCommand::from(ReportEvent::success("acc1", 90.0));
        assert_eq!(
            cmd,
            CooldownCommand::Success {
                account: "acc1".to_owned(),
                delay: 90.0
            }
        );
    }

    #[test]
    fn test_display() {
        let cmd = CooldownCommand::Recommend {
            account: "acc1".to_owned(),
        };
        assert_eq!(cmd.to_string(), "recommend acc1");
        assert_eq!(CooldownCommand::List.to_string(), "list");
    }
}
