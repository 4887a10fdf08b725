//! Command handler implementation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::{CommandResult, CooldownCommand};
use crate::assist::{
    joinable_links, load_links, rank_accounts, whole_seconds, write_assist_file,
};
use crate::cooldown::{AccountCooldownState, CooldownTracker, ReportEvent, ReportOutcome};
use crate::store::CooldownStore;

/// Runs operator commands against the tracker and persists the results.
pub struct CommandHandler {
    /// Shared cooldown tracker.
    tracker: Arc<CooldownTracker>,

    /// Where tracked state is saved after each report.
    store: Arc<dyn CooldownStore + Send + Sync>,

    /// Default directory for assist exports.
    assist_dir: PathBuf,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        tracker: Arc<CooldownTracker>,
        store: Arc<dyn CooldownStore + Send + Sync>,
        assist_dir: PathBuf,
    ) -> Self {
        Self {
            tracker,
            store,
            assist_dir,
        }
    }

    /// Executes a command.
    pub async fn execute(&self, command: CooldownCommand) -> CommandResult {
        debug!("Handling command: {}", command);

        let result = match command {
            CooldownCommand::Success { account, delay } => {
                self.handle_report(&ReportEvent::success(account, delay)).await
            }
            CooldownCommand::FloodWait { account, seconds } => {
                self.handle_report(&ReportEvent::flood_wait(account, seconds))
                    .await
            }
            CooldownCommand::Recommend { account } => self.handle_recommend(&account).await,
            CooldownCommand::List => self.handle_list().await,
            CooldownCommand::Assist {
                account,
                links_file,
                out_dir,
            } => self.handle_assist(&account, links_file, out_dir).await,
        };

        info!(
            "Command result: success={}, state_changed={}",
            result.success, result.state_changed
        );
        result
    }

    async fn handle_report(&self, event: &ReportEvent) -> CommandResult {
        if event.account_id.trim().is_empty() {
            return CommandResult::error("Account name cannot be empty.");
        }

        let state = match self.tracker.apply(event).await {
            Ok(state) => state,
            Err(e) => return CommandResult::error(e.to_string()),
        };
        let risk = self
            .tracker
            .estimator()
            .risk_level(&state, state.last_event_at);

        let summary = match event.outcome {
            ReportOutcome::Success => format!(
                "✓ Recorded success after {}s. New cooldown for {}: {:.1}s (risk: {risk})",
                whole_seconds(event.value_seconds),
                state.account_id,
                state.ema_delay_seconds
            ),
            ReportOutcome::FloodWait => format!(
                "⚠ Recorded flood wait of {}s ({} in a row). New cooldown for {}: {:.1}s (risk: {risk})",
                whole_seconds(event.value_seconds),
                state.consecutive_flood_waits,
                state.account_id,
                state.ema_delay_seconds
            ),
        };

        // Snapshot first so no account lock is held during I/O.
        let snapshot = self.tracker.snapshot().await;
        if let Err(e) = self.store.save(&snapshot) {
            warn!("Failed to save cooldown state: {}", e);
            return CommandResult::error(format!("{summary}\nRecorded but failed to save: {e}"));
        }

        CommandResult::success_with_change(summary)
    }

    async fn handle_recommend(&self, account: &str) -> CommandResult {
        let rec = self.tracker.recommend_delay(account).await;
        let known = self.tracker.state(account).await.is_some();

        let mut message = format!(
            "{account}: wait {} between joins ({:.1}s, risk: {})",
            format_duration(whole_seconds(rec.delay_seconds)),
            rec.delay_seconds,
            rec.risk_level
        );
        if !known {
            message.push_str("\nNo reports yet, using the default delay.");
        }
        CommandResult::success(message)
    }

    async fn handle_list(&self) -> CommandResult {
        let states: HashMap<String, AccountCooldownState> = self
            .tracker
            .snapshot()
            .await
            .into_iter()
            .map(|s| (s.account_id.clone(), s))
            .collect();

        if states.is_empty() {
            return CommandResult::error("No accounts have been reported yet.");
        }

        let ranked = rank_accounts(&self.tracker, states.keys()).await;
        let mut lines = vec!["Accounts (safest first):".to_owned()];

        for entry in ranked {
            let marker = if entry.needs_review() { "! " } else { "  " };
            let flood_waits = states
                .get(&entry.account_id)
                .map_or(0, |s| s.consecutive_flood_waits);
            lines.push(format!(
                "{marker}[{}] {} ({}, {flood_waits} flood waits in a row)",
                entry.account_id,
                format_duration(whole_seconds(entry.recommendation.delay_seconds)),
                entry.recommendation.risk_level
            ));
        }

        CommandResult::success(lines.join("\n"))
    }

    async fn handle_assist(
        &self,
        account: &str,
        links_file: PathBuf,
        out_dir: Option<PathBuf>,
    ) -> CommandResult {
        let links = match load_links(&links_file) {
            Ok(links) => links,
            Err(e) => {
                return CommandResult::error(format!(
                    "Failed to read links from {}: {e}",
                    links_file.display()
                ));
            }
        };

        let (links, skipped) = joinable_links(links);
        if skipped > 0 {
            debug!("Skipped {} bot links for {}", skipped, account);
        }
        if links.is_empty() {
            return CommandResult::error(format!(
                "No pending group links ({skipped} bot links skipped)."
            ));
        }

        let rec = self.tracker.recommend_delay(account).await;
        let dir = out_dir.unwrap_or_else(|| self.assist_dir.clone());

        match write_assist_file(&dir, account, &rec, &links) {
            Ok(path) => {
                let mut message = format!(
                    "✓ Assist file for {account}: {} ({} links). Recommended delay {}s (risk: {})",
                    path.display(),
                    links.len(),
                    whole_seconds(rec.delay_seconds),
                    rec.risk_level
                );
                if skipped > 0 {
                    message.push_str(&format!("\nSkipped {skipped} bot links."));
                }
                CommandResult::success(message)
            }
            Err(e) => CommandResult::error(format!("Failed to write assist file: {e}")),
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("assist_dir", &self.assist_dir)
            .finish_non_exhaustive()
    }
}

/// Formats a duration in seconds to a human-readable string.
fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        let mins = secs / 60;
        let rest = secs % 60;
        if rest == 0 {
            format!("{mins}m")
        } else {
            format!("{mins}m {rest}s")
        }
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        if mins == 0 {
            format!("{hours}h")
        } else {
            format!("{hours}h {mins}m")
        }
    }
}
