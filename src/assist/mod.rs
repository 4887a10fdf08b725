//! Join-assist lists.
//!
//! Annotates accounts with their recommended delay so an operator can pick
//! which account to use next, and renders the per-account assist export: a
//! header recommending the delay followed by the pending links to work
//! through by hand.

mod links;

pub use links::{classify_link, joinable_links, LinkKind};

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::cooldown::{CooldownTracker, Recommendation, RiskLevel};

/// One account with its current recommendation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistEntry {
    pub account_id: String,
    #[serde(flatten)]
    pub recommendation: Recommendation,
}

impl AssistEntry {
    /// HIGH risk accounts should be left alone until reviewed.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.recommendation.risk_level == RiskLevel::High
    }
}

/// Annotates `account_ids` and orders them safest first.
///
/// Ordering is by risk, then delay, then id. Duplicate ids are listed once.
pub async fn rank_accounts<I, S>(tracker: &CooldownTracker, account_ids: I) -> Vec<AssistEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for id in account_ids {
        let id = id.as_ref();
        if !seen.insert(id.to_owned()) {
            continue;
        }
        entries.push(AssistEntry {
            account_id: id.to_owned(),
            recommendation: tracker.recommend_delay(id).await,
        });
    }

    entries.sort_by(|a, b| {
        a.recommendation
            .risk_level
            .cmp(&b.recommendation.risk_level)
            .then(
                a.recommendation
                    .delay_seconds
                    .total_cmp(&b.recommendation.delay_seconds),
            )
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    entries
}

/// Reads a links file: one link per line, blanks and repeats skipped.
pub fn load_links(path: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(dedup_links(content.lines()))
}

fn dedup_links<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .map(str::trim)
        .filter(|l| !l.is_empty() && seen.insert(*l))
        .map(str::to_owned)
        .collect()
}

/// Delay shown to operators, rounded up to whole seconds.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn whole_seconds(delay_seconds: f64) -> u64 {
    delay_seconds.max(0.0).ceil() as u64
}

/// Renders the assist export for one account.
#[must_use]
pub fn render_assist<S: AsRef<str>>(
    account_id: &str,
    recommendation: &Recommendation,
    links: &[S],
) -> String {
    let mut out = format!(
        "Recommended delay between joins for {account_id}: {} seconds (risk: {})\n\n",
        whole_seconds(recommendation.delay_seconds),
        recommendation.risk_level
    );
    for link in links {
        let link = link.as_ref().trim();
        if !link.is_empty() {
            let _ = writeln!(out, "{link}");
        }
    }
    out
}

/// Writes `assist_<account>.txt` into `dir` and returns its path.
pub fn write_assist_file<S: AsRef<str>>(
    dir: impl AsRef<Path>,
    account_id: &str,
    recommendation: &Recommendation,
    links: &[S],
) -> std::io::Result<PathBuf> {
    let path = dir.as_ref().join(format!("assist_{}.txt", file_safe(account_id)));
    std::fs::write(&path, render_assist(account_id, recommendation, links))?;
    info!(
        "Wrote assist file for {} with {} links to {}",
        account_id,
        links.len(),
        path.display()
    );
    Ok(path)
}

fn file_safe(account_id: &str) -> String {
    account_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cooldown::CooldownEstimator;

    #[tokio::test]
    async fn test_rank_accounts_orders_safest_first() {
        let tracker = CooldownTracker::new(CooldownEstimator::default());
        let now = Utc::now();
        tracker.report_flood_wait_at("risky", 100.0, now).await.unwrap();
        tracker.report_flood_wait_at("risky", 100.0, now).await.unwrap();
        tracker.report_flood_wait_at("risky", 100.0, now).await.unwrap();
        tracker.report_flood_wait_at("warm", 10.0, now).await.unwrap();
        tracker.report_success_at("calm", 40.0, now).await.unwrap();

        let ranked = rank_accounts(&tracker, ["risky", "new", "warm", "calm", "new"]).await;
        let ids: Vec<_> = ranked.iter().map(|e| e.account_id.as_str()).collect();
        assert_eq!(ids, ["calm", "new", "warm", "risky"]);
        assert!(ranked[3].needs_review());
        assert!(!ranked[0].needs_review());
    }

    #[test]
    fn test_render_assist() {
        let rec = Recommendation {
            delay_seconds: 449.2,
            risk_level: RiskLevel::Elevated,
        };
        let out = render_assist("acc1", &rec, &["https://t.me/+abc", "  ", "https://t.me/joinchat/x"]);
        assert_eq!(
            out,
            "Recommended delay between joins for acc1: 450 seconds (risk: ELEVATED)\n\n\
             https://t.me/+abc\n\
             https://t.me/joinchat/x\n"
        );
    }

    #[test]
    fn test_dedup_links() {
        let links = dedup_links(["a", " b ", "", "a", "c"]);
        assert_eq!(links, ["a", "b", "c"]);
    }

    #[test]
    fn test_file_safe_names() {
        assert_eq!(file_safe("acc-1_x"), "acc-1_x");
        assert_eq!(file_safe("../etc"), "___etc");
    }

    #[test]
    fn test_write_assist_file() {
        let dir = std::env::temp_dir().join(format!(
            "join_cooldown_assist_{}_{}",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::create_dir_all(&dir).unwrap();

        let rec = Recommendation {
            delay_seconds: 120.0,
            risk_level: RiskLevel::Low,
        };
        let path = write_assist_file(&dir, "acc1", &rec, &["https://t.me/+abc"]).unwrap();
        assert_eq!(path.file_name().unwrap(), "assist_acc1.txt");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Recommended delay between joins for acc1: 120 seconds"));

        std::fs::remove_dir_all(dir).ok();
    }
}
