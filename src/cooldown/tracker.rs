//! Account-keyed cooldown registry safe to share between request handlers.
//!
//! The outer map lock is only held long enough to find or insert an entry.
//! Each account's read-modify-write runs under that account's own mutex, so
//! two reports for one account never interleave and reports for different
//! accounts never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{
    check_seconds, AccountCooldownState, CooldownError, CooldownEstimator, Recommendation,
    ReportEvent, ReportOutcome, RiskLevel,
};

type Slot = Arc<Mutex<AccountCooldownState>>;

/// Concurrent per-account cooldown tracker.
#[derive(Debug)]
pub struct CooldownTracker {
    estimator: CooldownEstimator,
    accounts: RwLock<HashMap<String, Slot>>,
}

impl CooldownTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new(estimator: CooldownEstimator) -> Self {
        Self {
            estimator,
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Rebuilds a tracker from previously saved states.
    ///
    /// Estimates are pulled back into the estimator's `[floor, ceiling]`,
    /// since the states may have been saved under other settings. Later
    /// duplicates of an account id replace earlier ones.
    #[must_use]
    pub fn from_states(
        estimator: CooldownEstimator,
        states: impl IntoIterator<Item = AccountCooldownState>,
    ) -> Self {
        let accounts = states
            .into_iter()
            .map(|mut state| {
                estimator.normalize(&mut state);
                (state.account_id.clone(), Arc::new(Mutex::new(state)))
            })
            .collect();
        Self {
            estimator,
            accounts: RwLock::new(accounts),
        }
    }

    #[must_use]
    pub const fn estimator(&self) -> &CooldownEstimator {
        &self.estimator
    }

    /// Records a success after waiting `observed_delay_seconds`.
    pub async fn report_success(
        &self,
        account_id: &str,
        observed_delay_seconds: f64,
    ) -> Result<AccountCooldownState, CooldownError> {
        self.report_success_at(account_id, observed_delay_seconds, Utc::now())
            .await
    }

    /// Records a flood wait penalty of `wait_seconds`.
    pub async fn report_flood_wait(
        &self,
        account_id: &str,
        wait_seconds: f64,
    ) -> Result<AccountCooldownState, CooldownError> {
        self.report_flood_wait_at(account_id, wait_seconds, Utc::now())
            .await
    }

    /// Returns the recommended delay and risk for an account.
    pub async fn recommend_delay(&self, account_id: &str) -> Recommendation {
        self.recommend_delay_at(account_id, Utc::now()).await
    }

    /// Applies a report event from the manual reporting collaborator.
    pub async fn apply(&self, event: &ReportEvent) -> Result<AccountCooldownState, CooldownError> {
        self.apply_at(event, Utc::now()).await
    }

    pub async fn report_success_at(
        &self,
        account_id: &str,
        observed_delay_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<AccountCooldownState, CooldownError> {
        // Validate before the slot exists so bad input never creates an account.
        check_seconds("observed_delay_seconds", observed_delay_seconds)?;

        let slot = self.slot_or_insert(account_id, now).await;
        let mut state = slot.lock().await;
        self.estimator
            .apply_success(&mut state, observed_delay_seconds, now)?;
        Ok(state.clone())
    }

    pub async fn report_flood_wait_at(
        &self,
        account_id: &str,
        wait_seconds: f64,
        now: DateTime<Utc>,
    ) -> Result<AccountCooldownState, CooldownError> {
        check_seconds("wait_seconds", wait_seconds)?;

        let slot = self.slot_or_insert(account_id, now).await;
        let mut state = slot.lock().await;
        let risk_before = self.estimator.risk_level(&state, now);
        self.estimator.apply_flood_wait(&mut state, wait_seconds, now)?;

        if risk_before < RiskLevel::High && self.estimator.risk_level(&state, now) == RiskLevel::High {
            warn!(
                "[{}] reached HIGH risk after {} consecutive flood waits",
                account_id, state.consecutive_flood_waits
            );
        }
        Ok(state.clone())
    }

    pub async fn apply_at(
        &self,
        event: &ReportEvent,
        now: DateTime<Utc>,
    ) -> Result<AccountCooldownState, CooldownError> {
        match event.outcome {
            ReportOutcome::Success => {
                self.report_success_at(&event.account_id, event.value_seconds, now)
                    .await
            }
            ReportOutcome::FloodWait => {
                self.report_flood_wait_at(&event.account_id, event.value_seconds, now)
                    .await
            }
        }
    }

    pub async fn recommend_delay_at(&self, account_id: &str, now: DateTime<Utc>) -> Recommendation {
        let slot = self.accounts.read().await.get(account_id).cloned();
        match slot {
            Some(slot) => {
                let state = slot.lock().await;
                self.estimator.recommend(Some(&state), now)
            }
            None => self.estimator.recommend(None, now),
        }
    }

    /// Copy of an account's state, if it has been reported.
    pub async fn state(&self, account_id: &str) -> Option<AccountCooldownState> {
        let slot = self.accounts.read().await.get(account_id).cloned()?;
        let state = slot.lock().await;
        Some(state.clone())
    }

    /// Copies of every tracked state, sorted by account id.
    ///
    /// Intended for persisting outside of any lock.
    pub async fn snapshot(&self) -> Vec<AccountCooldownState> {
        let slots: Vec<Slot> = self.accounts.read().await.values().cloned().collect();

        let mut states = Vec::with_capacity(slots.len());
        for slot in slots {
            states.push(slot.lock().await.clone());
        }
        states.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        states
    }

    /// Number of accounts with state.
    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.accounts.read().await.is_empty()
    }

    async fn slot_or_insert(&self, account_id: &str, now: DateTime<Utc>) -> Slot {
        if let Some(slot) = self.accounts.read().await.get(account_id) {
            return Arc::clone(slot);
        }

        let mut accounts = self.accounts.write().await;
        Arc::clone(accounts.entry(account_id.to_owned()).or_insert_with(|| {
            debug!("[{}] first report, starting from default delay", account_id);
            Arc::new(Mutex::new(self.estimator.initial_state(account_id, now)))
        }))
    }
}
