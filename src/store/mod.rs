//! Persistence for learned cooldown state.
//!
//! The tracker never touches storage itself. Callers load states before
//! building a tracker and save a snapshot after reports, outside any lock.

mod json;

pub use json::{JsonFileStore, MemoryStore, StateFile};

use thiserror::Error;

use crate::cooldown::AccountCooldownState;

/// Errors raised while loading or saving cooldown state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse state file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Backing storage for account cooldown states.
///
/// Stores hold the whole account set: callers load everything, apply
/// reports, then save everything back. Two processes doing this against the
/// same store at once can lose a report, since the later save replaces the
/// earlier one. Nothing here locks across processes; callers that run
/// concurrently (for example several CLI invocations on one state file) must
/// serialise access themselves.
pub trait CooldownStore {
    /// Loads every saved account state.
    fn load(&self) -> Result<Vec<AccountCooldownState>, StoreError>;

    /// Replaces the saved states with `states`.
    ///
    /// Accounts missing from `states` are dropped from the store.
    fn save(&self, states: &[AccountCooldownState]) -> Result<(), StoreError>;
}
