//! JSON file and in-memory stores.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CooldownStore, StoreError};
use crate::cooldown::AccountCooldownState;

/// On-disk document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub accounts: Vec<AccountCooldownState>,
}

/// Stores all account states in one pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CooldownStore for JsonFileStore {
    /// A missing file loads as no accounts. A corrupt one is an error,
    /// since silently starting over would forget learned delays.
    fn load(&self) -> Result<Vec<AccountCooldownState>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {}, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let file: StateFile = serde_json::from_str(&content)?;
        debug!(
            "Loaded {} account states from {}",
            file.accounts.len(),
            self.path.display()
        );
        Ok(file.accounts)
    }

    fn save(&self, states: &[AccountCooldownState]) -> Result<(), StoreError> {
        let file = StateFile {
            accounts: states.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;

        info!(
            "Saved {} account states to {}",
            states.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keeps states in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    states: Mutex<Vec<AccountCooldownState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CooldownStore for MemoryStore {
    fn load(&self) -> Result<Vec<AccountCooldownState>, StoreError> {
        let saved = self
            .states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(saved.clone())
    }

    fn save(&self, states: &[AccountCooldownState]) -> Result<(), StoreError> {
        let mut saved = self
            .states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *saved = states.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn unique_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "join_cooldown_{}_{}_{name}.json",
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ))
    }

    fn sample() -> AccountCooldownState {
        let mut state = AccountCooldownState::new(
            "acc1",
            450.0,
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        );
        state.consecutive_flood_waits = 1;
        state.last_flood_wait_seconds = Some(300.0);
        state.last_flood_wait_at = Some(state.last_event_at);
        state
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = JsonFileStore::new(unique_path("missing"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let path = unique_path("save");
        let store = JsonFileStore::new(&path);
        store.save(&[sample()]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, vec![sample()]);
        assert!(!store.temp_path().exists());

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let path = unique_path("corrupt");
        std::fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Parse(_))));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_save_from_stale_load_drops_other_accounts() {
        // Last writer wins: a save built from an older load replaces the file.
        let path = unique_path("stale");
        let store = JsonFileStore::new(&path);

        let first = store.load().unwrap();
        let second = store.load().unwrap();

        let mut a = first;
        a.push(sample());
        store.save(&a).unwrap();

        let mut b = second;
        let mut other = sample();
        other.account_id = "acc2".to_owned();
        b.push(other);
        store.save(&b).unwrap();

        let ids: Vec<_> = store.load().unwrap().into_iter().map(|s| s.account_id).collect();
        assert_eq!(ids, ["acc2"]);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_memory_store_replaces_contents() {
        let store = MemoryStore::new();
        store.save(&[sample(), sample()]).unwrap();
        store.save(&[sample()]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
