//! State Store - load and persist the ledger across restarts.
//!
//! Provides the `LedgerStore` trait, a `JsonFileLedgerStore` that keeps the
//! ledger as a single JSON file, and an in-memory store for tests.
//!
//! Loading distinguishes an absent record (`Ok(None)`) from a corrupt one
//! (`Err(BudgetError::CorruptState)`). Startup treats both as "start from
//! defaults"; see [`load_ledger`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use budget_types::{BucketDefaults, PersistedLedger};
use tracing::{info, warn};

use crate::error::{BudgetError, BudgetResult};
use crate::ledger::BucketLedger;

/// Persistence for the ledger record
pub trait LedgerStore: Send {
    /// Load the persisted record, `None` if nothing was ever saved
    fn load(&self) -> BudgetResult<Option<PersistedLedger>>;

    /// Overwrite the persisted record
    fn save(&self, record: &PersistedLedger) -> BudgetResult<()>;
}

/// Write `contents` to `path` atomically (write to `.tmp`, then rename)
pub(crate) fn atomic_write(path: &Path, contents: &str) -> BudgetResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// JSON-file ledger persistence.
///
/// Writes are atomic so an interrupted tick never leaves a torn file.
pub struct JsonFileLedgerStore {
    path: PathBuf,
}

impl JsonFileLedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileLedgerStore {
    fn load(&self) -> BudgetResult<Option<PersistedLedger>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        let record = serde_json::from_str(&contents).map_err(|e| BudgetError::CorruptState {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        Ok(Some(record))
    }

    fn save(&self, record: &PersistedLedger) -> BudgetResult<()> {
        let json = serde_json::to_string_pretty(record)?;
        atomic_write(&self.path, &json)
            .map_err(|e| BudgetError::Store(format!("write {}: {}", self.path.display(), e)))
    }
}

/// In-memory ledger persistence (for testing).
///
/// Clones share the same slot, so a test can keep a handle after giving the
/// store to the engine.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedgerStore {
    data: Arc<Mutex<Option<PersistedLedger>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: PersistedLedger) -> Self {
        Self {
            data: Arc::new(Mutex::new(Some(record))),
        }
    }

    /// Last saved record
    pub fn saved(&self) -> Option<PersistedLedger> {
        self.data.lock().ok().and_then(|data| data.clone())
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn load(&self) -> BudgetResult<Option<PersistedLedger>> {
        let data = self
            .data
            .lock()
            .map_err(|_| BudgetError::Store("lock poisoned".into()))?;
        Ok(data.clone())
    }

    fn save(&self, record: &PersistedLedger) -> BudgetResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| BudgetError::Store("lock poisoned".into()))?;
        *data = Some(record.clone());
        Ok(())
    }
}

/// Load the ledger at startup, merged with the default bucket set.
///
/// Never fails: an absent, unreadable or corrupt record falls back to a
/// fresh default ledger.
pub fn load_ledger(store: &dyn LedgerStore, defaults: BucketDefaults) -> BucketLedger {
    match store.load() {
        Ok(Some(record)) => {
            let ledger = BucketLedger::from_persisted(record, defaults);
            info!(buckets = ledger.buckets().len(), "Ledger state loaded");
            ledger
        }
        Ok(None) => {
            info!("No persisted ledger; starting from defaults");
            BucketLedger::new(defaults)
        }
        Err(e) => {
            warn!(error = %e, "Persisted ledger unusable; starting from defaults");
            BucketLedger::new(defaults)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budget_types::BucketName;

    fn name(s: &str) -> BucketName {
        BucketName::new(s)
    }

    #[test]
    fn json_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path().join("ledger.json"));

        let mut ledger = BucketLedger::new(BucketDefaults::empty());
        ledger.set_weight(&name("A"), 30.0);
        ledger.set_weight(&name("B"), 10.0);
        ledger.allocate(400.0);
        ledger.report_cap(&name("A"), 90.0);
        ledger.complete(&name("B"));

        store.save(&ledger.to_persisted()).unwrap();
        let restored = load_ledger(&store, BucketDefaults::empty());

        assert_eq!(restored.buckets(), ledger.buckets());
        assert!(!dir.path().join("ledger.tmp").exists());
    }

    #[test]
    fn json_load_nonexistent_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path().join("missing.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn json_load_corrupt_is_distinguished() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileLedgerStore::new(&path);
        assert!(matches!(
            store.load(),
            Err(BudgetError::CorruptState { .. })
        ));

        // startup falls back to defaults
        let ledger = load_ledger(&store, BucketDefaults::default());
        assert_eq!(ledger.buckets().len(), 4);
        assert_eq!(ledger.total_balance(), 0.0);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileLedgerStore::new(dir.path().join("nested/state/ledger.json"));
        store.save(&PersistedLedger::default()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn in_memory_persistence() {
        let store = InMemoryLedgerStore::new();
        assert!(store.load().unwrap().is_none());

        let handle = store.clone();
        let ledger = BucketLedger::new(BucketDefaults::default());
        store.save(&ledger.to_persisted()).unwrap();

        assert_eq!(handle.saved().unwrap().weights.len(), 4);
    }
}
