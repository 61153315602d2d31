//! Status Publisher - single-slot, overwrite-only snapshot channel

use std::path::{Path, PathBuf};

use budget_types::StatusSnapshot;
use tokio::sync::watch;

use crate::error::{BudgetError, BudgetResult};
use crate::store::atomic_write;

/// Sink for the per-tick status snapshot.
///
/// Each publish replaces the previous snapshot; readers never see a backlog.
pub trait StatusPublisher: Send {
    fn publish(&mut self, snapshot: &StatusSnapshot) -> BudgetResult<()>;
}

/// Snapshot written to a JSON file, atomically replaced every tick
pub struct FileStatusSlot {
    path: PathBuf,
}

impl FileStatusSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusPublisher for FileStatusSlot {
    fn publish(&mut self, snapshot: &StatusSnapshot) -> BudgetResult<()> {
        let json = serde_json::to_string_pretty(snapshot)?;
        atomic_write(&self.path, &json)
            .map_err(|e| BudgetError::Publish(format!("write {}: {}", self.path.display(), e)))
    }
}

/// Read the latest snapshot from a status file, `None` if nothing was published yet
pub fn read_status_file(path: &Path) -> BudgetResult<Option<StatusSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// In-process slot backed by a tokio watch channel
pub struct WatchStatusSlot {
    tx: watch::Sender<Option<StatusSnapshot>>,
}

impl WatchStatusSlot {
    /// Create the slot and a receiver that always sees the latest snapshot
    pub fn new() -> (Self, watch::Receiver<Option<StatusSnapshot>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusSnapshot>> {
        self.tx.subscribe()
    }
}

impl StatusPublisher for WatchStatusSlot {
    fn publish(&mut self, snapshot: &StatusSnapshot) -> BudgetResult<()> {
        // send_replace keeps working with no live receivers
        self.tx.send_replace(Some(snapshot.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn snapshot(tick: u64) -> StatusSnapshot {
        StatusSnapshot {
            timestamp: Utc::now(),
            tick,
            total_wealth: Some(100.0),
            last_income: 0.0,
            income_rate: 0.0,
            rush_bucket: None,
            buckets: BTreeMap::new(),
        }
    }

    #[test]
    fn test_file_slot_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let mut slot = FileStatusSlot::new(&path);

        assert!(read_status_file(&path).unwrap().is_none());

        slot.publish(&snapshot(1)).unwrap();
        slot.publish(&snapshot(2)).unwrap();

        let latest = read_status_file(&path).unwrap().unwrap();
        assert_eq!(latest.tick, 2);
    }

    #[test]
    fn test_watch_slot_keeps_latest_only() {
        let (mut slot, rx) = WatchStatusSlot::new();
        assert!(rx.borrow().is_none());

        slot.publish(&snapshot(1)).unwrap();
        slot.publish(&snapshot(2)).unwrap();

        assert_eq!(rx.borrow().as_ref().map(|s| s.tick), Some(2));
        assert_eq!(slot.subscribe().borrow().as_ref().map(|s| s.tick), Some(2));
    }
}
