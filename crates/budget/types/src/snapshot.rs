//! Status snapshots - the consolidated record published once per tick.
//!
//! Readers (dashboards, `budgetd status`) only ever see the latest snapshot.
//! Nothing read from a snapshot flows back into the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::BucketName;

/// Point-in-time view of the ledger and derived rates
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// When the snapshot was built
    pub timestamp: DateTime<Utc>,
    /// Tick number that produced this snapshot
    pub tick: u64,
    /// Latest wealth reading, if one has been taken
    pub total_wealth: Option<f64>,
    /// Income credited by the last tick
    pub last_income: f64,
    /// Trailing income rate per second
    pub income_rate: f64,
    /// Current rush target
    pub rush_bucket: Option<BucketName>,
    /// Per-bucket state, in name order
    pub buckets: BTreeMap<BucketName, BucketStatus>,
}

impl StatusSnapshot {
    /// Sum of every bucket balance
    pub fn total_balance(&self) -> f64 {
        self.buckets.values().map(|b| b.balance).sum()
    }

    pub fn active_count(&self) -> usize {
        self.buckets.values().filter(|b| b.active).count()
    }
}

/// One bucket as seen by readers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketStatus {
    pub balance: f64,
    pub weight: f64,
    /// Share of income this bucket would receive right now (0.0-1.0)
    pub effective_weight: f64,
    pub lifetime_spent: f64,
    pub active: bool,
    pub cap: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(balance: f64, active: bool) -> BucketStatus {
        BucketStatus {
            balance,
            weight: 1.0,
            effective_weight: if active { 1.0 } else { 0.0 },
            lifetime_spent: 0.0,
            active,
            cap: None,
        }
    }

    #[test]
    fn test_totals() {
        let mut buckets = BTreeMap::new();
        buckets.insert(BucketName::new("A"), status(100.0, true));
        buckets.insert(BucketName::new("B"), status(50.0, false));

        let snapshot = StatusSnapshot {
            timestamp: Utc::now(),
            tick: 3,
            total_wealth: Some(1_000.0),
            last_income: 0.0,
            income_rate: 0.0,
            rush_bucket: None,
            buckets,
        };

        assert_eq!(snapshot.total_balance(), 150.0);
        assert_eq!(snapshot.active_count(), 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json.get("totalWealth").is_some());
        assert!(json["buckets"]["A"].get("effectiveWeight").is_some());
    }
}
