//! Persisted ledger record
//!
//! The on-disk shape keeps one map per bucket field. Every map is optional
//! on read so files written before a field existed still load, and a bucket
//! only has to appear in one of the maps to be restored.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Bucket, BucketDefaults, BucketName};

/// Parallel-map ledger record, overwritten wholesale every tick
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedLedger {
    #[serde(default)]
    pub balances: BTreeMap<BucketName, f64>,
    #[serde(default)]
    pub lifetime_spent: BTreeMap<BucketName, f64>,
    #[serde(default)]
    pub weights: BTreeMap<BucketName, f64>,
    #[serde(default)]
    pub active_flags: BTreeMap<BucketName, bool>,
    #[serde(default)]
    pub caps: BTreeMap<BucketName, Option<f64>>,
    #[serde(default)]
    pub rush_bucket: Option<BucketName>,
}

impl PersistedLedger {
    /// Flatten a bucket map into the parallel-map record
    pub fn from_buckets(
        buckets: &BTreeMap<BucketName, Bucket>,
        rush_bucket: Option<BucketName>,
    ) -> Self {
        let mut record = PersistedLedger {
            rush_bucket,
            ..Default::default()
        };

        for (name, bucket) in buckets {
            record.balances.insert(name.clone(), bucket.balance);
            record
                .lifetime_spent
                .insert(name.clone(), bucket.lifetime_spent);
            record.weights.insert(name.clone(), bucket.weight);
            record.active_flags.insert(name.clone(), bucket.active);
            record.caps.insert(name.clone(), bucket.cap);
        }

        record
    }

    /// Every bucket named in any of the maps
    pub fn bucket_names(&self) -> BTreeSet<BucketName> {
        self.balances
            .keys()
            .chain(self.lifetime_spent.keys())
            .chain(self.weights.keys())
            .chain(self.active_flags.keys())
            .chain(self.caps.keys())
            .cloned()
            .collect()
    }

    /// Rebuild the bucket map.
    ///
    /// Fields missing for a bucket take its defaults. Default buckets absent
    /// from the record are added; buckets only present in the record are kept.
    pub fn into_buckets(self, defaults: &BucketDefaults) -> BTreeMap<BucketName, Bucket> {
        let mut buckets: BTreeMap<BucketName, Bucket> = defaults
            .names()
            .map(|name| (name.clone(), defaults.bucket_for(name)))
            .collect();

        for name in self.bucket_names() {
            let mut bucket = defaults.bucket_for(&name);

            if let Some(balance) = self.balances.get(&name) {
                bucket.balance = sanitize(*balance);
            }
            if let Some(spent) = self.lifetime_spent.get(&name) {
                bucket.lifetime_spent = sanitize(*spent);
            }
            if let Some(weight) = self.weights.get(&name) {
                if weight.is_finite() && *weight >= 0.0 {
                    bucket.weight = *weight;
                }
            }
            if let Some(active) = self.active_flags.get(&name) {
                bucket.active = *active;
            }
            if let Some(cap) = self.caps.get(&name) {
                bucket.cap = cap.filter(|c| c.is_finite() && *c >= 0.0);
            }

            buckets.insert(name, bucket);
        }

        buckets
    }
}

fn sanitize(amount: f64) -> f64 {
    if amount.is_finite() {
        amount.max(0.0)
    } else {
        0.0
    }
}
