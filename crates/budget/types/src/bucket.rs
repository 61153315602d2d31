//! Bucket types: named accumulators of spendable value
//!
//! A bucket is created on first reference and never removed. Retiring a
//! bucket flips `active` to false; the record itself stays in the ledger.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weight given to buckets that are not part of the default set
pub const DEFAULT_FALLBACK_WEIGHT: f64 = 1.0;

/// Unique identifier for a bucket
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BucketName(pub String);

impl BucketName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BucketName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// A spending bucket
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Currency currently available to spend (never negative)
    pub balance: f64,
    /// Relative share of income while active
    pub weight: f64,
    /// Inactive buckets receive no income
    pub active: bool,
    /// Cumulative amount debited over the bucket's life
    pub lifetime_spent: f64,
    /// Advisory ceiling: lifetime spent plus remaining known cost
    pub cap: Option<f64>,
}

impl Bucket {
    /// A fresh bucket with the given weight
    pub fn new(weight: f64) -> Self {
        Self {
            balance: 0.0,
            weight,
            active: true,
            lifetime_spent: 0.0,
            cap: None,
        }
    }

    /// Add income to the balance
    pub fn credit(&mut self, amount: f64) {
        if amount > 0.0 {
            self.balance += amount;
        }
    }

    /// Debit a purchase. The balance floors at zero; lifetime spend records
    /// the full amount.
    pub fn debit(&mut self, amount: f64) {
        self.balance = (self.balance - amount).max(0.0);
        self.lifetime_spent += amount;
    }

    /// Remaining advisory headroom under the cap, if one was reported
    pub fn remaining_to_cap(&self) -> Option<f64> {
        self.cap.map(|cap| (cap - self.lifetime_spent).max(0.0))
    }
}

/// Compiled-in default bucket set and the weight for everything else
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BucketDefaults {
    /// Default buckets and their default weights
    pub weights: BTreeMap<BucketName, f64>,
    /// Default weight for buckets outside the default set
    pub fallback_weight: f64,
}

impl BucketDefaults {
    pub fn new(weights: BTreeMap<BucketName, f64>, fallback_weight: f64) -> Self {
        Self {
            weights,
            fallback_weight,
        }
    }

    /// No default buckets; every bucket gets the fallback weight
    pub fn empty() -> Self {
        Self::new(BTreeMap::new(), DEFAULT_FALLBACK_WEIGHT)
    }

    /// The documented default weight for a bucket
    pub fn weight_for(&self, name: &BucketName) -> f64 {
        self.weights
            .get(name)
            .copied()
            .unwrap_or(self.fallback_weight)
    }

    /// A fresh bucket carrying its default weight
    pub fn bucket_for(&self, name: &BucketName) -> Bucket {
        Bucket::new(self.weight_for(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &BucketName> {
        self.weights.keys()
    }
}

impl Default for BucketDefaults {
    fn default() -> Self {
        let weights = [
            ("servers", 40.0),
            ("hacknet", 20.0),
            ("programs", 10.0),
            ("augmentations", 30.0),
        ]
        .into_iter()
        .map(|(name, weight)| (BucketName::new(name), weight))
        .collect();

        Self::new(weights, DEFAULT_FALLBACK_WEIGHT)
    }
}
