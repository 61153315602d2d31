//! Bucket Ledger - the owned map of bucket state
//!
//! Every mutation of bucket balances, weights, flags, caps and the rush
//! target goes through this type. It keeps two invariants on its own:
//! balances never go negative, and the rush target is always an active
//! bucket (or nothing).

use std::collections::BTreeMap;

use budget_types::{Bucket, BucketDefaults, BucketName, PersistedLedger};
use tracing::{debug, info, warn};

use crate::allocator::{self, Deltas};

/// Owned ledger of every bucket the daemon has seen
#[derive(Clone, Debug)]
pub struct BucketLedger {
    buckets: BTreeMap<BucketName, Bucket>,
    rush_bucket: Option<BucketName>,
    defaults: BucketDefaults,
}

impl BucketLedger {
    /// A fresh ledger holding only the default buckets
    pub fn new(defaults: BucketDefaults) -> Self {
        Self::from_persisted(PersistedLedger::default(), defaults)
    }

    /// Rebuild from a persisted record, merged with the default set
    pub fn from_persisted(record: PersistedLedger, defaults: BucketDefaults) -> Self {
        let rush_bucket = record.rush_bucket.clone();
        let buckets = record.into_buckets(&defaults);

        let mut ledger = Self {
            buckets,
            rush_bucket,
            defaults,
        };
        ledger.clear_dead_rush();
        ledger
    }

    /// Flatten into the persisted record
    pub fn to_persisted(&self) -> PersistedLedger {
        PersistedLedger::from_buckets(&self.buckets, self.rush_bucket.clone())
    }

    // --- Bucket access ---

    /// Get a bucket, creating it with its defaults on first reference
    pub fn ensure(&mut self, name: &BucketName) -> &mut Bucket {
        if !self.buckets.contains_key(name) {
            debug!(bucket = %name, "Bucket created");
        }
        let defaults = &self.defaults;
        self.buckets
            .entry(name.clone())
            .or_insert_with(|| defaults.bucket_for(name))
    }

    pub fn get(&self, name: &BucketName) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    pub fn buckets(&self) -> &BTreeMap<BucketName, Bucket> {
        &self.buckets
    }

    pub fn rush_bucket(&self) -> Option<&BucketName> {
        self.rush_bucket.as_ref()
    }

    pub fn defaults(&self) -> &BucketDefaults {
        &self.defaults
    }

    pub fn weights(&self) -> BTreeMap<BucketName, f64> {
        self.buckets
            .iter()
            .map(|(name, bucket)| (name.clone(), bucket.weight))
            .collect()
    }

    pub fn active_flags(&self) -> BTreeMap<BucketName, bool> {
        self.buckets
            .iter()
            .map(|(name, bucket)| (name.clone(), bucket.active))
            .collect()
    }

    pub fn effective_weights(&self) -> BTreeMap<BucketName, f64> {
        allocator::effective_weights(
            &self.weights(),
            &self.active_flags(),
            self.rush_bucket.as_ref(),
        )
    }

    pub fn total_balance(&self) -> f64 {
        self.buckets.values().map(|b| b.balance).sum()
    }

    // --- Income ---

    /// Split income with the allocator and credit the result
    pub fn allocate(&mut self, income: f64) -> Deltas {
        let deltas = allocator::split(
            income,
            &self.weights(),
            &self.active_flags(),
            self.rush_bucket.as_ref(),
        );
        self.credit(&deltas);
        deltas
    }

    /// Credit precomputed deltas. Unknown or inactive buckets are skipped.
    pub fn credit(&mut self, deltas: &Deltas) {
        for (name, delta) in deltas {
            match self.buckets.get_mut(name) {
                Some(bucket) if bucket.active => bucket.credit(*delta),
                _ => warn!(bucket = %name, delta, "Credit for inactive or unknown bucket skipped"),
            }
        }
    }

    // --- Control operations ---

    /// Debit a purchase; the balance floors at zero
    pub fn record_purchase(&mut self, name: &BucketName, amount: f64) {
        if !(amount.is_finite() && amount > 0.0) {
            warn!(bucket = %name, amount, "Purchase amount rejected");
            return;
        }
        let bucket = self.ensure(name);
        bucket.debit(amount);

        debug!(
            bucket = %name,
            amount,
            balance = bucket.balance,
            lifetime_spent = bucket.lifetime_spent,
            "Purchase recorded"
        );
    }

    /// Retire a bucket.
    ///
    /// The residual balance stays for manual draining and the weight is kept;
    /// an inactive bucket is simply left out of normalization. Returns false
    /// when the bucket was already inactive.
    pub fn complete(&mut self, name: &BucketName) -> bool {
        let bucket = self.ensure(name);
        if !bucket.active {
            return false;
        }
        bucket.active = false;
        let residual = bucket.balance;

        info!(bucket = %name, residual, "Bucket completed");
        self.clear_dead_rush();
        true
    }

    /// Record the remaining known cost as an advisory cap
    pub fn report_cap(&mut self, name: &BucketName, remaining: f64) {
        if !(remaining.is_finite() && remaining >= 0.0) {
            warn!(bucket = %name, remaining, "Cap rejected");
            return;
        }
        let bucket = self.ensure(name);
        bucket.cap = Some(bucket.lifetime_spent + remaining);
        debug!(bucket = %name, cap = ?bucket.cap, "Cap reported");
    }

    pub fn set_weight(&mut self, name: &BucketName, weight: f64) {
        if !(weight.is_finite() && weight >= 0.0) {
            warn!(bucket = %name, weight, "Weight rejected");
            return;
        }
        self.ensure(name).weight = weight;
        debug!(bucket = %name, weight, "Weight updated");
    }

    /// Restore every bucket's documented default weight
    pub fn reset_weights(&mut self) {
        for (name, bucket) in self.buckets.iter_mut() {
            bucket.weight = self.defaults.weight_for(name);
        }
        info!(buckets = self.buckets.len(), "Weights reset to defaults");
    }

    /// Route all income to one bucket. A rush on an inactive bucket is ignored.
    pub fn start_rush(&mut self, name: &BucketName) -> bool {
        if !self.ensure(name).active {
            warn!(bucket = %name, "Rush ignored for inactive bucket");
            return false;
        }
        if self.rush_bucket.as_ref() != Some(name) {
            info!(bucket = %name, previous = ?self.rush_bucket, "Rush started");
        }
        self.rush_bucket = Some(name.clone());
        true
    }

    pub fn cancel_rush(&mut self) {
        if let Some(previous) = self.rush_bucket.take() {
            info!(bucket = %previous, "Rush cancelled");
        }
    }

    /// Full reset after a catastrophic wealth drop.
    ///
    /// Zeroes balances and lifetime spend, reactivates everything, clears caps
    /// and the rush. Weights and the bucket set survive.
    pub fn reset_all(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.balance = 0.0;
            bucket.lifetime_spent = 0.0;
            bucket.active = true;
            bucket.cap = None;
        }
        self.rush_bucket = None;
    }

    fn clear_dead_rush(&mut self) {
        let dead = match &self.rush_bucket {
            Some(name) => !self.buckets.get(name).map(|b| b.active).unwrap_or(false),
            None => false,
        };
        if dead {
            if let Some(name) = self.rush_bucket.take() {
                info!(bucket = %name, "Rush cleared: bucket inactive");
            }
        }
    }
}
