//! Allocator - splits one tick's income across active buckets
//!
//! Pure functions over weights and active flags. The ledger applies the
//! result; nothing here mutates state.

use std::collections::BTreeMap;

use budget_types::BucketName;

/// Per-bucket credit for one tick
pub type Deltas = BTreeMap<BucketName, f64>;

fn is_active(active: &BTreeMap<BucketName, bool>, name: &BucketName) -> bool {
    active.get(name).copied().unwrap_or(false)
}

fn rush_target<'a>(
    active: &BTreeMap<BucketName, bool>,
    rush: Option<&'a BucketName>,
) -> Option<&'a BucketName> {
    rush.filter(|name| is_active(active, name))
}

/// Sum of weights over active buckets
pub fn active_weight_total(
    weights: &BTreeMap<BucketName, f64>,
    active: &BTreeMap<BucketName, bool>,
) -> f64 {
    weights
        .iter()
        .filter(|(name, weight)| is_active(active, name) && weight.is_finite() && **weight > 0.0)
        .map(|(_, weight)| *weight)
        .sum()
}

/// Split `income` across buckets.
///
/// - zero income yields no deltas
/// - an active rush bucket takes all of it
/// - otherwise each active bucket gets `income * weight / S`, where `S` is
///   the active weight total; `S = 0` discards the income
///
/// The returned deltas sum to `income`; none is negative.
pub fn split(
    income: f64,
    weights: &BTreeMap<BucketName, f64>,
    active: &BTreeMap<BucketName, bool>,
    rush: Option<&BucketName>,
) -> Deltas {
    let mut deltas = Deltas::new();
    if !(income.is_finite() && income > 0.0) {
        return deltas;
    }

    if let Some(target) = rush_target(active, rush) {
        deltas.insert(target.clone(), income);
        return deltas;
    }

    let total = active_weight_total(weights, active);
    if total <= 0.0 {
        return deltas;
    }

    let receivers: Vec<(&BucketName, f64)> = weights
        .iter()
        .filter(|(name, weight)| is_active(active, name) && weight.is_finite() && **weight > 0.0)
        .map(|(name, weight)| (name, *weight))
        .collect();

    // The last receiver takes whatever is left so rounding never loses more
    // than floating point error.
    let mut assigned = 0.0;
    for (i, (name, weight)) in receivers.iter().enumerate() {
        let share = if i + 1 == receivers.len() {
            (income - assigned).max(0.0)
        } else {
            (income * weight / total).min(income - assigned).max(0.0)
        };
        assigned += share;
        if share > 0.0 {
            deltas.insert((*name).clone(), share);
        }
    }

    deltas
}

/// Share of income each bucket would receive right now.
///
/// 1.0 for an active rush bucket and 0 for everyone else while rushing;
/// otherwise `weight / S` for active buckets and 0 for inactive ones.
pub fn effective_weights(
    weights: &BTreeMap<BucketName, f64>,
    active: &BTreeMap<BucketName, bool>,
    rush: Option<&BucketName>,
) -> BTreeMap<BucketName, f64> {
    let target = rush_target(active, rush);
    let total = active_weight_total(weights, active);

    weights
        .iter()
        .map(|(name, weight)| {
            let effective = match target {
                Some(target) if target == name => 1.0,
                Some(_) => 0.0,
                None if is_active(active, name) && total > 0.0 && *weight > 0.0 => {
                    weight / total
                }
                None => 0.0,
            };
            (name.clone(), effective)
        })
        .collect()
}
