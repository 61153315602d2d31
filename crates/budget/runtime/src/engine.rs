//! Tick engine - one synchronous pass of the allocation loop
//!
//! A tick runs, in order:
//! 1. drain the control inbox and apply every valid message
//! 2. read completion markers and retire the listed buckets
//! 3. sample wealth and classify the transition
//! 4. reset everything, or split the income across buckets
//! 5. persist the ledger
//! 6. publish the status snapshot
//!
//! All mutable state lives in [`BudgetContext`], owned by the scheduler and
//! passed into [`run_tick`]. The collaborators live in [`Channels`].

use std::time::Duration;

use budget_types::{BucketDefaults, BucketStatus, StatusSnapshot};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::allocator::Deltas;
use crate::anomaly::{WealthSampler, WealthTransition, DEFAULT_INCOME_WINDOW};
use crate::error::BudgetResult;
use crate::inbox::{apply_payloads, ControlInbox, InboxSummary};
use crate::ledger::BucketLedger;
use crate::markers::CompletionMarkers;
use crate::publisher::StatusPublisher;
use crate::store::{load_ledger, LedgerStore};
use crate::wealth::WealthSource;

/// Default tick interval
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2_000);

/// External collaborators used by a tick
pub struct Channels {
    pub inbox: Box<dyn ControlInbox>,
    pub markers: Box<dyn CompletionMarkers>,
    pub wealth: Box<dyn WealthSource>,
    pub store: Box<dyn LedgerStore>,
    pub publisher: Box<dyn StatusPublisher>,
}

/// Engine settings
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub tick_interval: Duration,
    /// Income samples kept for the rate
    pub income_window: usize,
    pub defaults: BucketDefaults,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            income_window: DEFAULT_INCOME_WINDOW,
            defaults: BucketDefaults::default(),
        }
    }
}

/// Scheduler-owned state carried from tick to tick
#[derive(Clone, Debug)]
pub struct BudgetContext {
    pub ledger: BucketLedger,
    pub sampler: WealthSampler,
    pub tick: u64,
    pub tick_interval: Duration,
    pub last_wealth: Option<f64>,
    pub last_income: f64,
    pub resets_seen: u64,
    /// Purchases not yet matched against a wealth reading
    pub pending_purchases: f64,
}

impl BudgetContext {
    pub fn new(ledger: BucketLedger, config: &EngineConfig) -> Self {
        Self {
            ledger,
            sampler: WealthSampler::new(config.income_window),
            tick: 0,
            tick_interval: config.tick_interval,
            last_wealth: None,
            last_income: 0.0,
            resets_seen: 0,
            pending_purchases: 0.0,
        }
    }

    /// Load persisted state (merged with defaults) and build the context
    pub fn start(store: &dyn LedgerStore, config: &EngineConfig) -> Self {
        let ledger = load_ledger(store, config.defaults.clone());
        Self::new(ledger, config)
    }

    pub fn income_rate(&self) -> f64 {
        self.sampler.rate_per_second(self.tick_interval)
    }

    /// Consolidated view for readers
    pub fn snapshot(&self) -> StatusSnapshot {
        let effective = self.ledger.effective_weights();
        let buckets = self
            .ledger
            .buckets()
            .iter()
            .map(|(name, bucket)| {
                let status = BucketStatus {
                    balance: bucket.balance,
                    weight: bucket.weight,
                    effective_weight: effective.get(name).copied().unwrap_or(0.0),
                    lifetime_spent: bucket.lifetime_spent,
                    active: bucket.active,
                    cap: bucket.cap,
                };
                (name.clone(), status)
            })
            .collect();

        StatusSnapshot {
            timestamp: Utc::now(),
            tick: self.tick,
            total_wealth: self.last_wealth,
            last_income: self.last_income,
            income_rate: self.income_rate(),
            rush_bucket: self.ledger.rush_bucket().cloned(),
            buckets,
        }
    }
}

/// What the wealth step did this tick
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// First reading; established the baseline only
    Baseline,
    /// Income split across buckets
    Allocated { income: f64, deltas: Deltas },
    /// Wealth collapsed; everything was reset and nothing allocated
    Reset { previous: f64, current: f64 },
    /// The wealth counter could not be read
    WealthUnavailable,
}

/// Summary of one tick
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub inbox: InboxSummary,
    pub markers_completed: usize,
    pub outcome: TickOutcome,
}

/// Run one tick.
///
/// Only a persistence failure is returned as an error; the snapshot is still
/// not published in that case. Inbox, marker and wealth read failures are
/// logged and treated as "no input".
pub fn run_tick(ctx: &mut BudgetContext, io: &mut Channels) -> BudgetResult<TickReport> {
    ctx.tick += 1;

    let payloads = io.inbox.drain().unwrap_or_else(|e| {
        warn!(error = %e, "Control inbox drain failed");
        Vec::new()
    });
    let inbox = apply_payloads(&mut ctx.ledger, payloads);
    ctx.pending_purchases += inbox.purchases;

    let markers = io.markers.read().unwrap_or_else(|e| {
        warn!(error = %e, "Completion markers unreadable");
        Vec::new()
    });
    let mut markers_completed = 0;
    for bucket in &markers {
        if ctx.ledger.complete(bucket) {
            markers_completed += 1;
        }
    }

    let outcome = match io.wealth.sample() {
        Ok(current) => {
            ctx.last_wealth = Some(current);
            let purchases = std::mem::take(&mut ctx.pending_purchases);
            match ctx.sampler.observe(current, purchases) {
                WealthTransition::Baseline => {
                    ctx.last_income = 0.0;
                    TickOutcome::Baseline
                }
                WealthTransition::Income(income) => {
                    let deltas = ctx.ledger.allocate(income);
                    ctx.last_income = income;
                    TickOutcome::Allocated { income, deltas }
                }
                WealthTransition::Reset { previous, current } => {
                    apply_reset(ctx, io.markers.as_mut());
                    TickOutcome::Reset { previous, current }
                }
            }
        }
        Err(e) => {
            warn!(error = %e, "Wealth reading unavailable; skipping allocation");
            ctx.last_income = 0.0;
            TickOutcome::WealthUnavailable
        }
    };

    if let Err(e) = io.store.save(&ctx.ledger.to_persisted()) {
        error!(tick = ctx.tick, error = %e, "Ledger persist failed");
        return Err(e);
    }

    if let Err(e) = io.publisher.publish(&ctx.snapshot()) {
        warn!(tick = ctx.tick, error = %e, "Status publish failed");
    }

    debug!(
        tick = ctx.tick,
        applied = inbox.applied,
        dropped = inbox.dropped,
        markers_completed,
        income = ctx.last_income,
        "Tick complete"
    );

    Ok(TickReport {
        tick: ctx.tick,
        inbox,
        markers_completed,
        outcome,
    })
}

fn apply_reset(ctx: &mut BudgetContext, markers: &mut dyn CompletionMarkers) {
    ctx.ledger.reset_all();
    ctx.last_income = 0.0;
    ctx.resets_seen += 1;

    if let Err(e) = markers.clear() {
        warn!(error = %e, "Completion markers could not be cleared");
    }

    info!(
        resets_seen = ctx.resets_seen,
        buckets = ctx.ledger.buckets().len(),
        "Anomaly reset applied"
    );
}

/// Persist the current ledger outside the tick (shutdown path)
pub fn persist(ctx: &BudgetContext, store: &dyn LedgerStore) -> BudgetResult<()> {
    store.save(&ctx.ledger.to_persisted())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inbox::ChannelInbox;
    use crate::markers::InMemoryMarkers;
    use crate::publisher::WatchStatusSlot;
    use crate::store::InMemoryLedgerStore;
    use crate::wealth::ScriptedWealth;
    use budget_types::BucketName;

    fn name(s: &str) -> BucketName {
        BucketName::new(s)
    }

    fn channels(readings: &[f64]) -> (Channels, tokio::sync::mpsc::UnboundedSender<String>) {
        let (tx, inbox) = ChannelInbox::new();
        let (publisher, _rx) = WatchStatusSlot::new();
        let channels = Channels {
            inbox: Box::new(inbox),
            markers: Box::new(InMemoryMarkers::new()),
            wealth: Box::new(ScriptedWealth::new(readings.iter().copied())),
            store: Box::new(InMemoryLedgerStore::new()),
            publisher: Box::new(publisher),
        };
        (channels, tx)
    }

    fn context() -> BudgetContext {
        let config = EngineConfig {
            defaults: BucketDefaults::empty(),
            ..Default::default()
        };
        let mut ledger = BucketLedger::new(BucketDefaults::empty());
        ledger.set_weight(&name("A"), 30.0);
        ledger.set_weight(&name("B"), 10.0);
        BudgetContext::new(ledger, &config)
    }

    #[test]
    fn test_first_tick_is_baseline() {
        let (mut io, _tx) = channels(&[1_000.0]);
        let mut ctx = context();

        let report = run_tick(&mut ctx, &mut io).unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(report.outcome, TickOutcome::Baseline);
        assert_eq!(ctx.ledger.total_balance(), 0.0);
    }

    #[test]
    fn test_income_allocated() {
        let (mut io, _tx) = channels(&[1_000.0, 1_400.0]);
        let mut ctx = context();

        run_tick(&mut ctx, &mut io).unwrap();
        let report = run_tick(&mut ctx, &mut io).unwrap();

        match report.outcome {
            TickOutcome::Allocated { income, deltas } => {
                assert_eq!(income, 400.0);
                assert_eq!(deltas[&name("A")], 300.0);
                assert_eq!(deltas[&name("B")], 100.0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(ctx.last_income, 400.0);
    }

    #[test]
    fn test_wealth_failure_skips_allocation_but_persists() {
        let (mut io, tx) = channels(&[]);
        let mut ctx = context();
        tx.send(r#"{"action":"update-weight","bucket":"A","weight":1}"#.to_string())
            .unwrap();

        let report = run_tick(&mut ctx, &mut io).unwrap();
        assert_eq!(report.outcome, TickOutcome::WealthUnavailable);
        assert_eq!(report.inbox.applied, 1);
        assert_eq!(ctx.sampler.previous(), None);

        let saved = io.store.load().unwrap().unwrap();
        assert_eq!(saved.weights[&name("A")], 1.0);
    }

    #[test]
    fn test_purchases_carry_over_failed_wealth_read() {
        let (mut io, tx) = channels(&[]);
        let mut ctx = context();
        io.wealth = Box::new(ScriptedWealth::new([1_000.0]));
        run_tick(&mut ctx, &mut io).unwrap();

        // exhausted source: the read fails on this tick
        tx.send(r#"{"action":"purchased","bucket":"A","amount":120}"#.to_string())
            .unwrap();
        let report = run_tick(&mut ctx, &mut io).unwrap();
        assert_eq!(report.outcome, TickOutcome::WealthUnavailable);
        assert_eq!(ctx.pending_purchases, 120.0);

        io.wealth = Box::new(ScriptedWealth::new([1_400.0]));
        let report = run_tick(&mut ctx, &mut io).unwrap();
        match report.outcome {
            TickOutcome::Allocated { income, .. } => assert_eq!(income, 280.0),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(ctx.pending_purchases, 0.0);
    }
}
