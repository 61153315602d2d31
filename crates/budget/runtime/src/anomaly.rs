//! Wealth sampling and anomaly detection
//!
//! The daemon only sees periodic readings of a single wealth counter. Each
//! transition between two readings is classified as:
//! - **Income**: `max(0, current - previous - purchases_this_tick)`; spending
//!   outside the tracked buckets shows up as a negative raw delta and is
//!   absorbed as zero income
//! - **Reset**: the counter collapsed below [`RESET_DROP_RATIO`] of the
//!   previous reading (a full progression reset)

use std::collections::VecDeque;
use std::time::Duration;

use tracing::warn;

/// A reading below this fraction of the previous one is a reset
pub const RESET_DROP_RATIO: f64 = 0.10;

/// Default number of income samples kept for the rate
pub const DEFAULT_INCOME_WINDOW: usize = 10;

/// Classification of one wealth transition
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WealthTransition {
    /// First reading; nothing to compare against
    Baseline,
    /// Normal tick with the derived income (may be zero)
    Income(f64),
    /// Catastrophic drop
    Reset { previous: f64, current: f64 },
}

/// Classify a transition between two readings
pub fn classify(previous: Option<f64>, current: f64, purchases_this_tick: f64) -> WealthTransition {
    let Some(previous) = previous else {
        return WealthTransition::Baseline;
    };

    if current < previous * RESET_DROP_RATIO {
        return WealthTransition::Reset { previous, current };
    }

    let income = (current - previous - purchases_this_tick).max(0.0);
    WealthTransition::Income(income)
}

/// Bounded trailing window of income samples
#[derive(Clone, Debug)]
pub struct IncomeHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl IncomeHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, income: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(income);
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean income per tick over the window
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Mean income scaled to a per-second rate (display only)
    pub fn rate_per_second(&self, tick_interval: Duration) -> f64 {
        let secs = tick_interval.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.mean() / secs
    }
}

impl Default for IncomeHistory {
    fn default() -> Self {
        Self::new(DEFAULT_INCOME_WINDOW)
    }
}

/// Tracks the previous reading and the income history across ticks
#[derive(Clone, Debug, Default)]
pub struct WealthSampler {
    previous: Option<f64>,
    history: IncomeHistory,
}

impl WealthSampler {
    pub fn new(window: usize) -> Self {
        Self {
            previous: None,
            history: IncomeHistory::new(window),
        }
    }

    /// Take a new reading, classify it and update the history.
    ///
    /// A reset clears the income history.
    pub fn observe(&mut self, current: f64, purchases_this_tick: f64) -> WealthTransition {
        let transition = classify(self.previous, current, purchases_this_tick);

        match transition {
            WealthTransition::Baseline => {}
            WealthTransition::Income(income) => self.history.push(income),
            WealthTransition::Reset { previous, current } => {
                warn!(previous, current, "Wealth collapse detected");
                self.history.clear();
            }
        }

        self.previous = Some(current);
        transition
    }

    pub fn previous(&self) -> Option<f64> {
        self.previous
    }

    pub fn history(&self) -> &IncomeHistory {
        &self.history
    }

    pub fn rate_per_second(&self, tick_interval: Duration) -> f64 {
        self.history.rate_per_second(tick_interval)
    }
}
