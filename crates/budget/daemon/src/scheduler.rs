//! Tick scheduler
//!
//! Owns the [`BudgetContext`] and the collaborators, drives one tick per
//! interval and persists once more on shutdown.

use std::future::Future;

use budget_runtime::{
    persist, run_tick, BudgetContext, BudgetResult, Channels, FileStatusSlot, JsonFileLedgerStore,
    MarkerFile, SpoolFileInbox, TickOutcome, TickReport, WealthFile,
};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonResult;

/// Scheduler state
pub struct Scheduler {
    ctx: BudgetContext,
    io: Channels,
}

impl Scheduler {
    /// Create a scheduler over an existing context and collaborators
    pub fn new(ctx: BudgetContext, io: Channels) -> Self {
        Self { ctx, io }
    }

    /// Build the file-backed scheduler described by the configuration
    pub fn from_config(config: &DaemonConfig) -> DaemonResult<Self> {
        let paths = &config.paths;
        std::fs::create_dir_all(&paths.data_dir)?;

        let store = JsonFileLedgerStore::new(paths.ledger_path());
        let ctx = BudgetContext::start(&store, &config.engine_config());

        let io = Channels {
            inbox: Box::new(SpoolFileInbox::new(paths.inbox_path())),
            markers: Box::new(MarkerFile::new(paths.markers_path())),
            wealth: Box::new(WealthFile::new(paths.wealth_path())),
            store: Box::new(store),
            publisher: Box::new(FileStatusSlot::new(paths.status_path())),
        };

        info!(
            data_dir = %paths.data_dir.display(),
            buckets = ctx.ledger.buckets().len(),
            rush = ?ctx.ledger.rush_bucket(),
            "Ledger loaded"
        );

        Ok(Self::new(ctx, io))
    }

    pub fn context(&self) -> &BudgetContext {
        &self.ctx
    }

    /// Run a single tick
    pub fn run_once(&mut self) -> BudgetResult<TickReport> {
        let report = run_tick(&mut self.ctx, &mut self.io)?;

        match &report.outcome {
            TickOutcome::Allocated { income, deltas } if *income > 0.0 => {
                debug!(tick = report.tick, income, buckets = deltas.len(), "Income allocated");
            }
            TickOutcome::Reset { previous, current } => {
                warn!(tick = report.tick, previous, current, "Ledger reset after wealth collapse");
            }
            _ => {}
        }

        Ok(report)
    }

    /// Tick until interrupted by Ctrl+C or SIGTERM
    pub async fn run(&mut self) -> u64 {
        self.run_until(shutdown_signal()).await
    }

    /// Tick on the configured interval until `shutdown` resolves.
    ///
    /// A failed tick is logged and the next tick retries. Returns the number
    /// of ticks run.
    pub async fn run_until<F>(&mut self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.ctx.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval_ms = self.ctx.tick_interval.as_millis() as u64,
            "Scheduler started"
        );

        let mut ticks = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    ticks += 1;
                    if let Err(e) = self.run_once() {
                        error!(tick = self.ctx.tick, error = %e, "Tick failed");
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        self.shutdown();
        info!(ticks, "Scheduler stopped");
        ticks
    }

    /// Final persist on the way out
    fn shutdown(&self) {
        if let Err(e) = persist(&self.ctx, self.io.store.as_ref()) {
            error!(error = %e, "Final persist failed");
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
