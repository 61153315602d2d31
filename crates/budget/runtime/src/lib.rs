//! Budget allocation runtime
//!
//! Observes an external wealth counter, turns the change between readings
//! into income, and splits that income across weighted spending buckets:
//! - **Allocator**: pure proportional split with a rush override
//! - **Bucket Ledger**: the only place bucket state is mutated
//! - **Anomaly Detector**: income vs. catastrophic reset
//! - **Control Inbox / Completion Markers**: out-of-band commands from consumers
//! - **State Store / Status Publisher**: persistence and the read-only snapshot
//! - **Engine**: one tick of the loop over a scheduler-owned context
//!
//! Every external collaborator is a trait with a file-backed and an in-memory
//! implementation.

pub mod allocator;
pub mod anomaly;
pub mod engine;
pub mod error;
pub mod inbox;
pub mod ledger;
pub mod markers;
pub mod publisher;
pub mod store;
pub mod wealth;

pub use allocator::{effective_weights, split, Deltas};
pub use anomaly::{
    classify, IncomeHistory, WealthSampler, WealthTransition, DEFAULT_INCOME_WINDOW,
    RESET_DROP_RATIO,
};
pub use engine::{
    persist, run_tick, BudgetContext, Channels, EngineConfig, TickOutcome, TickReport,
    DEFAULT_TICK_INTERVAL,
};
pub use error::{BudgetError, BudgetResult};
pub use inbox::{
    append_to_spool, apply_message, apply_payloads, ChannelInbox, ControlInbox, InboxSummary,
    SpoolFileInbox,
};
pub use ledger::BucketLedger;
pub use markers::{append_marker, CompletionMarkers, InMemoryMarkers, MarkerFile};
pub use publisher::{read_status_file, FileStatusSlot, StatusPublisher, WatchStatusSlot};
pub use store::{load_ledger, InMemoryLedgerStore, JsonFileLedgerStore, LedgerStore};
pub use wealth::{ScriptedWealth, WealthFile, WealthSource};
