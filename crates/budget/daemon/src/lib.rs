//! budgetd library
//!
//! Process-level pieces of the budget daemon:
//! - Layered configuration
//! - The tick scheduler and graceful shutdown
//! - Operator subcommands (send, mark-done, status)

pub mod commands;
pub mod config;
pub mod error;
pub mod scheduler;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use scheduler::Scheduler;
