//! Budget allocation domain types
//!
//! Plain data shared by the allocator runtime, the daemon and any producer
//! that talks to the daemon:
//! - **Buckets**: named accumulators of spendable value and their defaults
//! - **Persisted ledger**: the on-disk record of every bucket plus the rush target
//! - **Control messages**: the tagged union accepted by the control inbox
//! - **Status snapshots**: the consolidated record published once per tick
//!
//! Nothing in this crate performs I/O or mutates state beyond its own fields.

pub mod bucket;
pub mod error;
pub mod message;
pub mod persisted;
pub mod snapshot;

pub use bucket::{Bucket, BucketDefaults, BucketName, DEFAULT_FALLBACK_WEIGHT};
pub use error::MessageError;
pub use message::ControlMessage;
pub use persisted::PersistedLedger;
pub use snapshot::{BucketStatus, StatusSnapshot};
