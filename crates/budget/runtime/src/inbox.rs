//! Control Inbox - per-tick drain of control messages
//!
//! Producers write raw payloads at any time. Once per tick the daemon drains
//! everything queued so far, decodes each payload and applies it to the
//! ledger in arrival order. Malformed payloads are dropped one by one; they
//! never stop the drain.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use budget_types::ControlMessage;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{BudgetError, BudgetResult};
use crate::ledger::BucketLedger;

/// Source of raw control payloads
pub trait ControlInbox: Send {
    /// Take every payload queued so far, oldest first. Never blocks.
    fn drain(&mut self) -> BudgetResult<Vec<String>>;
}

/// Result of applying one drain
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InboxSummary {
    pub applied: usize,
    pub dropped: usize,
    /// Sum of `purchased` amounts applied this drain
    pub purchases: f64,
}

/// Apply one decoded message. Returns the amount debited by a purchase.
pub fn apply_message(ledger: &mut BucketLedger, message: &ControlMessage) -> f64 {
    if let Some(bucket) = message.bucket() {
        ledger.ensure(bucket);
    }

    match message {
        ControlMessage::Purchased { bucket, amount } => {
            ledger.record_purchase(bucket, *amount);
            return *amount;
        }
        ControlMessage::Done { bucket } => {
            ledger.complete(bucket);
        }
        ControlMessage::ReportCap { bucket, cap } => ledger.report_cap(bucket, *cap),
        ControlMessage::Rush { bucket } => {
            ledger.start_rush(bucket);
        }
        ControlMessage::CancelRush { .. } => ledger.cancel_rush(),
        ControlMessage::UpdateWeight { bucket, weight } => ledger.set_weight(bucket, *weight),
        ControlMessage::ResetWeights { .. } => ledger.reset_weights(),
    }
    0.0
}

/// Decode and apply a batch of raw payloads in order
pub fn apply_payloads<I, S>(ledger: &mut BucketLedger, payloads: I) -> InboxSummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut summary = InboxSummary::default();

    for raw in payloads {
        let raw = raw.as_ref();
        if raw.trim().is_empty() {
            continue;
        }
        match ControlMessage::decode(raw) {
            Ok(message) => {
                summary.purchases += apply_message(ledger, &message);
                summary.applied += 1;
                debug!(action = message.action(), bucket = ?message.bucket(), "Control message applied");
            }
            Err(e) => {
                summary.dropped += 1;
                warn!(error = %e, payload = raw, "Control message dropped");
            }
        }
    }

    summary
}

// --- In-process channel ---

/// Inbox backed by an unbounded tokio channel
pub struct ChannelInbox {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelInbox {
    /// Create the inbox and the sender producers write to
    pub fn new() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

impl ControlInbox for ChannelInbox {
    fn drain(&mut self) -> BudgetResult<Vec<String>> {
        let mut payloads = Vec::new();
        while let Ok(payload) = self.rx.try_recv() {
            payloads.push(payload);
        }
        Ok(payloads)
    }
}

// --- Spool file ---

/// Inbox backed by a JSON-lines spool file.
///
/// A drain renames the spool aside before reading it, so producers appending
/// during the drain write into a fresh spool that the next tick picks up.
pub struct SpoolFileInbox {
    path: PathBuf,
    draining: PathBuf,
}

impl SpoolFileInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let draining = path.with_extension("draining");
        Self { path, draining }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines are decoded lossily; a line that is not UTF-8 fails to decode
    /// as a message later and is dropped there.
    fn read_lines(path: &Path) -> BudgetResult<Vec<String>> {
        let bytes = fs::read(path)
            .map_err(|e| BudgetError::Inbox(format!("read {}: {}", path.display(), e)))?;
        Ok(bytes
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

impl ControlInbox for SpoolFileInbox {
    fn drain(&mut self) -> BudgetResult<Vec<String>> {
        let mut payloads = Vec::new();

        // Leftover from a drain interrupted before the file was removed
        if self.draining.exists() {
            payloads.extend(Self::read_lines(&self.draining)?);
            fs::remove_file(&self.draining)?;
        }

        if !self.path.exists() {
            return Ok(payloads);
        }

        fs::rename(&self.path, &self.draining)
            .map_err(|e| BudgetError::Inbox(format!("claim {}: {}", self.path.display(), e)))?;
        payloads.extend(Self::read_lines(&self.draining)?);
        fs::remove_file(&self.draining)?;

        Ok(payloads)
    }
}

/// Producer side: append one message to a spool file
pub fn append_to_spool(path: &Path, message: &ControlMessage) -> BudgetResult<()> {
    let line = message
        .encode()
        .map_err(|e| BudgetError::Inbox(e.to_string()))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)?;
    Ok(())
}
