//! Operator subcommands

use std::fmt::Write as _;

use budget_runtime::{append_marker, append_to_spool, read_status_file};
use budget_types::{BucketName, ControlMessage, MessageError, StatusSnapshot};
use clap::ValueEnum;
use tracing::info;

use crate::config::{DaemonConfig, PathsConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler::Scheduler;

/// Control actions accepted by `budgetd send`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SendAction {
    Purchased,
    Done,
    ReportCap,
    Rush,
    CancelRush,
    UpdateWeight,
    ResetWeights,
}

/// Arguments of `budgetd send` before validation
#[derive(Debug, Clone, Default)]
pub struct SendArgs {
    pub bucket: Option<String>,
    pub amount: Option<f64>,
    pub cap: Option<f64>,
    pub weight: Option<f64>,
}

/// Build and validate the control message for an action
pub fn build_message(action: SendAction, args: SendArgs) -> DaemonResult<ControlMessage> {
    let bucket = || {
        args.bucket
            .clone()
            .map(BucketName::new)
            .ok_or(DaemonError::Message(MessageError::EmptyBucket))
    };
    let value = |field: Option<f64>, name: &str| {
        field.ok_or_else(|| {
            DaemonError::Message(MessageError::Malformed(format!(
                "--{} is required for {:?}",
                name, action
            )))
        })
    };

    let message = match action {
        SendAction::Purchased => ControlMessage::Purchased {
            bucket: bucket()?,
            amount: value(args.amount, "amount")?,
        },
        SendAction::Done => ControlMessage::Done { bucket: bucket()? },
        SendAction::ReportCap => ControlMessage::ReportCap {
            bucket: bucket()?,
            cap: value(args.cap, "cap")?,
        },
        SendAction::Rush => ControlMessage::Rush { bucket: bucket()? },
        SendAction::CancelRush => ControlMessage::CancelRush {
            bucket: args.bucket.clone().map(BucketName::new),
        },
        SendAction::UpdateWeight => ControlMessage::UpdateWeight {
            bucket: bucket()?,
            weight: value(args.weight, "weight")?,
        },
        SendAction::ResetWeights => ControlMessage::ResetWeights {
            bucket: args.bucket.clone().map(BucketName::new),
        },
    };

    message.validate()?;
    Ok(message)
}

/// `budgetd run`
pub async fn run(config: &DaemonConfig, once: bool) -> DaemonResult<()> {
    let mut scheduler = Scheduler::from_config(config)?;

    if once {
        let report = scheduler.run_once()?;
        info!(tick = report.tick, outcome = ?report.outcome, "Single tick complete");
        return Ok(());
    }

    scheduler.run().await;
    Ok(())
}

/// `budgetd send`: append a message to the inbox spool
pub fn send(paths: &PathsConfig, message: &ControlMessage) -> DaemonResult<()> {
    std::fs::create_dir_all(&paths.data_dir)?;
    append_to_spool(&paths.inbox_path(), message)?;
    info!(action = message.action(), bucket = ?message.bucket(), "Control message queued");
    Ok(())
}

/// `budgetd mark-done`: append a completion marker
pub fn mark_done(paths: &PathsConfig, bucket: &str) -> DaemonResult<()> {
    std::fs::create_dir_all(&paths.data_dir)?;
    let bucket = BucketName::new(bucket);
    append_marker(&paths.markers_path(), &bucket)?;
    info!(bucket = %bucket, "Completion marker written");
    Ok(())
}

/// `budgetd status`: render the latest snapshot
pub fn status(paths: &PathsConfig, json: bool) -> DaemonResult<String> {
    match read_status_file(&paths.status_path())? {
        Some(snapshot) if json => Ok(serde_json::to_string_pretty(&snapshot)?),
        Some(snapshot) => Ok(render_table(&snapshot)),
        None => Ok(format!(
            "No status published yet at {}",
            paths.status_path().display()
        )),
    }
}

/// Plain-text table of a snapshot
pub fn render_table(snapshot: &StatusSnapshot) -> String {
    let mut out = String::new();
    let wealth = snapshot
        .total_wealth
        .map(|w| format!("{:.0}", w))
        .unwrap_or_else(|| "-".to_string());

    let _ = writeln!(
        out,
        "tick {} at {}",
        snapshot.tick,
        snapshot.timestamp.to_rfc3339()
    );
    let _ = writeln!(
        out,
        "wealth {}  last income {:.0}  rate {:.2}/s  rush {}",
        wealth,
        snapshot.last_income,
        snapshot.income_rate,
        snapshot
            .rush_bucket
            .as_ref()
            .map(|b| b.as_str())
            .unwrap_or("-")
    );
    let _ = writeln!(
        out,
        "{:<16} {:>14} {:>8} {:>8} {:>14} {:>14} {:>7}",
        "BUCKET", "BALANCE", "WEIGHT", "SHARE", "SPENT", "CAP", "ACTIVE"
    );
    for (name, bucket) in &snapshot.buckets {
        let cap = bucket
            .cap
            .map(|c| format!("{:.0}", c))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<16} {:>14.0} {:>8.2} {:>7.1}% {:>14.0} {:>14} {:>7}",
            name.as_str(),
            bucket.balance,
            bucket.weight,
            bucket.effective_weight * 100.0,
            bucket.lifetime_spent,
            cap,
            if bucket.active { "yes" } else { "no" }
        );
    }
    let _ = write!(
        out,
        "total balance {:.0} across {} active buckets",
        snapshot.total_balance(),
        snapshot.active_count()
    );
    out
}
