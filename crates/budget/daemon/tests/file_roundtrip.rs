//! budgetd against a real data directory: producers write, the scheduler
//! ticks, operators read the snapshot.

use std::fs;

use budget_daemon::commands::{self, SendAction, SendArgs};
use budget_daemon::config::PathsConfig;
use budget_daemon::{DaemonConfig, Scheduler};
use budget_types::{BucketName, StatusSnapshot};

fn setup() -> (tempfile::TempDir, DaemonConfig) {
    let dir = tempfile::tempdir().unwrap();
    let config = DaemonConfig {
        paths: PathsConfig {
            data_dir: dir.path().join("budget-data"),
            ..Default::default()
        },
        ..Default::default()
    };
    (dir, config)
}

fn send(config: &DaemonConfig, action: SendAction, args: SendArgs) {
    let message = commands::build_message(action, args).unwrap();
    commands::send(&config.paths, &message).unwrap();
}

fn snapshot(config: &DaemonConfig) -> StatusSnapshot {
    let json = commands::status(&config.paths, true).unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn producers_scheduler_and_status_agree() {
    let (_dir, config) = setup();
    let wealth = config.paths.wealth_path();

    let mut scheduler = Scheduler::from_config(&config).unwrap();
    fs::write(&wealth, "10000").unwrap();
    scheduler.run_once().unwrap();

    // 100 weight units across the default set; 1000 splits exactly
    fs::write(&wealth, "11000").unwrap();
    scheduler.run_once().unwrap();

    let status = snapshot(&config);
    assert_eq!(status.buckets[&BucketName::new("servers")].balance, 400.0);
    assert_eq!(status.buckets[&BucketName::new("augmentations")].balance, 300.0);
    assert_eq!(status.buckets[&BucketName::new("hacknet")].balance, 200.0);
    assert_eq!(status.buckets[&BucketName::new("programs")].balance, 100.0);

    send(
        &config,
        SendAction::Purchased,
        SendArgs {
            bucket: Some("servers".into()),
            amount: Some(150.0),
            ..Default::default()
        },
    );
    commands::mark_done(&config.paths, "programs").unwrap();
    scheduler.run_once().unwrap();

    let status = snapshot(&config);
    let servers = &status.buckets[&BucketName::new("servers")];
    assert_eq!(servers.balance, 250.0);
    assert_eq!(servers.lifetime_spent, 150.0);
    assert!(!status.buckets[&BucketName::new("programs")].active);
    assert_eq!(status.active_count(), 3);
}

#[test]
fn ledger_survives_restart() {
    let (_dir, config) = setup();
    let wealth = config.paths.wealth_path();

    {
        let mut scheduler = Scheduler::from_config(&config).unwrap();
        send(
            &config,
            SendAction::Rush,
            SendArgs {
                bucket: Some("hacknet".into()),
                ..Default::default()
            },
        );
        fs::write(&wealth, "500").unwrap();
        scheduler.run_once().unwrap();
        fs::write(&wealth, "1500").unwrap();
        scheduler.run_once().unwrap();
    }

    let restarted = Scheduler::from_config(&config).unwrap();
    let ledger = &restarted.context().ledger;
    assert_eq!(ledger.rush_bucket(), Some(&BucketName::new("hacknet")));
    assert_eq!(ledger.get(&BucketName::new("hacknet")).unwrap().balance, 1_000.0);
    assert_eq!(restarted.context().tick, 0);
}

#[test]
fn missing_wealth_file_still_applies_messages() {
    let (_dir, config) = setup();
    let mut scheduler = Scheduler::from_config(&config).unwrap();

    send(
        &config,
        SendAction::UpdateWeight,
        SendArgs {
            bucket: Some("servers".into()),
            weight: Some(5.0),
            ..Default::default()
        },
    );
    let report = scheduler.run_once().unwrap();

    assert_eq!(report.inbox.applied, 1);
    assert_eq!(snapshot(&config).buckets[&BucketName::new("servers")].weight, 5.0);
    assert_eq!(snapshot(&config).total_wealth, None);
}

#[test]
fn table_output_lists_every_bucket() {
    let (_dir, config) = setup();
    let mut scheduler = Scheduler::from_config(&config).unwrap();
    fs::write(config.paths.wealth_path(), "42").unwrap();
    scheduler.run_once().unwrap();

    let table = commands::status(&config.paths, false).unwrap();
    for name in ["augmentations", "hacknet", "programs", "servers"] {
        assert!(table.contains(name), "missing {} in\n{}", name, table);
    }
}
