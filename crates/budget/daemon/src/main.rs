//! budgetd - Budget allocation daemon
//!
//! Watches an external wealth counter and splits every increase across
//! weighted spending buckets. Consumers talk to it through the inbox spool
//! and completion markers; readers poll the status snapshot.

use std::path::PathBuf;

use budget_daemon::commands::{self, SendAction, SendArgs};
use budget_daemon::{DaemonConfig, DaemonResult};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// budgetd CLI
#[derive(Parser)]
#[command(name = "budgetd")]
#[command(about = "Budget allocation daemon - splits income across weighted buckets", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "BUDGET_CONFIG", global = true)]
    config: Option<String>,

    /// Data directory (overrides paths.data_dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log level (overrides logging.level)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the allocation loop
    Run {
        /// Run a single tick and exit
        #[arg(long)]
        once: bool,

        /// Override scheduler.tick_interval_ms
        #[arg(long)]
        tick_interval_ms: Option<u64>,
    },

    /// Queue a control message in the inbox spool
    Send {
        #[arg(value_enum)]
        action: SendAction,

        #[arg(long)]
        bucket: Option<String>,

        #[arg(long, conflicts_with_all = ["cap", "weight"])]
        amount: Option<f64>,

        #[arg(long, conflicts_with = "weight")]
        cap: Option<f64>,

        #[arg(long)]
        weight: Option<f64>,
    },

    /// Mark a bucket as having nothing left to buy
    MarkDone { bucket: String },

    /// Print the latest status snapshot
    Status {
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(data_dir) = cli.data_dir {
        config.paths.data_dir = data_dir;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.log_json {
        config.logging.json = true;
    }
    let command = cli.command.unwrap_or(Command::Run {
        once: false,
        tick_interval_ms: None,
    });
    if let Command::Run {
        tick_interval_ms: Some(ms),
        ..
    } = &command
    {
        config.scheduler.tick_interval_ms = *ms;
    }
    config.validate()?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match command {
        Command::Run { once, .. } => commands::run(&config, once).await,
        Command::Send {
            action,
            bucket,
            amount,
            cap,
            weight,
        } => {
            let message = commands::build_message(
                action,
                SendArgs {
                    bucket,
                    amount,
                    cap,
                    weight,
                },
            )?;
            commands::send(&config.paths, &message)
        }
        Command::MarkDone { bucket } => commands::mark_done(&config.paths, &bucket),
        Command::Status { json } => {
            println!("{}", commands::status(&config.paths, json)?);
            Ok(())
        }
    }
}
