//! Configuration for budgetd

use std::path::PathBuf;
use std::time::Duration;

use budget_runtime::{EngineConfig, DEFAULT_INCOME_WINDOW};
use budget_types::BucketDefaults;
use serde::{Deserialize, Serialize};

use crate::error::{DaemonError, DaemonResult};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Tick scheduling
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Data directory and file names
    #[serde(default)]
    pub paths: PathsConfig,

    /// Default bucket set and fallback weight
    #[serde(default)]
    pub buckets: BucketDefaults,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Time between ticks in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// Trailing income samples kept for the rate
    #[serde(default = "default_income_window")]
    pub income_window: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            income_window: default_income_window(),
        }
    }
}

/// Where the daemon keeps its files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,

    #[serde(default = "default_inbox_file")]
    pub inbox_file: String,

    #[serde(default = "default_markers_file")]
    pub markers_file: String,

    #[serde(default = "default_status_file")]
    pub status_file: String,

    /// Written by whatever tracks the external wealth counter
    #[serde(default = "default_wealth_file")]
    pub wealth_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: default_ledger_file(),
            inbox_file: default_inbox_file(),
            markers_file: default_markers_file(),
            status_file: default_status_file(),
            wealth_file: default_wealth_file(),
        }
    }
}

impl PathsConfig {
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join(&self.ledger_file)
    }

    pub fn inbox_path(&self) -> PathBuf {
        self.data_dir.join(&self.inbox_file)
    }

    pub fn markers_path(&self) -> PathBuf {
        self.data_dir.join(&self.markers_file)
    }

    pub fn status_path(&self) -> PathBuf {
        self.data_dir.join(&self.status_file)
    }

    pub fn wealth_path(&self) -> PathBuf {
        self.data_dir.join(&self.wealth_file)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_tick_interval() -> u64 {
    2_000
}

fn default_income_window() -> usize {
    DEFAULT_INCOME_WINDOW
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./budget-data")
}

fn default_ledger_file() -> String {
    "ledger.json".to_string()
}

fn default_inbox_file() -> String {
    "inbox.jsonl".to_string()
}

fn default_markers_file() -> String {
    "completed.txt".to_string()
}

fn default_status_file() -> String {
    "status.json".to_string()
}

fn default_wealth_file() -> String {
    "wealth.txt".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `BUDGET_*`
    /// environment variables (`BUDGET_SCHEDULER__TICK_INTERVAL_MS=500`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // Add environment variables with BUDGET_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("BUDGET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> DaemonResult<()> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(DaemonError::Config(
                "scheduler.tick_interval_ms must be greater than zero".into(),
            ));
        }
        if self.scheduler.income_window == 0 {
            return Err(DaemonError::Config(
                "scheduler.income_window must be greater than zero".into(),
            ));
        }

        let fallback = self.buckets.fallback_weight;
        if !(fallback.is_finite() && fallback >= 0.0) {
            return Err(DaemonError::Config(format!(
                "buckets.fallback_weight must be a non-negative number, got {}",
                fallback
            )));
        }
        for (name, weight) in &self.buckets.weights {
            if !(weight.is_finite() && *weight >= 0.0) {
                return Err(DaemonError::Config(format!(
                    "buckets.weights.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.scheduler.tick_interval_ms)
    }

    /// Settings handed to the tick engine
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            tick_interval: self.tick_interval(),
            income_window: self.scheduler.income_window,
            defaults: self.buckets.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use budget_types::BucketName;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.scheduler.tick_interval_ms, 2_000);
        assert_eq!(config.scheduler.income_window, 10);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.buckets.weights.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_paths_join_data_dir() {
        let paths = PathsConfig {
            data_dir: PathBuf::from("/var/lib/budget"),
            ..Default::default()
        };
        assert_eq!(paths.ledger_path(), PathBuf::from("/var/lib/budget/ledger.json"));
        assert_eq!(paths.inbox_path(), PathBuf::from("/var/lib/budget/inbox.jsonl"));
        assert_eq!(paths.markers_path(), PathBuf::from("/var/lib/budget/completed.txt"));
        assert_eq!(paths.status_path(), PathBuf::from("/var/lib/budget/status.json"));
        assert_eq!(paths.wealth_path(), PathBuf::from("/var/lib/budget/wealth.txt"));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let mut config = DaemonConfig::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = DaemonConfig::default();
        config
            .buckets
            .weights
            .insert(BucketName::new("servers"), -1.0);
        assert!(matches!(config.validate(), Err(DaemonError::Config(_))));
    }

    #[test]
    fn test_engine_config_carries_settings() {
        let mut config = DaemonConfig::default();
        config.scheduler.tick_interval_ms = 250;
        config.scheduler.income_window = 4;

        let engine = config.engine_config();
        assert_eq!(engine.tick_interval, Duration::from_millis(250));
        assert_eq!(engine.income_window, 4);
        assert_eq!(engine.defaults.weight_for(&BucketName::new("servers")), 40.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budgetd.toml");
        std::fs::write(
            &path,
            r#"
[scheduler]
tick_interval_ms = 500

[paths]
data_dir = "/srv/budget"

[logging]
json = true
"#,
        )
        .unwrap();

        let config = DaemonConfig::load(path.to_str()).unwrap();
        assert_eq!(config.scheduler.tick_interval_ms, 500);
        assert_eq!(config.scheduler.income_window, 10);
        assert_eq!(config.paths.data_dir, PathBuf::from("/srv/budget"));
        assert_eq!(config.paths.ledger_file, "ledger.json");
        assert!(config.logging.json);
        assert_eq!(config.buckets.weights.len(), 4);
    }
}
