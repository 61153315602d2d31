//! Wealth source - the external counter the daemon samples each tick

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BudgetError, BudgetResult};

/// Reader of the external wealth counter
pub trait WealthSource: Send {
    /// Current reading. Must be finite and non-negative.
    fn sample(&mut self) -> BudgetResult<f64>;
}

fn validate(reading: f64) -> BudgetResult<f64> {
    if reading.is_finite() && reading >= 0.0 {
        Ok(reading)
    } else {
        Err(BudgetError::Wealth(format!("invalid reading: {}", reading)))
    }
}

/// A file holding a single number, rewritten by whatever produces the counter
pub struct WealthFile {
    path: PathBuf,
}

impl WealthFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WealthSource for WealthFile {
    fn sample(&mut self) -> BudgetResult<f64> {
        let contents = fs::read_to_string(&self.path)
            .map_err(|e| BudgetError::Wealth(format!("read {}: {}", self.path.display(), e)))?;
        let reading: f64 = contents.trim().parse().map_err(|e| {
            BudgetError::Wealth(format!(
                "unparseable reading {:?}: {}",
                contents.trim(),
                e
            ))
        })?;
        validate(reading)
    }
}

/// Replays a fixed sequence of readings; errors once exhausted
#[derive(Debug, Default)]
pub struct ScriptedWealth {
    readings: VecDeque<f64>,
}

impl ScriptedWealth {
    pub fn new(readings: impl IntoIterator<Item = f64>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn push(&mut self, reading: f64) {
        self.readings.push_back(reading);
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl WealthSource for ScriptedWealth {
    fn sample(&mut self) -> BudgetResult<f64> {
        let reading = self
            .readings
            .pop_front()
            .ok_or_else(|| BudgetError::Wealth("no more scripted readings".into()))?;
        validate(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wealth_file_parses_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wealth.txt");
        fs::write(&path, " 1234567.5\n").unwrap();

        let mut source = WealthFile::new(&path);
        assert_eq!(source.sample().unwrap(), 1_234_567.5);
    }

    #[test]
    fn test_wealth_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wealth.txt");
        let mut source = WealthFile::new(&path);

        assert!(source.sample().is_err());

        fs::write(&path, "lots").unwrap();
        assert!(source.sample().is_err());

        fs::write(&path, "-5").unwrap();
        assert!(source.sample().is_err());
    }

    #[test]
    fn test_scripted_wealth() {
        let mut source = ScriptedWealth::new([10.0, 20.0]);
        assert_eq!(source.sample().unwrap(), 10.0);
        assert_eq!(source.remaining(), 1);
        assert_eq!(source.sample().unwrap(), 20.0);
        assert!(source.sample().is_err());
    }
}
