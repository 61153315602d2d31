//! Completion markers - durable "done" signals outside the inbox
//!
//! Consumer daemons append a bucket name when they have nothing left to
//! buy. The list is re-read every tick; completing an already-inactive
//! bucket is a no-op, so re-reading old entries is harmless. The list is
//! only emptied by an anomaly reset.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use budget_types::BucketName;

use crate::error::{BudgetError, BudgetResult};

/// Append-only store of completed bucket names
pub trait CompletionMarkers: Send {
    /// Every marker currently in the store, in append order
    fn read(&self) -> BudgetResult<Vec<BucketName>>;

    /// Empty the store
    fn clear(&mut self) -> BudgetResult<()>;
}

/// One bucket per line. Blank lines and lines that are not UTF-8 are skipped.
fn parse_markers(contents: &[u8]) -> Vec<BucketName> {
    contents
        .split(|b| *b == b'\n')
        .filter_map(|line| std::str::from_utf8(line).ok())
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(BucketName::from)
        .collect()
}

/// Newline-separated marker file
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CompletionMarkers for MarkerFile {
    fn read(&self) -> BudgetResult<Vec<BucketName>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read(&self.path)
            .map_err(|e| BudgetError::Markers(format!("read {}: {}", self.path.display(), e)))?;
        Ok(parse_markers(&contents))
    }

    fn clear(&mut self) -> BudgetResult<()> {
        if self.path.exists() {
            fs::write(&self.path, "")?;
        }
        Ok(())
    }
}

/// Producer side: append one marker
pub fn append_marker(path: &Path, bucket: &BucketName) -> BudgetResult<()> {
    let name = bucket.as_str().trim();
    if name.is_empty() || name.contains('\n') {
        return Err(BudgetError::Markers(format!(
            "invalid bucket name for marker: {:?}",
            bucket.as_str()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", name)?;
    Ok(())
}

/// In-memory marker list
#[derive(Debug, Default)]
pub struct InMemoryMarkers {
    markers: Vec<BucketName>,
}

impl InMemoryMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: impl Into<String>) {
        self.markers.push(BucketName::new(bucket));
    }
}

impl CompletionMarkers for InMemoryMarkers {
    fn read(&self) -> BudgetResult<Vec<BucketName>> {
        Ok(self.markers.clone())
    }

    fn clear(&mut self) -> BudgetResult<()> {
        self.markers.clear();
        Ok(())
    }
}
