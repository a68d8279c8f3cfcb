//! Sinks for forwarded snapshots.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, info};

/// Default output file for collected snapshots.
pub const DEFAULT_OUTPUT_PATH: &str = "data.jsonl";

/// Errors from writing collected snapshots.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Output file could not be written
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Snapshots could not be serialized
    #[error("serialization error: {message}")]
    Json { message: String },
}

/// Receives every snapshot the polling loop forwards.
pub trait Collector<S> {
    fn collect(&mut self, snapshot: S) -> Result<(), CollectorError>;

    /// Called once after the last iteration of a bounded run.
    fn finish(&mut self) -> Result<(), CollectorError> {
        Ok(())
    }
}

/// Keeps snapshots in memory.
#[derive(Debug)]
pub struct MemoryCollector<S> {
    snapshots: Vec<S>,
}

impl<S> MemoryCollector<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }

    pub fn snapshots(&self) -> &[S] {
        &self.snapshots
    }

    pub fn into_inner(self) -> Vec<S> {
        self.snapshots
    }
}

impl<S> Default for MemoryCollector<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Collector<S> for MemoryCollector<S> {
    fn collect(&mut self, snapshot: S) -> Result<(), CollectorError> {
        self.snapshots.push(snapshot);
        Ok(())
    }
}

/// Appends each snapshot to a file as one JSON line.
///
/// Every snapshot is on disk once `collect` returns, so an unbounded run
/// killed mid-way keeps everything it forwarded. Nothing is buffered in
/// memory.
#[derive(Debug)]
pub struct JsonLinesCollector {
    path: PathBuf,
    written: u64,
}

impl JsonLinesCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: 0,
        }
    }

    /// Snapshots written by this collector.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl<S: Serialize> Collector<S> for JsonLinesCollector {
    fn collect(&mut self, snapshot: S) -> Result<(), CollectorError> {
        let mut line = serde_json::to_vec(&snapshot).map_err(|e| CollectorError::Json {
            message: e.to_string(),
        })?;
        line.push(b'\n');

        // Create parent directories if needed
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| CollectorError::Io {
                message: format!("failed to create output directory: {}", e),
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CollectorError::Io {
                message: format!("failed to open {}: {}", self.path.display(), e),
            })?;
        file.write_all(&line).map_err(|e| CollectorError::Io {
            message: format!("failed to write {}: {}", self.path.display(), e),
        })?;

        self.written += 1;
        debug!(path = %self.path.display(), written = self.written, "snapshot written");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), CollectorError> {
        info!(
            path = %self.path.display(),
            snapshots = self.written,
            "finished collecting snapshots"
        );
        Ok(())
    }
}
