//! Status file for external monitoring.
//!
//! Writes a small JSON snapshot of engine state that external tools can
//! poll, without needing to hit the CLI or a running RPC endpoint.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::Result;

const STATUS_VERSION: &str = "1";

#[derive(Debug, Clone, Serialize)]
pub struct StatusFile {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub pid: u32,
    pub venues: Vec<String>,
    pub breaker: StatusBreaker,
    pub runtime: StatusRuntime,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusBreaker {
    pub global_tripped: bool,
    pub scopes_tripped: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusRuntime {
    pub active_opportunities: usize,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub last_scan_found: usize,
}

/// Thread-safe wrapper that manages atomic updates to the status file.
pub struct StatusWriter {
    path: PathBuf,
    status: Mutex<StatusFile>,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: PathBuf, venues: Vec<String>) -> Self {
        let now = Utc::now();
        let status = StatusFile {
            version: STATUS_VERSION.to_string(),
            started_at: now,
            pid: std::process::id(),
            venues,
            breaker: StatusBreaker::default(),
            runtime: StatusRuntime::default(),
            updated_at: now,
        };
        Self { path, status: Mutex::new(status) }
    }

    /// Write the current status to the file atomically (write-to-temp,
    /// then rename).
    pub fn write(&self) -> Result<()> {
        let json = {
            let mut status = self.status.lock();
            status.updated_at = Utc::now();
            serde_json::to_string_pretty(&*status).map_err(crate::error::StoreError::Serialization)?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;
        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }

    pub fn update_breaker(&self, global_tripped: bool, scopes_tripped: usize) {
        let mut status = self.status.lock();
        status.breaker.global_tripped = global_tripped;
        status.breaker.scopes_tripped = scopes_tripped;
    }

    pub fn update_runtime(&self, active_opportunities: usize, last_scan_found: usize) {
        let mut status = self.status.lock();
        status.runtime.active_opportunities = active_opportunities;
        status.runtime.last_scan_at = Some(Utc::now());
        status.runtime.last_scan_found = last_scan_found;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_file_serializes_expected_shape() {
        let status = StatusFile {
            version: "1".to_string(),
            started_at: Utc::now(),
            pid: 12345,
            venues: vec!["polymarket".to_string()],
            breaker: StatusBreaker::default(),
            runtime: StatusRuntime::default(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&status).unwrap();
        assert!(json.contains("\"version\": \"1\""));
        assert!(json.contains("\"pid\": 12345"));
        assert!(json.contains("polymarket"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let writer = StatusWriter::new(path.clone(), vec!["polymarket".to_string()]);
        writer.update_runtime(3, 5);
        writer.update_breaker(false, 0);
        writer.write().unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["runtime"]["active_opportunities"], 3);
        assert_eq!(parsed["runtime"]["last_scan_found"], 5);
    }
}
