//! Per-flow action log storage
//!
//! Each flow owns one append-only JSON-lines document at
//! `<root>/<flow_id>.jsonl`, one [`ActionRecord`] per line. The recorder's
//! background worker is the only writer; readers take a line snapshot and
//! must tolerate appends happening between or during reads.
//!
//! # Error Handling
//!
//! Reading is resilient: a malformed line is logged as a warning and
//! skipped, so one bad write (e.g. a partial line from an interrupted
//! process) does not poison the whole log. A non-empty file that yields zero
//! parseable records is surfaced as [`Error::Log`]. A missing file reads as
//! an empty record list, since absence of instrumentation data is a valid
//! state, not a failure.

use crate::error::{Error, Result};
use crate::types::ActionRecord;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only store of per-flow action logs.
#[derive(Debug, Clone)]
pub struct ActionLogStore {
    root: PathBuf,
}

impl ActionLogStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the default XDG data location.
    pub fn open_default() -> Self {
        Self::new(crate::config::Config::flows_dir())
    }

    /// Directory holding the per-flow log files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the log document for a flow.
    pub fn log_path(&self, flow_id: &str) -> PathBuf {
        self.root.join(format!("{}.jsonl", sanitize_flow_id(flow_id)))
    }

    /// Append one record to its flow's log.
    ///
    /// Creates the store directory and log file on first write.
    pub fn append(&self, record: &ActionRecord) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(&record.flow_id))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }

    /// Read a snapshot of a flow's records, in log order.
    ///
    /// Returns an empty list when the flow has no log yet.
    pub fn read_flow(&self, flow_id: &str) -> Result<Vec<ActionRecord>> {
        let path = self.log_path(flow_id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(Error::Log {
                    flow_id: flow_id.to_string(),
                    message: format!("cannot open {}: {}", path.display(), e),
                })
            }
        };

        let reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut lines_seen = 0usize;
        let mut lines_skipped = 0usize;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| Error::Log {
                flow_id: flow_id.to_string(),
                message: format!("read failed at line {}: {}", idx + 1, e),
            })?;
            if line.trim().is_empty() {
                continue;
            }
            lines_seen += 1;
            match serde_json::from_str::<ActionRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    lines_skipped += 1;
                    tracing::warn!(
                        flow_id,
                        line = idx + 1,
                        error = %e,
                        "Skipping malformed action record"
                    );
                }
            }
        }

        if lines_seen > 0 && records.is_empty() {
            return Err(Error::Log {
                flow_id: flow_id.to_string(),
                message: format!(
                    "no parseable records in {} ({} lines skipped)",
                    path.display(),
                    lines_skipped
                ),
            });
        }

        Ok(records)
    }

    /// Discover the flows that have a log in this store.
    pub fn flow_ids(&self) -> Result<Vec<String>> {
        let pattern = self.root.join("*.jsonl");
        let pattern = pattern.to_string_lossy();

        let mut ids = Vec::new();
        let entries = glob::glob(&pattern)
            .map_err(|e| Error::Config(format!("bad log glob pattern {}: {}", pattern, e)))?;
        for entry in entries {
            match entry {
                Ok(path) => {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        ids.push(stem.to_string());
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable log file");
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Map a flow id onto a safe file name.
fn sanitize_flow_id(flow_id: &str) -> String {
    flow_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionRecord, CallId};
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ActionLogStore) {
        let dir = TempDir::new().unwrap();
        let store = ActionLogStore::new(dir.path().join("flows"));
        (dir, store)
    }

    fn record(flow_id: &str, action: &str) -> ActionRecord {
        ActionRecord::start(
            CallId::new(),
            flow_id,
            None,
            action,
            serde_json::json!({"arg": 1}),
        )
    }

    #[test]
    fn test_append_and_read_roundtrip() {
        let (_dir, store) = temp_store();

        store.append(&record("flow-a", "create_task")).unwrap();
        store.append(&record("flow-a", "update_task_status")).unwrap();
        store.append(&record("flow-b", "create_plan")).unwrap();

        let records = store.read_flow("flow-a").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action_type, "create_task");
        assert_eq!(records[1].action_type, "update_task_status");

        let records = store.read_flow("flow-b").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let (_dir, store) = temp_store();
        let records = store.read_flow("never-written").unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let (_dir, store) = temp_store();
        store.append(&record("flow-a", "create_task")).unwrap();

        // simulate a partial write at the end of the log
        let path = store.log_path("flow-a");
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(b"{\"call_id\": \"truncat").unwrap();
        file.write_all(b"\n").unwrap();

        let records = store.read_flow("flow-a").unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_fully_malformed_log_errors() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.root()).unwrap();
        fs::write(store.log_path("flow-a"), "not json\nstill not json\n").unwrap();

        let err = store.read_flow("flow-a").unwrap_err();
        assert!(matches!(err, Error::Log { .. }));
    }

    #[test]
    fn test_flow_discovery() {
        let (_dir, store) = temp_store();
        assert!(store.flow_ids().unwrap().is_empty());

        store.append(&record("beta", "create_task")).unwrap();
        store.append(&record("alpha", "create_task")).unwrap();

        assert_eq!(store.flow_ids().unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_flow_id_sanitization() {
        let (_dir, store) = temp_store();
        let path = store.log_path("../escape/attempt");
        assert!(path.ends_with(".._escape_attempt.jsonl"));
    }
}
