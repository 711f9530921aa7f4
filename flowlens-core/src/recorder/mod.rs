//! Asynchronous, non-blocking action recording
//!
//! The recorder decouples callers from log I/O. [`AsyncRecorder::record`]
//! enqueues onto a bounded channel and returns immediately; one dedicated
//! worker thread drains the queue and appends to the per-flow store. The
//! worker is the single writer to any log file.
//!
//! ## Guarantees
//!
//! - `record` never blocks and never fails: when the queue is full the
//!   newest record is dropped and a counter incremented; worker-side
//!   serialization or I/O failures are swallowed, counted, and logged.
//! - Records submitted from one thread are appended in submission order.
//!   Across threads only timestamps order the stream.
//! - [`AsyncRecorder::shutdown`] drains the queue before returning. Abrupt
//!   process exit loses at most the records still queued.
//!
//! ## Kill switch
//!
//! Recording is disabled when `FLOWLENS_RECORDING_DISABLED` is set in the
//! environment at startup, or when `recorder.enabled = false` in config.
//! [`AsyncRecorder::set_enabled`] flips recording at runtime without a
//! restart. While disabled, `record` is a no-op behind a single atomic load.

pub mod sanitize;

use crate::config::RecorderConfig;
use crate::error::{Error, Result};
use crate::store::ActionLogStore;
use crate::types::ActionRecord;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

/// Environment variable that disables recording process-wide.
pub const KILL_SWITCH_ENV: &str = "FLOWLENS_RECORDING_DISABLED";

/// Whether the kill-switch environment variable is set.
pub fn recording_disabled_by_env() -> bool {
    std::env::var(KILL_SWITCH_ENV)
        .map(|v| kill_switch_value(&v))
        .unwrap_or(false)
}

fn kill_switch_value(value: &str) -> bool {
    !value.is_empty() && value != "0" && !value.eq_ignore_ascii_case("false")
}

static LAST_TIMESTAMP: Mutex<Option<DateTime<Utc>>> = Mutex::new(None);

/// Current wall-clock time, clamped so it never goes backwards within this
/// process even if the system clock does.
pub fn monotonic_now() -> DateTime<Utc> {
    let now = Utc::now();
    let mut last = LAST_TIMESTAMP.lock().unwrap_or_else(|e| e.into_inner());
    let ts = match *last {
        Some(prev) if prev > now => prev,
        _ => now,
    };
    *last = Some(ts);
    ts
}

/// Destination for action records.
///
/// The instrumentation layer depends on this trait rather than the concrete
/// recorder, so tests and embedders can substitute a synchronous in-memory
/// sink.
pub trait ActionSink: Send + Sync {
    /// Submit a record. Implementations must not block and must not fail.
    fn record(&self, record: ActionRecord);
}

/// Snapshot of recorder counters.
#[derive(Debug, Default, Clone)]
pub struct RecorderStats {
    /// Records accepted onto the queue (or attempted while enabled)
    pub submitted: u64,
    /// Records persisted by the worker
    pub written: u64,
    /// Records dropped because the queue was full
    pub dropped: u64,
    /// Worker-side persist failures
    pub write_failures: u64,
}

#[derive(Default)]
struct StatsCounters {
    submitted: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    write_failures: AtomicU64,
}

enum WorkerMsg {
    Record(ActionRecord),
    Shutdown,
}

/// Bounded-queue recorder with one background worker thread.
///
/// Explicit lifecycle: [`AsyncRecorder::start`] spawns the worker,
/// [`AsyncRecorder::shutdown`] drains and joins it. Dropping the recorder
/// without calling `shutdown` closes the queue; the worker drains whatever
/// is buffered and exits on its own.
pub struct AsyncRecorder {
    tx: SyncSender<WorkerMsg>,
    worker: Mutex<Option<JoinHandle<()>>>,
    enabled: AtomicBool,
    stats: Arc<StatsCounters>,
}

impl AsyncRecorder {
    /// Start the recorder: spawn the worker thread draining into `store`.
    pub fn start(config: &RecorderConfig, store: ActionLogStore) -> Result<Self> {
        let capacity = config.queue_capacity.max(1);
        let (tx, rx) = mpsc::sync_channel::<WorkerMsg>(capacity);

        let stats = Arc::new(StatsCounters::default());
        let worker_stats = Arc::clone(&stats);
        let worker = std::thread::Builder::new()
            .name("flowlens-recorder".to_string())
            .spawn(move || {
                for msg in rx {
                    let record = match msg {
                        WorkerMsg::Record(record) => record,
                        WorkerMsg::Shutdown => break,
                    };
                    match store.append(&record) {
                        Ok(()) => {
                            worker_stats.written.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            worker_stats.write_failures.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(
                                flow_id = %record.flow_id,
                                action_type = %record.action_type,
                                error = %e,
                                "Failed to persist action record"
                            );
                        }
                    }
                }
            })
            .map_err(|e| Error::Recorder(format!("failed to spawn worker thread: {}", e)))?;

        let enabled = config.enabled && !recording_disabled_by_env();
        if !enabled {
            tracing::info!("Action recording disabled");
        }

        Ok(Self {
            tx,
            worker: Mutex::new(Some(worker)),
            enabled: AtomicBool::new(enabled),
            stats,
        })
    }

    /// Whether records are currently accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enable or disable recording at runtime.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Snapshot of the recorder counters.
    pub fn stats(&self) -> RecorderStats {
        RecorderStats {
            submitted: self.stats.submitted.load(Ordering::Relaxed),
            written: self.stats.written.load(Ordering::Relaxed),
            dropped: self.stats.dropped.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
        }
    }

    /// Drain the queue and stop the worker.
    ///
    /// Records submitted after `shutdown` begins are lost; records already
    /// queued are persisted before this returns.
    pub fn shutdown(&self) {
        // The blocking send guarantees the sentinel survives a full queue.
        let _ = self.tx.send(WorkerMsg::Shutdown);
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("Recorder worker panicked during shutdown");
            }
        }
    }
}

impl ActionSink for AsyncRecorder {
    fn record(&self, record: ActionRecord) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        match self.tx.try_send(WorkerMsg::Record(record)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Record queue full, dropping newest record");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Synchronous in-memory sink.
///
/// Stands in for [`AsyncRecorder`] in tests and embedded use: records are
/// visible immediately, no worker thread involved.
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<ActionRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far, in submission order.
    pub fn records(&self) -> Vec<ActionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl ActionSink for MemorySink {
    fn record(&self, record: ActionRecord) {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);
    }
}
