//! Session reconstruction from the action log
//!
//! A session is a run of records where consecutive timestamps stay within
//! the inactivity gap; a larger gap starts a new session. Sessions are
//! derived on demand from the log and never persisted, so they can be
//! recomputed any number of times with identical boundaries.

use crate::types::ActionRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// A time-bounded cluster of action records for one flow.
#[derive(Debug, Clone)]
pub struct Session {
    pub flow_id: String,
    /// Records in timestamp order (ties keep log order)
    pub records: Vec<ActionRecord>,
}

impl Session {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.timestamp)
    }

    pub fn duration(&self) -> Duration {
        match (self.started_at(), self.ended_at()) {
            (Some(start), Some(end)) => end - start,
            _ => Duration::zero(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One record per logical invocation, in order of first appearance.
    ///
    /// A wrapped call leaves a `start` and a terminal record in the log;
    /// collapsing by call id recovers the sequence of logical actions so
    /// mining and rework detection do not count each action twice.
    pub fn calls(&self) -> Vec<&ActionRecord> {
        let mut seen: HashSet<&str> = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.call_id.as_str()))
            .collect()
    }

    /// Action types of the logical invocations, in order.
    pub fn action_sequence(&self) -> Vec<&str> {
        self.calls()
            .into_iter()
            .map(|r| r.action_type.as_str())
            .collect()
    }

    /// Action type of the first logical invocation.
    pub fn starting_action(&self) -> Option<&str> {
        self.records.first().map(|r| r.action_type.as_str())
    }
}

/// Partition records into sessions using the inactivity gap.
///
/// Records are sorted by timestamp first; the sort is stable, so records
/// with equal timestamps keep their log order. Pure function of the input
/// and the gap.
pub fn reconstruct_sessions(records: &[ActionRecord], gap: Duration) -> Vec<Session> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut ordered: Vec<&ActionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let mut sessions = Vec::new();
    let mut current: Vec<ActionRecord> = Vec::new();
    let mut last_ts: Option<DateTime<Utc>> = None;

    for record in ordered {
        if let Some(prev) = last_ts {
            if record.timestamp - prev > gap {
                sessions.push(close_session(std::mem::take(&mut current)));
            }
        }
        last_ts = Some(record.timestamp);
        current.push(record.clone());
    }
    if !current.is_empty() {
        sessions.push(close_session(current));
    }

    sessions
}

fn close_session(records: Vec<ActionRecord>) -> Session {
    let flow_id = records
        .first()
        .map(|r| r.flow_id.clone())
        .unwrap_or_default();
    Session { flow_id, records }
}
