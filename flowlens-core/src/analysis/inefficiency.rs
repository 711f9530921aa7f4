//! Inefficiency detection rules
//!
//! Three independent rules evaluated per session: rework (the same action
//! repeated on the same task), idle (a long in-session pause), and detour
//! (a session running well past peers that start the same way). Thresholds
//! come from [`AnalysisConfig`]; a session can carry any combination of
//! signals.

use super::sessions::Session;
use crate::config::AnalysisConfig;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// A triggered inefficiency rule, with enough detail to explain the trigger.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InefficiencySignal {
    /// The same action repeated within one session
    Rework {
        action_type: String,
        task_id: Option<String>,
        count: usize,
    },
    /// An intra-session pause of at least the idle threshold
    Idle {
        gap_start: DateTime<Utc>,
        gap_end: DateTime<Utc>,
        duration_secs: i64,
    },
    /// A session much longer than peers sharing its starting action
    Detour {
        session_len: usize,
        baseline_len: f64,
        starting_action: String,
    },
}

impl InefficiencySignal {
    pub fn kind(&self) -> &'static str {
        match self {
            InefficiencySignal::Rework { .. } => "rework",
            InefficiencySignal::Idle { .. } => "idle",
            InefficiencySignal::Detour { .. } => "detour",
        }
    }
}

/// Median logical-action count of sessions, grouped by starting action type.
///
/// The detour rule compares a session only against sessions that begin the
/// same way; a planning session and a cleanup session have no common
/// baseline.
pub fn detour_baselines(sessions: &[Session]) -> HashMap<String, f64> {
    let mut lengths: HashMap<String, Vec<usize>> = HashMap::new();
    for session in sessions {
        if let Some(start) = session.starting_action() {
            lengths
                .entry(start.to_string())
                .or_default()
                .push(session.action_sequence().len());
        }
    }

    lengths
        .into_iter()
        .map(|(start, mut lens)| {
            lens.sort_unstable();
            (start, median(&lens))
        })
        .collect()
}

fn median(sorted: &[usize]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

/// Evaluate all rules against one session.
pub fn detect_signals(
    session: &Session,
    config: &AnalysisConfig,
    baselines: &HashMap<String, f64>,
) -> Vec<InefficiencySignal> {
    let mut signals = Vec::new();

    // rework: repeated (action_type, task_id) among logical invocations
    let mut repeats: BTreeMap<(String, Option<String>), usize> = BTreeMap::new();
    for call in session.calls() {
        *repeats
            .entry((call.action_type.clone(), call.task_id.clone()))
            .or_insert(0) += 1;
    }
    for ((action_type, task_id), count) in repeats {
        if count >= config.rework_threshold {
            signals.push(InefficiencySignal::Rework {
                action_type,
                task_id,
                count,
            });
        }
    }

    // idle: long pauses between consecutive records, shorter than the
    // session gap so they never split the session
    let idle_gap = Duration::seconds(config.idle_gap_secs as i64);
    for pair in session.records.windows(2) {
        let gap = pair[1].timestamp - pair[0].timestamp;
        if gap >= idle_gap {
            signals.push(InefficiencySignal::Idle {
                gap_start: pair[0].timestamp,
                gap_end: pair[1].timestamp,
                duration_secs: gap.num_seconds(),
            });
        }
    }

    // detour: length against the median of same-start sessions
    if let Some(start) = session.starting_action() {
        if let Some(&baseline) = baselines.get(start) {
            let len = session.action_sequence().len();
            if baseline > 0.0 && (len as f64) > baseline * config.detour_multiplier {
                signals.push(InefficiencySignal::Detour {
                    session_len: len,
                    baseline_len: baseline,
                    starting_action: start.to_string(),
                });
            }
        }
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::sessions::reconstruct_sessions;
    use crate::types::{ActionRecord, CallId};
    use chrono::TimeZone;

    fn rec(action: &str, task_id: Option<&str>, minute: i64) -> ActionRecord {
        let mut record = ActionRecord::start(
            CallId::new(),
            "flow-a",
            task_id,
            action,
            serde_json::Value::Null,
        );
        record.timestamp =
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap() + Duration::minutes(minute);
        record
    }

    fn session(records: Vec<ActionRecord>) -> Session {
        Session {
            flow_id: "flow-a".to_string(),
            records,
        }
    }

    fn config() -> AnalysisConfig {
        AnalysisConfig::default()
    }

    #[test]
    fn test_rework_at_threshold() {
        // A, A, A, B with threshold 3 flags rework on A with count 3
        let s = session(vec![
            rec("a", None, 0),
            rec("a", None, 1),
            rec("a", None, 2),
            rec("b", None, 3),
        ]);
        let signals = detect_signals(&s, &config(), &HashMap::new());

        assert_eq!(signals.len(), 1);
        match &signals[0] {
            InefficiencySignal::Rework {
                action_type, count, ..
            } => {
                assert_eq!(action_type, "a");
                assert_eq!(*count, 3);
            }
            other => panic!("expected rework, got {:?}", other),
        }
    }

    #[test]
    fn test_rework_distinguishes_tasks() {
        // the same action applied to three different tasks is breadth,
        // not rework
        let s = session(vec![
            rec("update_task_status", Some("t1"), 0),
            rec("update_task_status", Some("t2"), 1),
            rec("update_task_status", Some("t3"), 2),
        ]);
        assert!(detect_signals(&s, &config(), &HashMap::new()).is_empty());

        let s = session(vec![
            rec("update_task_status", Some("t1"), 0),
            rec("update_task_status", Some("t1"), 1),
            rec("update_task_status", Some("t1"), 2),
        ]);
        assert_eq!(detect_signals(&s, &config(), &HashMap::new()).len(), 1);
    }

    #[test]
    fn test_idle_flagged_without_splitting() {
        // 6 minute pause: below the 30 minute session gap, above the
        // 5 minute idle threshold
        let records = vec![rec("a", None, 0), rec("b", None, 6)];
        let sessions = reconstruct_sessions(&records, Duration::minutes(30));
        assert_eq!(sessions.len(), 1);

        let signals = detect_signals(&sessions[0], &config(), &HashMap::new());
        assert_eq!(signals.len(), 1);
        match &signals[0] {
            InefficiencySignal::Idle { duration_secs, .. } => {
                assert_eq!(*duration_secs, 360);
            }
            other => panic!("expected idle, got {:?}", other),
        }
    }

    #[test]
    fn test_short_gaps_not_idle() {
        let s = session(vec![rec("a", None, 0), rec("b", None, 4)]);
        assert!(detect_signals(&s, &config(), &HashMap::new()).is_empty());
    }

    #[test]
    fn test_detour_against_same_start_baseline() {
        let typical_a = |offset: i64| {
            session(vec![
                rec("plan", None, offset),
                rec("work", None, offset + 1),
            ])
        };
        let long_a = session(vec![
            rec("plan", None, 100),
            rec("work", None, 101),
            rec("work2", None, 102),
            rec("work3", None, 103),
            rec("work4", None, 104),
        ]);
        let all = vec![typical_a(0), typical_a(10), long_a.clone()];
        let baselines = detour_baselines(&all);

        // median length for "plan"-starting sessions is 2; 5 > 2 * 1.5
        let signals = detect_signals(&long_a, &config(), &baselines);
        let detours: Vec<_> = signals
            .iter()
            .filter(|s| s.kind() == "detour")
            .collect();
        assert_eq!(detours.len(), 1);
        match detours[0] {
            InefficiencySignal::Detour {
                session_len,
                baseline_len,
                starting_action,
            } => {
                assert_eq!(*session_len, 5);
                assert_eq!(*baseline_len, 2.0);
                assert_eq!(starting_action, "plan");
            }
            other => panic!("expected detour, got {:?}", other),
        }

        // a typical session is not a detour against its own baseline
        let signals = detect_signals(&all[0], &config(), &baselines);
        assert!(signals.iter().all(|s| s.kind() != "detour"));
    }

    #[test]
    fn test_median_of_even_group() {
        assert_eq!(median(&[1, 2, 3, 4]), 2.5);
        assert_eq!(median(&[2]), 2.0);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_signals_can_combine() {
        // rework on A plus an idle pause in the same session
        let s = session(vec![
            rec("a", None, 0),
            rec("a", None, 1),
            rec("a", None, 2),
            rec("b", None, 9),
        ]);
        let signals = detect_signals(&s, &config(), &HashMap::new());
        let kinds: Vec<&str> = signals.iter().map(|s| s.kind()).collect();
        assert!(kinds.contains(&"rework"));
        assert!(kinds.contains(&"idle"));
    }
}
