//! Report assembly
//!
//! The on-demand read path: load a flow's action log, reconstruct sessions,
//! mine patterns, detect inefficiencies, and attach recommendations. Reports
//! are pure derivations of the log plus the analysis thresholds; an empty or
//! missing log yields an empty report rather than an error.

use super::inefficiency::{detect_signals, detour_baselines, InefficiencySignal};
use super::patterns::{mine_patterns, Pattern};
use super::recommend::recommend;
use super::sessions::reconstruct_sessions;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::store::ActionLogStore;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// One reconstructed session, summarized for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Raw records in the session
    pub record_count: usize,
    /// Logical invocations (records collapsed by call id)
    pub action_count: usize,
    pub signals: Vec<InefficiencySignal>,
}

/// Full analysis output for one flow.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flow_id: String,
    pub generated_at: DateTime<Utc>,
    pub sessions: Vec<SessionSummary>,
    /// Top mined patterns, count descending
    pub patterns: Vec<Pattern>,
    pub recommendations: Vec<String>,
}

impl FlowReport {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Analyze one flow's action log.
///
/// Threshold overrides arrive as the `config` argument; callers clone the
/// loaded [`AnalysisConfig`] and adjust what they need. Unreadable logs
/// surface as [`crate::error::Error::Log`].
pub fn generate_report(
    store: &ActionLogStore,
    flow_id: &str,
    config: &AnalysisConfig,
) -> Result<FlowReport> {
    config.validate()?;

    let records = store.read_flow(flow_id)?;
    let gap = Duration::seconds(config.session_gap_secs as i64);
    let sessions = reconstruct_sessions(&records, gap);
    let baselines = detour_baselines(&sessions);

    let mut summaries = Vec::with_capacity(sessions.len());
    let mut all_signals = Vec::new();
    for session in &sessions {
        let (Some(started_at), Some(ended_at)) = (session.started_at(), session.ended_at())
        else {
            continue;
        };
        let signals = detect_signals(session, config, &baselines);
        all_signals.extend(signals.iter().cloned());
        summaries.push(SessionSummary {
            started_at,
            ended_at,
            record_count: session.len(),
            action_count: session.calls().len(),
            signals,
        });
    }

    let mut patterns = mine_patterns(&sessions, &config.ngram_lengths);
    patterns.truncate(config.top_patterns);

    let recommendations = recommend(&all_signals);

    tracing::debug!(
        flow_id,
        sessions = summaries.len(),
        patterns = patterns.len(),
        signals = all_signals.len(),
        "Generated flow report"
    );

    Ok(FlowReport {
        flow_id: flow_id.to_string(),
        generated_at: Utc::now(),
        sessions: summaries,
        patterns,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActionRecord, CallId};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn seeded_store(records: &[ActionRecord]) -> (TempDir, ActionLogStore) {
        let dir = TempDir::new().unwrap();
        let store = ActionLogStore::new(dir.path());
        for record in records {
            store.append(record).unwrap();
        }
        (dir, store)
    }

    fn rec(action: &str, minute: i64) -> ActionRecord {
        let mut record = ActionRecord::start(
            CallId::new(),
            "flow-a",
            None,
            action,
            serde_json::Value::Null,
        );
        record.timestamp =
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap() + Duration::minutes(minute);
        record
    }

    #[test]
    fn test_missing_flow_yields_empty_report() {
        let (_dir, store) = seeded_store(&[]);
        let report = generate_report(&store, "flow-a", &AnalysisConfig::default()).unwrap();
        assert!(report.is_empty());
        assert!(report.patterns.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_report_covers_sessions_patterns_and_signals() {
        let records = vec![
            // session one: rework burst on "edit"
            rec("edit", 0),
            rec("edit", 1),
            rec("edit", 2),
            rec("review", 3),
            // session two, 40 minutes later
            rec("edit", 43),
            rec("review", 44),
        ];
        let (_dir, store) = seeded_store(&records);
        let report = generate_report(&store, "flow-a", &AnalysisConfig::default()).unwrap();

        assert_eq!(report.sessions.len(), 2);
        assert_eq!(report.sessions[0].record_count, 4);
        assert_eq!(report.sessions[1].record_count, 2);
        assert!(report.sessions[0]
            .signals
            .iter()
            .any(|s| s.kind() == "rework"));
        assert!(report.sessions[1].signals.is_empty());

        assert!(report
            .patterns
            .iter()
            .any(|p| p.ngram == vec!["edit", "review"]));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("rework")));
    }

    #[test]
    fn test_report_is_stable_across_runs() {
        let records = vec![rec("a", 0), rec("b", 1), rec("a", 50), rec("b", 51)];
        let (_dir, store) = seeded_store(&records);
        let config = AnalysisConfig::default();

        let first = generate_report(&store, "flow-a", &config).unwrap();
        let second = generate_report(&store, "flow-a", &config).unwrap();

        assert_eq!(first.sessions.len(), second.sessions.len());
        assert_eq!(first.patterns, second.patterns);
        assert_eq!(first.recommendations, second.recommendations);
    }

    #[test]
    fn test_top_patterns_truncated() {
        let records: Vec<ActionRecord> = (0..8)
            .map(|i| rec(&format!("action_{}", i), i))
            .collect();
        let (_dir, store) = seeded_store(&records);

        let mut config = AnalysisConfig::default();
        config.top_patterns = 3;
        let report = generate_report(&store, "flow-a", &config).unwrap();
        assert_eq!(report.patterns.len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (_dir, store) = seeded_store(&[]);
        let mut config = AnalysisConfig::default();
        config.idle_gap_secs = config.session_gap_secs;
        assert!(generate_report(&store, "flow-a", &config).is_err());
    }
}
