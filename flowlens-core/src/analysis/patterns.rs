//! Frequent action-sequence mining
//!
//! Extracts contiguous n-grams over each session's logical action sequence
//! and aggregates them across sessions. Output ordering is deterministic:
//! count descending, ties broken by the lexical order of the n-gram.

use super::sessions::Session;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// An aggregated action n-gram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    /// The contiguous action-type sequence
    pub ngram: Vec<String>,
    /// Total occurrences across all sessions
    pub count: usize,
    /// Share of sessions containing this n-gram at least once
    pub support: f64,
}

/// Mine n-grams of the given lengths from every session.
pub fn mine_patterns(sessions: &[Session], lengths: &[usize]) -> Vec<Pattern> {
    let mut counts: BTreeMap<Vec<String>, usize> = BTreeMap::new();
    let mut containing: BTreeMap<Vec<String>, usize> = BTreeMap::new();

    for session in sessions {
        let actions = session.action_sequence();
        let mut seen_here: BTreeSet<Vec<String>> = BTreeSet::new();

        for &n in lengths {
            if n == 0 || actions.len() < n {
                continue;
            }
            for window in actions.windows(n) {
                let ngram: Vec<String> = window.iter().map(|s| s.to_string()).collect();
                *counts.entry(ngram.clone()).or_insert(0) += 1;
                if seen_here.insert(ngram.clone()) {
                    *containing.entry(ngram).or_insert(0) += 1;
                }
            }
        }
    }

    let total_sessions = sessions.len();
    let mut patterns: Vec<Pattern> = counts
        .into_iter()
        .map(|(ngram, count)| {
            let contained = containing.get(&ngram).copied().unwrap_or(0);
            let support = if total_sessions == 0 {
                0.0
            } else {
                contained as f64 / total_sessions as f64
            };
            Pattern {
                ngram,
                count,
                support,
            }
        })
        .collect();

    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ngram.cmp(&b.ngram)));
    patterns
}
