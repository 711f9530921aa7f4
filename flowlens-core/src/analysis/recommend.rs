//! Rule-based recommendations
//!
//! Maps aggregated inefficiency signals to fixed suggestion strings. No
//! state, no learning: the same signal set always yields the same list.
//! Output is ordered by a severity score, a weighted count of the signals
//! behind each recommendation.

use super::inefficiency::InefficiencySignal;
use std::collections::BTreeMap;

const REWORK_WEIGHT: usize = 3;
const DETOUR_WEIGHT: usize = 2;
const IDLE_WEIGHT: usize = 1;

struct Recommendation {
    severity: usize,
    text: String,
}

/// Produce recommendations from the signals of all of a flow's sessions.
pub fn recommend(signals: &[InefficiencySignal]) -> Vec<String> {
    let mut recommendations = Vec::new();

    // rework: grouped per action type across sessions
    let mut rework: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    let mut idle_count = 0usize;
    let mut idle_longest_secs = 0i64;
    let mut detour_count = 0usize;
    let mut detour_worst: Option<(usize, f64)> = None;

    for signal in signals {
        match signal {
            InefficiencySignal::Rework {
                action_type, count, ..
            } => {
                let entry = rework.entry(action_type.as_str()).or_insert((0, 0));
                entry.0 += 1;
                entry.1 = entry.1.max(*count);
            }
            InefficiencySignal::Idle { duration_secs, .. } => {
                idle_count += 1;
                idle_longest_secs = idle_longest_secs.max(*duration_secs);
            }
            InefficiencySignal::Detour {
                session_len,
                baseline_len,
                ..
            } => {
                detour_count += 1;
                let worse = match detour_worst {
                    Some((_, best)) => *session_len as f64 / baseline_len > best,
                    None => true,
                };
                if worse && *baseline_len > 0.0 {
                    detour_worst = Some((*session_len, *session_len as f64 / baseline_len));
                }
            }
        }
    }

    for (action_type, (occurrences, max_count)) in rework {
        recommendations.push(Recommendation {
            severity: REWORK_WEIGHT * occurrences,
            text: format!(
                "rework: '{}' was repeated up to {} times within a session; \
                 consider consolidating repeated '{}' calls into a single operation",
                action_type, max_count, action_type
            ),
        });
    }

    if idle_count > 0 {
        recommendations.push(Recommendation {
            severity: IDLE_WEIGHT * idle_count,
            text: format!(
                "idle: {} in-session pause(s), the longest around {} minutes; \
                 consider batching related work before stepping away",
                idle_count,
                idle_longest_secs / 60
            ),
        });
    }

    if detour_count > 0 {
        let worst = detour_worst
            .map(|(len, ratio)| format!(" (worst: {} actions, {:.1}x the typical length)", len, ratio))
            .unwrap_or_default();
        recommendations.push(Recommendation {
            severity: DETOUR_WEIGHT * detour_count,
            text: format!(
                "detour: {} session(s) ran well past the typical length for how they \
                 started{}; consider revisiting the plan before long stretches",
                detour_count, worst
            ),
        });
    }

    recommendations.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.text.cmp(&b.text)));
    recommendations.into_iter().map(|r| r.text).collect()
}
