//! Analysis of recorded action streams
//!
//! The read side of flowlens. Everything here is derived on demand from a
//! flow's action log and holds no state of its own:
//!
//! ```text
//! ┌──────────────┐     ┌──────────┐     ┌─────────────────────┐
//! │ActionLogStore│ ──► │ Sessions │ ──► │ Patterns + Signals  │ ──► Recommendations
//! └──────────────┘     └──────────┘     └─────────────────────┘
//! ```
//!
//! [`report::generate_report`] is the entry point; the submodules are usable
//! on their own for finer-grained analysis.

pub mod inefficiency;
pub mod patterns;
pub mod recommend;
pub mod report;
pub mod sessions;

pub use inefficiency::{detect_signals, detour_baselines, InefficiencySignal};
pub use patterns::{mine_patterns, Pattern};
pub use recommend::recommend;
pub use report::{generate_report, FlowReport, SessionSummary};
pub use sessions::{reconstruct_sessions, Session};
