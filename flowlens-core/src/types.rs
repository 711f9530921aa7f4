//! Core domain types for flowlens
//!
//! Two families of types live here: the task-tracking entities at the
//! instrumented boundary (Flow, Plan, Task) and the action record model
//! written to the per-flow logs.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Flow** | Top-level unit of work being tracked, analogous to a project |
//! | **Plan** | A grouping of work within a Flow |
//! | **Task** | An individual work item within a Flow, optionally under a Plan |
//! | **ActionRecord** | One timestamped event in a flow's append-only action log |
//! | **CallId** | Correlation id shared by the records of one logical invocation |
//! | **Session** | A derived, time-bounded cluster of records (see [`crate::analysis`]) |
//!
//! Action records are immutable once written. Every instrumented invocation
//! produces exactly one `start` record and exactly one terminal record
//! (`finish` or `error`, never both) sharing the same [`CallId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Correlation ids
// ============================================

/// Correlation identifier tying together the start/finish/error records of
/// one logical invocation.
///
/// Generated once per wrapped call; opaque beyond equality and hashing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    /// Generate a fresh id (UUIDv4).
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CallId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CallId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================
// Action records
// ============================================

/// Lifecycle phase of an instrumented invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPhase {
    /// Emitted before the wrapped operation runs
    Start,
    /// Emitted after the wrapped operation returns successfully
    Finish,
    /// Emitted when the wrapped operation fails
    Error,
}

impl ActionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionPhase::Start => "start",
            ActionPhase::Finish => "finish",
            ActionPhase::Error => "error",
        }
    }

    /// Whether this phase ends the invocation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionPhase::Finish | ActionPhase::Error)
    }
}

impl std::str::FromStr for ActionPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ActionPhase::Start),
            "finish" => Ok(ActionPhase::Finish),
            "error" => Ok(ActionPhase::Error),
            _ => Err(format!("unknown action phase: {}", s)),
        }
    }
}

/// Who produced a record.
///
/// The instrumentation adapter emits `auto` records; an operation that
/// self-reports through its call context emits `manual` records. The
/// distinction lets the adapter suppress its own `finish` when the operation
/// already reported, so one logical action is never counted twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    Auto,
    Manual,
}

impl ActionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionSource::Auto => "auto",
            ActionSource::Manual => "manual",
        }
    }
}

impl std::str::FromStr for ActionSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ActionSource::Auto),
            "manual" => Ok(ActionSource::Manual),
            _ => Err(format!("unknown action source: {}", s)),
        }
    }
}

/// Error details carried by `error`-phase records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Short error kind, typically the error's type name
    pub kind: String,
    /// Display message of the error
    pub message: String,
}

/// One event in a flow's append-only action log.
///
/// Records are written once and never mutated or deleted. `payload` is
/// JSON-safe by construction (see [`crate::recorder::sanitize`]); `error_info`
/// is present only on `error`-phase records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Correlation id shared by this invocation's records
    pub call_id: CallId,
    /// Flow this record is scoped to
    pub flow_id: String,
    /// Task this record is scoped to, if applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Operation name, e.g. "create_task"
    pub action_type: String,
    /// Lifecycle phase of the invocation
    pub phase: ActionPhase,
    /// Wall-clock time of record creation, monotonically non-decreasing
    /// within a process
    pub timestamp: DateTime<Utc>,
    /// Whether the adapter or the operation itself produced this record
    pub source: ActionSource,
    /// Sanitized arguments (start) or result (finish)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// Error details, present only when `phase` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ErrorInfo>,
}

impl ActionRecord {
    /// Build the `start` record of an invocation.
    pub fn start(
        call_id: CallId,
        flow_id: &str,
        task_id: Option<&str>,
        action_type: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            call_id,
            flow_id: flow_id.to_string(),
            task_id: task_id.map(str::to_string),
            action_type: action_type.to_string(),
            phase: ActionPhase::Start,
            timestamp: crate::recorder::monotonic_now(),
            source: ActionSource::Auto,
            payload,
            error_info: None,
        }
    }

    /// Build the `finish` record of a successful invocation.
    pub fn finish(
        call_id: CallId,
        flow_id: &str,
        task_id: Option<&str>,
        action_type: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            phase: ActionPhase::Finish,
            ..Self::start(call_id, flow_id, task_id, action_type, payload)
        }
    }

    /// Build a `finish` record self-reported by the operation itself.
    pub fn manual_finish(
        call_id: CallId,
        flow_id: &str,
        task_id: Option<&str>,
        action_type: &str,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            phase: ActionPhase::Finish,
            source: ActionSource::Manual,
            ..Self::start(call_id, flow_id, task_id, action_type, payload)
        }
    }

    /// Build the `error` record of a failed invocation.
    pub fn error(
        call_id: CallId,
        flow_id: &str,
        task_id: Option<&str>,
        action_type: &str,
        error_info: ErrorInfo,
    ) -> Self {
        Self {
            phase: ActionPhase::Error,
            error_info: Some(error_info),
            ..Self::start(call_id, flow_id, task_id, action_type, serde_json::Value::Null)
        }
    }
}

// ============================================
// Flow / Plan / Task entities
// ============================================

/// Top-level unit of work being tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique identifier
    pub id: String,
    /// Human-friendly name
    pub name: String,
    /// When this flow was created
    pub created_at: DateTime<Utc>,
}

/// A grouping of work within a Flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique identifier
    pub id: String,
    /// Flow this plan belongs to
    pub flow_id: String,
    /// Plan title
    pub title: String,
    /// When this plan was created
    pub created_at: DateTime<Utc>,
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(format!("unknown task status: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An individual work item within a Flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Flow this task belongs to
    pub flow_id: String,
    /// Plan this task belongs to, if any
    pub plan_id: Option<String>,
    /// Task title
    pub title: String,
    /// Current status
    pub status: TaskStatus,
    /// When this task was created
    pub created_at: DateTime<Utc>,
    /// When this task was last modified
    pub updated_at: DateTime<Utc>,
}
