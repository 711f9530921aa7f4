//! Error types for flowlens-core

use thiserror::Error;

/// Main error type for the flowlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Action log for a flow could not be read or parsed
    #[error("action log error for flow {flow_id}: {message}")]
    Log { flow_id: String, message: String },

    /// Recorder lifecycle error
    #[error("recorder error: {0}")]
    Recorder(String),

    /// Flow not found
    #[error("flow not found: {0}")]
    FlowNotFound(String),

    /// Plan not found
    #[error("plan not found: {0}")]
    PlanNotFound(String),

    /// Task not found
    #[error("task not found: {0}")]
    TaskNotFound(String),
}

/// Result type alias for flowlens-core
pub type Result<T> = std::result::Result<T, Error>;
