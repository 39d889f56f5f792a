//! Core Error Types
//!
//! Defines the foundational error types used across the panel runtime
//! workspace. These error types are dependency-light (thiserror + serde_json)
//! so that both the tools crate and the main crate can share them.
//!
//! Errors never cross the tool boundary: each tool converts a `CoreError`
//! into a textual `ToolResult` before returning to the orchestration layer.

use thiserror::Error;

/// Core error type for the panel runtime.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A path, process or cell that the caller referred to does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-supplied arguments failed a precondition
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The human reviewer declined the action
    #[error("Rejected by user{}", feedback_suffix(.feedback))]
    RejectedByUser { feedback: Option<String> },

    /// The approval prompt was dismissed or the UI went away
    #[error("Cancelled")]
    Cancelled,

    /// An operation exceeded its deadline
    #[error("Timed out after {0}s")]
    Timeout(u64),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn feedback_suffix(feedback: &Option<String>) -> String {
    feedback
        .as_deref()
        .map(|f| format!(": {}", f))
        .unwrap_or_default()
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a rejection error with optional reviewer feedback
    pub fn rejected(feedback: Option<String>) -> Self {
        Self::RejectedByUser {
            feedback: feedback.filter(|f| !f.trim().is_empty()),
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error ends the invocation without a retry
    /// (the reviewer said no, or the prompt was dismissed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RejectedByUser { .. } | Self::Cancelled)
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
