//! Tool Execution Result
//!
//! Every tool in the catalogue is text-in/text-out. `ToolResult` carries the
//! text handed back to the agent plus the invocation status used for the
//! segment log and the status sink.

use serde::{Deserialize, Serialize};

use panel_runtime_core::ToolStatus;

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Final status of the invocation
    pub status: ToolStatus,
    /// Text returned to the agent
    pub content: String,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Success,
            content: content.into(),
        }
    }

    /// Create an error result. The content is returned verbatim, so callers
    /// include any `Error:` prefix themselves.
    pub fn err(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Error,
            content: content.into(),
        }
    }

    /// Create a result for an invocation the reviewer declined
    pub fn rejected(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Rejected,
            content: content.into(),
        }
    }

    /// Create a result for a dismissed approval prompt
    pub fn cancelled(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Cancelled,
            content: content.into(),
        }
    }

    /// Create a result for a command moved to the background
    pub fn backgrounded(content: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Backgrounded,
            content: content.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Success
    }

    /// Convert to string for LLM consumption
    pub fn to_content(&self) -> String {
        self.content.clone()
    }
}

impl From<ToolResult> for String {
    fn from(result: ToolResult) -> String {
        result.content
    }
}
