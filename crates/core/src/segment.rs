//! Segment Log
//!
//! Ordered record of what happened in a panel: streamed assistant text and
//! completed tool invocations. The session-persistence collaborator snapshots
//! it with `snapshot()` and clears it once a turn has been saved.

use serde::{Deserialize, Serialize};

/// Final status of a tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Success,
    Error,
    Rejected,
    Cancelled,
    Backgrounded,
}

impl ToolStatus {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Backgrounded => "backgrounded",
        }
    }

    /// Status reported to the status sink. Rejections surface as errors there.
    pub fn display_status(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Backgrounded => "backgrounded",
            Self::Error | Self::Rejected | Self::Cancelled => "error",
        }
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the segment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Segment {
    Text {
        content: String,
    },
    Tool {
        command: String,
        output: String,
        status: ToolStatus,
    },
}

/// Append-only log of segments for a single panel.
#[derive(Debug, Clone, Default)]
pub struct SegmentLog {
    segments: Vec<Segment>,
}

impl SegmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append assistant text, merging into the previous segment when it is
    /// also text so a streamed reply stays a single segment.
    pub fn push_text(&mut self, text: &str) {
        if let Some(Segment::Text { content }) = self.segments.last_mut() {
            content.push_str(text);
            return;
        }
        self.segments.push(Segment::Text {
            content: text.to_string(),
        });
    }

    /// Record a completed tool invocation.
    pub fn push_tool(
        &mut self,
        command: impl Into<String>,
        output: impl Into<String>,
        status: ToolStatus,
    ) {
        self.segments.push(Segment::Tool {
            command: command.into(),
            output: output.into(),
            status,
        });
    }

    /// Copy of the current log.
    pub fn snapshot(&self) -> Vec<Segment> {
        self.segments.clone()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_segments_coalesce() {
        let mut log = SegmentLog::new();
        log.push_text("Hello");
        log.push_text(", world");
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.snapshot()[0],
            Segment::Text {
                content: "Hello, world".into()
            }
        );
    }

    #[test]
    fn test_tool_segment_breaks_text_run() {
        let mut log = SegmentLog::new();
        log.push_text("Running tests.");
        log.push_tool("$ cargo test", "ok", ToolStatus::Success);
        log.push_text("Done.");
        assert_eq!(log.len(), 3);
        assert!(matches!(log.last(), Some(Segment::Text { content }) if content == "Done."));
    }

    #[test]
    fn test_segment_serializes_with_type_tag() {
        let seg = Segment::Tool {
            command: "$ ls".into(),
            output: "a.txt".into(),
            status: ToolStatus::Backgrounded,
        };
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["type"], "tool");
        assert_eq!(json["status"], "backgrounded");

        let text = serde_json::to_value(Segment::Text {
            content: "hi".into(),
        })
        .unwrap();
        assert_eq!(text, serde_json::json!({"type": "text", "content": "hi"}));
    }

    #[test]
    fn test_clear_empties_log() {
        let mut log = SegmentLog::new();
        log.push_tool("read a.txt", "1 lines", ToolStatus::Success);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_display_status_folds_rejections() {
        assert_eq!(ToolStatus::Rejected.display_status(), "error");
        assert_eq!(ToolStatus::Backgrounded.display_status(), "backgrounded");
        assert_eq!(ToolStatus::Success.to_string(), "success");
    }
}
