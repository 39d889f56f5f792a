//! Read File Tool
//!
//! Reads a text file with 1-based line numbers, windowed by offset/limit.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::ToolStatus;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::tools::context::PanelToolContext;
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::{display_path, resolve_path};

use super::text_utils::{is_probably_binary, tracked_output, truncate_chars};
use super::{optional_usize, required_str};

/// Lines shown when no limit is given.
pub const DEFAULT_READ_LINES: usize = 2000;

/// Longer lines are cut and marked with `...`.
pub const MAX_LINE_CHARS: usize = 2000;

/// A rendered read window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReadWindow {
    pub text: String,
    pub shown: usize,
    pub total: usize,
    /// Lines remain after the window
    pub truncated: bool,
}

/// Render `[offset, offset + limit)` of `content`. `offset` is 1-based; 0
/// or `None` starts at the first line.
pub(crate) fn render_window(content: &str, offset: Option<usize>, limit: Option<usize>) -> ReadWindow {
    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    let start = offset.filter(|o| *o > 0).map(|o| o - 1).unwrap_or(0);
    let limit = limit.filter(|l| *l > 0).unwrap_or(DEFAULT_READ_LINES);
    let end = start.saturating_add(limit);

    let window = &lines[start.min(total)..end.min(total)];
    let mut text = window
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{:>4}│ {}",
                start + i + 1,
                truncate_chars(line, MAX_LINE_CHARS, "...")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let truncated = end < total;
    if truncated {
        text.push_str(&format!(
            "\n\n[Showing lines {}-{} of {}. Use offset/limit to read more.]",
            start + 1,
            start + window.len(),
            total
        ));
    }

    ReadWindow {
        text,
        shown: window.len(),
        total,
        truncated,
    }
}

impl PanelToolContext {
    pub async fn read_file(
        &mut self,
        path: &str,
        offset: Option<usize>,
        limit: Option<usize>,
    ) -> ToolResult {
        let file_path = resolve_path(self.working_dir(), path);
        let invocation = self.begin(format!("read {}", display_path(path)));

        if !file_path.exists() {
            return self.fail(
                &invocation,
                format!("Error: File not found: {}", file_path.display()),
            );
        }
        if !file_path.is_file() {
            return self.fail(
                &invocation,
                format!("Error: Not a file: {}", file_path.display()),
            );
        }

        let bytes = match tokio::fs::read(&file_path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let message = format!("Error reading file: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };
        if is_probably_binary(&bytes) {
            return self.fail(&invocation, "Error: Cannot read binary file".to_string());
        }

        let content = String::from_utf8_lossy(&bytes);
        let window = render_window(&content, offset, limit);
        let preview = if window.truncated {
            format!("{}/{} lines", window.shown, window.total)
        } else {
            format!("{} lines", window.total)
        };
        self.finish(
            &invocation,
            ToolStatus::Success,
            Some(preview),
            tracked_output(&window.text),
        );
        ToolResult::ok(window.text)
    }
}

/// `read_file(path, offset?, limit?)`
pub struct ReadFileTool;

impl ReadFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read file contents with line numbers (e.g. \"   1│ code\"). Default: first 2000 lines. Use offset/limit for specific sections."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("File path, relative to the working directory or absolute")),
        );
        properties.insert(
            "offset".to_string(),
            ParameterSchema::integer(Some("1-based line number to start reading from")),
        );
        properties.insert(
            "limit".to_string(),
            ParameterSchema::integer(Some("Maximum number of lines to read (default 2000)")),
        );
        ParameterSchema::object(
            Some("Read file parameters"),
            properties,
            vec!["path".to_string()],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let path = match required_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        ctx.read_file(
            path,
            optional_usize(&args, "offset"),
            optional_usize(&args, "limit"),
        )
        .await
    }
}
