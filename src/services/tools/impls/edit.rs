//! Edit File Tool
//!
//! Exact string replacement. Interactive panels review the change as a
//! unified diff first; approved edits are checkpointed before the write.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::ToolStatus;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::tools::context::{checkpoint_note, PanelToolContext};
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::{display_path, resolve_path};

use super::text_utils::atomic_write;
use super::{optional_bool, required_str};

/// Apply the replacement. Returns the new content and the number of
/// occurrences replaced, or `None` when `old` does not occur.
pub(crate) fn apply_edit(content: &str, old: &str, new: &str, replace_all: bool) -> Option<(String, usize)> {
    if old.is_empty() || !content.contains(old) {
        return None;
    }
    if replace_all {
        Some((content.replace(old, new), content.matches(old).count()))
    } else {
        Some((content.replacen(old, new, 1), 1))
    }
}

impl PanelToolContext {
    pub async fn edit_file(
        &mut self,
        path: &str,
        old_string: &str,
        new_string: &str,
        replace_all: bool,
    ) -> ToolResult {
        let file_path = resolve_path(self.working_dir(), path);
        let invocation = self.begin(format!("edit {}", display_path(path)));

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
        if old_string.is_empty() {
            return self.fail(
                &invocation,
                "Error: old_string must not be empty".to_string(),
            );
        }

        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) => {
                let message = format!("Error editing file: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };

        let Some((updated, count)) = apply_edit(&content, old_string, new_string, replace_all)
        else {
            self.finish(&invocation, ToolStatus::Error, Some("failed".into()), "failed");
            return ToolResult::err("Edit failed - text not found. Re-read the file and try again.");
        };

        if !self.approvals.request_diff_approval(&file_path, &content, &updated).await {
            let message = "Edit rejected by user. STOP and ask what they want instead.";
            self.finish(
                &invocation,
                ToolStatus::Rejected,
                Some("rejected".into()),
                message,
            );
            return ToolResult::rejected(message);
        }

        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let checkpoint = match self.create_checkpoint(&file_path, format!("Before edit: {}", name)) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                let message = format!("Error editing file: checkpoint failed: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };

        if let Err(e) = atomic_write(&file_path, updated.as_bytes()) {
            let message = format!("Error editing file: {}", e);
            return self.fail_with(&invocation, e, message);
        }

        let count_note = if replace_all && count > 1 {
            format!(" ({} replacements)", count)
        } else {
            String::new()
        };
        self.finish(&invocation, ToolStatus::Success, Some("edited".into()), "edited");
        ToolResult::ok(format!(
            "Edited: {}{}{}",
            path,
            count_note,
            checkpoint_note(&checkpoint)
        ))
    }
}

/// `edit_file(path, old_string, new_string, replace_all = false)`
pub struct EditFileTool;

impl EditFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EditFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing old_string with new_string. old_string must match the file content exactly; do not include line numbers from read output. Replaces the first occurrence unless replace_all is true."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("File path to edit")),
        );
        properties.insert(
            "old_string".to_string(),
            ParameterSchema::string(Some("Exact text to find")),
        );
        properties.insert(
            "new_string".to_string(),
            ParameterSchema::string(Some("Replacement text")),
        );
        properties.insert(
            "replace_all".to_string(),
            ParameterSchema::boolean(Some("Replace every occurrence instead of only the first"))
                .with_default(Value::Bool(false)),
        );
        ParameterSchema::object(
            Some("Edit file parameters"),
            properties,
            vec![
                "path".to_string(),
                "old_string".to_string(),
                "new_string".to_string(),
            ],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let path = match required_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let old_string = match required_str(&args, "old_string") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let new_string = match required_str(&args, "new_string") {
            Ok(s) => s,
            Err(e) => return e,
        };
        let replace_all = optional_bool(&args, "replace_all").unwrap_or(false);
        ctx.edit_file(path, old_string, new_string, replace_all).await
    }
}
