//! Write File Tool
//!
//! Creates or overwrites a file atomically, creating parent directories as
//! needed. Overwriting requires an explicit flag.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::ToolStatus;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::tools::context::PanelToolContext;
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::{display_path, resolve_path};

use super::text_utils::{atomic_write, line_count};
use super::{optional_bool, required_str};

impl PanelToolContext {
    pub async fn write_file(&mut self, path: &str, content: &str, overwrite: bool) -> ToolResult {
        let file_path = resolve_path(self.working_dir(), path);
        let invocation = self.begin(format!("write {}", display_path(path)));

        let exists = file_path.exists();
        if exists && !overwrite {
            return self.fail(
                &invocation,
                format!(
                    "Error: File already exists: {}. Use overwrite=true or edit_file to modify.",
                    path
                ),
            );
        }
        if exists && !file_path.is_file() {
            return self.fail(
                &invocation,
                format!("Error: Not a file: {}", file_path.display()),
            );
        }

        if let Some(refused) = self.approve(&invocation, "write_file", "Write").await {
            return refused;
        }

        if let Err(e) = atomic_write(&file_path, content.as_bytes()) {
            let message = format!("Error writing file: {}", e);
            return self.fail_with(&invocation, e, message);
        }

        let action = if exists { "Overwritten" } else { "Created" };
        let summary = format!("{} ({} lines)", action, line_count(content));
        tracing::debug!("[WriteFile] {} {}", action, file_path.display());
        self.finish(&invocation, ToolStatus::Success, Some(summary.clone()), summary);
        ToolResult::ok(format!("{}: {}", action, path))
    }
}

/// `write_file(path, content, overwrite = false)`
pub struct WriteFileTool;

impl WriteFileTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriteFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file. Creates parent directories as needed. Existing files are only replaced when overwrite is true."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("File path to write")),
        );
        properties.insert(
            "content".to_string(),
            ParameterSchema::string(Some("Content to write")),
        );
        properties.insert(
            "overwrite".to_string(),
            ParameterSchema::boolean(Some("Replace the file if it already exists"))
                .with_default(Value::Bool(false)),
        );
        ParameterSchema::object(
            Some("Write file parameters"),
            properties,
            vec!["path".to_string(), "content".to_string()],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let path = match required_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let content = match required_str(&args, "content") {
            Ok(c) => c,
            Err(e) => return e,
        };
        let overwrite = optional_bool(&args, "overwrite").unwrap_or(false);
        ctx.write_file(path, content, overwrite).await
    }
}
