//! List Files Tool
//!
//! Lists files whose name matches a glob, through the configured search
//! backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::{CoreError, ToolStatus};
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::search::{self, select_backend, ListRequest, SearchOperation, LIST_TIMEOUT};
use crate::services::tools::context::PanelToolContext;
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::resolve_path;

use super::optional_str;

impl PanelToolContext {
    pub async fn list_files(&mut self, pattern: &str, path: &str) -> ToolResult {
        let backend = select_backend(self.settings().search_backend, SearchOperation::List).await;
        let invocation = self.begin(format!("{} {}", backend.list_label(), pattern));

        let request = ListRequest {
            pattern: pattern.to_string(),
            base: resolve_path(self.working_dir(), path),
            working_dir: self.working_dir().to_path_buf(),
        };

        match search::list_files(backend.as_ref(), &request).await {
            Ok(files) => {
                let result = if files.is_empty() {
                    format!("No files matching: {}", pattern)
                } else {
                    files.join("\n")
                };
                self.finish(&invocation, ToolStatus::Success, Some(result.clone()), result.clone());
                ToolResult::ok(result)
            }
            Err(CoreError::Timeout(_)) => {
                let note = format!("Timed out after {}s", LIST_TIMEOUT.as_secs());
                self.finish(&invocation, ToolStatus::Error, Some(note.clone()), note);
                ToolResult::err(format!(
                    "Listing timed out after {}s. Try a more specific pattern.",
                    LIST_TIMEOUT.as_secs()
                ))
            }
            Err(e) => {
                let message = format!("Error listing files: {}", e);
                self.finish(&invocation, ToolStatus::Error, Some(e.to_string()), e.to_string());
                ToolResult::err(message)
            }
        }
    }
}

/// `list_files(pattern = "**/*", path = ".")`
pub struct ListFilesTool;

impl ListFilesTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ListFilesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "list_files"
    }

    fn description(&self) -> &str {
        "List files matching a glob pattern. The pattern is matched against file names; hidden, gitignored and dependency/build directories are skipped. At most 100 results."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "pattern".to_string(),
            ParameterSchema::string(Some("Glob pattern, e.g. \"*.rs\" or \"**/*.py\""))
                .with_default(Value::String("**/*".into())),
        );
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Directory to list"))
                .with_default(Value::String(".".into())),
        );
        ParameterSchema::object(Some("List files parameters"), properties, vec![])
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let pattern = optional_str(&args, "pattern").unwrap_or("**/*");
        let path = optional_str(&args, "path").unwrap_or(".");
        ctx.list_files(pattern, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::{SearchBackendKind, ToolSettings};
    use tempfile::TempDir;

    fn portable_ctx(dir: &std::path::Path) -> PanelToolContext {
        PanelToolContext::headless(dir).with_settings(ToolSettings {
            search_backend: SearchBackendKind::Portable,
            ..ToolSettings::default()
        })
    }

    #[tokio::test]
    async fn test_list_matches_file_names() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("src/b.txt"), "").unwrap();
        std::fs::write(dir.path().join("src/c.rs"), "").unwrap();
        let mut ctx = portable_ctx(dir.path());

        let result = ctx.list_files("**/*.txt", ".").await;
        assert_eq!(result.content, "a.txt\nsrc/b.txt");
        assert!(matches!(
            ctx.get_segments().last(),
            Some(panel_runtime_core::Segment::Tool { command, .. }) if command == "list **/*.txt"
        ));
    }

    #[tokio::test]
    async fn test_list_no_matches() {
        let dir = TempDir::new().unwrap();
        let mut ctx = portable_ctx(dir.path());
        let result = ctx.list_files("*.zig", ".").await;
        assert!(result.is_success());
        assert_eq!(result.content, "No files matching: *.zig");
    }

    #[tokio::test]
    async fn test_list_caps_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..120 {
            std::fs::write(dir.path().join(format!("f{:03}.txt", i)), "").unwrap();
        }
        let mut ctx = portable_ctx(dir.path());
        let result = ListFilesTool::new()
            .execute(&mut ctx, serde_json::json!({"pattern": "*.txt"}))
            .await;
        assert_eq!(result.content.lines().count(), search::MAX_LIST_RESULTS);
        assert!(result.content.starts_with("f000.txt\n"));
    }
}
