//! Search Files Tool
//!
//! Case-insensitive regex search over file contents, through the configured
//! search backend.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::{CoreError, ToolStatus};
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::search::{
    self, resolve_context, select_backend, OutputMode, SearchOperation, SearchRequest,
    SEARCH_TIMEOUT,
};
use crate::services::tools::context::PanelToolContext;
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::resolve_path;

fn default_path() -> String {
    ".".to_string()
}

fn default_file_pattern() -> String {
    "*".to_string()
}

/// Arguments of `search_files`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchParams {
    pub pattern: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Lines before and after each match, unless overridden
    #[serde(default)]
    pub context: usize,
    #[serde(default)]
    pub context_before: Option<usize>,
    #[serde(default)]
    pub context_after: Option<usize>,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub multiline: bool,
    #[serde(default)]
    pub file_type: Option<String>,
    /// 0 means the default cap
    #[serde(default)]
    pub head_limit: usize,
    #[serde(default)]
    pub offset: usize,
}

impl SearchParams {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            path: default_path(),
            file_pattern: default_file_pattern(),
            context: 0,
            context_before: None,
            context_after: None,
            output_mode: OutputMode::default(),
            multiline: false,
            file_type: None,
            head_limit: 0,
            offset: 0,
        }
    }
}

impl PanelToolContext {
    pub async fn search_files(&mut self, params: SearchParams) -> ToolResult {
        let backend =
            select_backend(self.settings().search_backend, SearchOperation::Search).await;
        let invocation = self.begin(format!("{} \"{}\"", backend.search_label(), params.pattern));

        let (context_before, context_after) =
            resolve_context(params.context, params.context_before, params.context_after);
        let request = SearchRequest {
            pattern: params.pattern.clone(),
            base: resolve_path(self.working_dir(), &params.path),
            working_dir: self.working_dir().to_path_buf(),
            file_pattern: params.file_pattern.clone(),
            context_before,
            context_after,
            output_mode: params.output_mode,
            multiline: params.multiline,
            file_type: params.file_type.clone(),
        };

        match search::search_files(backend.as_ref(), &request, params.head_limit, params.offset)
            .await
        {
            Ok(lines) => {
                let result = if lines.is_empty() {
                    format!("No matches for: {}", params.pattern)
                } else {
                    lines.join("\n")
                };
                self.finish(&invocation, ToolStatus::Success, Some(result.clone()), result.clone());
                ToolResult::ok(result)
            }
            Err(CoreError::Timeout(_)) => {
                let note = format!("Timed out after {}s", SEARCH_TIMEOUT.as_secs());
                self.finish(&invocation, ToolStatus::Error, Some(note.clone()), note);
                ToolResult::err(format!(
                    "Search timed out after {}s. Try a more specific path or pattern.",
                    SEARCH_TIMEOUT.as_secs()
                ))
            }
            Err(e) => {
                let message = format!("Error searching: {}", e);
                self.finish(&invocation, ToolStatus::Error, Some(e.to_string()), e.to_string());
                ToolResult::err(message)
            }
        }
    }
}

/// `search_files(pattern, path, file_pattern, context, ...)`
pub struct SearchFilesTool;

impl SearchFilesTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SearchFilesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchFilesTool {
    fn name(&self) -> &str {
        "search_files"
    }

    fn description(&self) -> &str {
        "Search file contents with a case-insensitive regex. Supports context lines, output modes (content, files_with_matches, count), multiline patterns, file type filters and offset/head_limit paging."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "pattern".to_string(),
            ParameterSchema::string(Some("Regex pattern to search for")),
        );
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("File or directory to search"))
                .with_default(Value::String(".".into())),
        );
        properties.insert(
            "file_pattern".to_string(),
            ParameterSchema::string(Some("Glob filter on file names, e.g. \"*.py\""))
                .with_default(Value::String("*".into())),
        );
        properties.insert(
            "context".to_string(),
            ParameterSchema::integer(Some("Lines of context before and after each match")),
        );
        properties.insert(
            "context_before".to_string(),
            ParameterSchema::integer(Some("Lines before each match; overrides context")),
        );
        properties.insert(
            "context_after".to_string(),
            ParameterSchema::integer(Some("Lines after each match; overrides context")),
        );
        properties.insert(
            "output_mode".to_string(),
            ParameterSchema::string_enum(
                Some("Output format"),
                &["content", "files_with_matches", "count"],
            )
            .with_default(Value::String("content".into())),
        );
        properties.insert(
            "multiline".to_string(),
            ParameterSchema::boolean(Some("Let patterns span lines")),
        );
        properties.insert(
            "file_type".to_string(),
            ParameterSchema::string(Some("File type filter, e.g. \"py\", \"js\", \"rust\"")),
        );
        properties.insert(
            "head_limit".to_string(),
            ParameterSchema::integer(Some("Return at most this many lines (0 = default cap of 50)")),
        );
        properties.insert(
            "offset".to_string(),
            ParameterSchema::integer(Some("Skip this many lines before applying head_limit")),
        );
        ParameterSchema::object(
            Some("Search files parameters"),
            properties,
            vec!["pattern".to_string()],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        if args.get("pattern").and_then(|v| v.as_str()).is_none() {
            return ToolResult::err("Missing required parameter: pattern");
        }
        match serde_json::from_value::<SearchParams>(args) {
            Ok(params) => ctx.search_files(params).await,
            Err(e) => ToolResult::err(format!("Invalid arguments: {}", e)),
        }
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

    #[test]
    fn test_params_defaults() {
        let params: SearchParams = serde_json::from_value(serde_json::json!({"pattern": "x"})).unwrap();
        assert_eq!(params.path, ".");
        assert_eq!(params.file_pattern, "*");
        assert_eq!(params.output_mode, OutputMode::Content);
        assert_eq!(params.head_limit, 0);
    }

    #[tokio::test]
    async fn test_search_with_offset_and_head_limit() {
        let dir = TempDir::new().unwrap();
        let content: String = (1..=10).map(|i| format!("match {}\n", i)).collect();
        std::fs::write(dir.path().join("f.txt"), content).unwrap();
        let mut ctx = portable_ctx(dir.path());

        let mut params = SearchParams::new("MATCH");
        params.offset = 2;
        params.head_limit = 3;
        let result = ctx.search_files(params).await;
        assert_eq!(result.content, "f.txt:3:match 3\nf.txt:4:match 4\nf.txt:5:match 5");
    }

    #[tokio::test]
    async fn test_search_no_matches_and_bad_mode() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "abc\n").unwrap();
        let mut ctx = portable_ctx(dir.path());

        let none = ctx.search_files(SearchParams::new("zzz")).await;
        assert_eq!(none.content, "No matches for: zzz");

        let bad = SearchFilesTool::new()
            .execute(
                &mut ctx,
                serde_json::json!({"pattern": "abc", "output_mode": "lines"}),
            )
            .await;
        assert!(bad.content.starts_with("Invalid arguments: "));
    }

    #[tokio::test]
    async fn test_invalid_regex_reports_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("f.txt"), "abc\n").unwrap();
        let mut ctx = portable_ctx(dir.path());
        let result = ctx.search_files(SearchParams::new("(")).await;
        assert!(result.content.starts_with("Error searching: "));
        assert!(!result.is_success());
    }
}
