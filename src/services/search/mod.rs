//! File Listing and Content Search
//!
//! Two interchangeable backends sit behind `SearchBackend`: `FastBackend`
//! shells out to `fd` and `rg`, `PortableBackend` walks the tree in-process
//! with the `ignore` crate. Both produce the same lines; caps, offsets and
//! timeouts are applied here so they cannot drift apart.

pub mod capability;
pub mod fast;
pub mod portable;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use panel_runtime_core::{CoreError, CoreResult};

use crate::models::settings::SearchBackendKind;

pub use capability::{capabilities, Capabilities};
pub use fast::FastBackend;
pub use portable::PortableBackend;

/// Directory names skipped by every backend.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    ".venv",
    "venv",
    ".idea",
    ".cache",
    "dist",
    "build",
    ".next",
    ".nuxt",
    "coverage",
    ".tox",
    ".eggs",
    ".mypy_cache",
    ".pytest_cache",
];

pub const MAX_LIST_RESULTS: usize = 100;
pub const MAX_SEARCH_RESULTS: usize = 50;
pub const LIST_TIMEOUT: Duration = Duration::from_secs(15);
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Shape of `search_files` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// `path:line:text` per match, `path-line-text` per context line
    #[default]
    Content,
    /// One `path` per matching file
    FilesWithMatches,
    /// `path:count` per matching file
    Count,
}

#[derive(Debug, Clone)]
pub struct ListRequest {
    /// Glob matched against file names
    pub pattern: String,
    /// Absolute directory to list
    pub base: PathBuf,
    /// Results are shown relative to this directory
    pub working_dir: PathBuf,
}

impl ListRequest {
    /// File-name glob: every `**/` is dropped, an empty result means `*`.
    pub fn name_glob(&self) -> String {
        let stripped = self.pattern.replace("**/", "");
        if stripped.is_empty() {
            "*".to_string()
        } else {
            stripped
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Case-insensitive regex
    pub pattern: String,
    /// Absolute file or directory to search
    pub base: PathBuf,
    pub working_dir: PathBuf,
    /// Glob filter on file names, `*` for none
    pub file_pattern: String,
    pub context_before: usize,
    pub context_after: usize,
    pub output_mode: OutputMode,
    pub multiline: bool,
    pub file_type: Option<String>,
}

impl SearchRequest {
    pub fn has_context(&self) -> bool {
        self.output_mode == OutputMode::Content
            && (self.context_before > 0 || self.context_after > 0)
    }
}

/// Resolve the context arguments: explicit before/after win over `context`.
pub fn resolve_context(
    context: usize,
    context_before: Option<usize>,
    context_after: Option<usize>,
) -> (usize, usize) {
    if context_before.is_some() || context_after.is_some() {
        (context_before.unwrap_or(0), context_after.unwrap_or(0))
    } else {
        (context, context)
    }
}

/// A way to list and search files. Implementations return uncapped lines in
/// the shared output format; callers apply caps.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Label used in the display command (`fd`, `rg`, ...)
    fn list_label(&self) -> &'static str;
    fn search_label(&self) -> &'static str;

    /// Whether this is the in-process walker (nothing left to fall back to).
    fn is_portable(&self) -> bool {
        false
    }

    /// Relative (or absolute, outside the working dir) paths of matching files.
    async fn list_files(
        &self,
        request: &ListRequest,
        deadline: Instant,
    ) -> CoreResult<Vec<String>>;

    /// Output lines for `request`.
    async fn search(&self, request: &SearchRequest, deadline: Instant) -> CoreResult<Vec<String>>;
}

/// Operation a backend is picked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOperation {
    List,
    Search,
}

/// Pick the backend for one call. `Auto` consults the capability probe.
pub async fn select_backend(
    kind: SearchBackendKind,
    operation: SearchOperation,
) -> Box<dyn SearchBackend> {
    match kind {
        SearchBackendKind::Portable => Box::new(PortableBackend),
        SearchBackendKind::Fast => {
            let caps = capabilities().await;
            Box::new(FastBackend::new(caps.fd.unwrap_or("fd")))
        }
        SearchBackendKind::Auto => {
            let caps = capabilities().await;
            let available = match operation {
                SearchOperation::List => caps.fd.is_some(),
                SearchOperation::Search => caps.rg,
            };
            tracing::debug!(
                "[Search] {:?} via {} backend",
                operation,
                if available { "fast" } else { "portable" }
            );
            if available {
                Box::new(FastBackend::new(caps.fd.unwrap_or("fd")))
            } else {
                Box::new(PortableBackend)
            }
        }
    }
}

fn can_fall_back(backend: &dyn SearchBackend, error: &CoreError) -> bool {
    !backend.is_portable() && !matches!(error, CoreError::Timeout(_))
}

/// List files with `backend`, degrading to the portable walker when the
/// backend fails. Sorted and capped at `MAX_LIST_RESULTS`.
pub async fn list_files(
    backend: &dyn SearchBackend,
    request: &ListRequest,
) -> CoreResult<Vec<String>> {
    let deadline = Instant::now() + LIST_TIMEOUT;
    let attempt = tokio::time::timeout(LIST_TIMEOUT, async {
        match backend.list_files(request, deadline).await {
            Err(e) if can_fall_back(backend, &e) => {
                tracing::warn!(
                    "[Search] {} failed ({}), using portable listing",
                    backend.list_label(),
                    e
                );
                PortableBackend.list_files(request, deadline).await
            }
            other => other,
        }
    })
    .await;

    let mut files = attempt.map_err(|_| CoreError::Timeout(LIST_TIMEOUT.as_secs()))??;
    files.sort();
    files.dedup();
    files.truncate(MAX_LIST_RESULTS);
    Ok(files)
}

/// Search with `backend`, degrading to the portable walker when the backend
/// fails. Applies `offset`, then `head_limit`, or the default cap with a
/// `... (truncated)` marker.
pub async fn search_files(
    backend: &dyn SearchBackend,
    request: &SearchRequest,
    head_limit: usize,
    offset: usize,
) -> CoreResult<Vec<String>> {
    let deadline = Instant::now() + SEARCH_TIMEOUT;
    let attempt = tokio::time::timeout(SEARCH_TIMEOUT, async {
        match backend.search(request, deadline).await {
            Err(e) if can_fall_back(backend, &e) => {
                tracing::warn!(
                    "[Search] {} failed ({}), using portable search",
                    backend.search_label(),
                    e
                );
                PortableBackend.search(request, deadline).await
            }
            other => other,
        }
    })
    .await;

    let lines = attempt.map_err(|_| CoreError::Timeout(SEARCH_TIMEOUT.as_secs()))??;
    Ok(apply_window(lines, head_limit, offset))
}

/// `offset` first, then `head_limit` (when positive) or the default cap.
pub fn apply_window(lines: Vec<String>, head_limit: usize, offset: usize) -> Vec<String> {
    let mut lines: Vec<String> = lines.into_iter().skip(offset).collect();
    if head_limit > 0 {
        lines.truncate(head_limit);
    } else if lines.len() > MAX_SEARCH_RESULTS {
        lines.truncate(MAX_SEARCH_RESULTS);
        lines.push("... (truncated)".to_string());
    }
    lines
}

/// Path as shown to the agent: relative to the working directory when it is
/// inside it, absolute otherwise. Always `/`-separated.
pub fn display_relative(working_dir: &Path, path: &Path) -> String {
    let shown = path.strip_prefix(working_dir).unwrap_or(path);
    shown.to_string_lossy().replace('\\', "/")
}

/// The argument handed to external tools for `base`: relative when inside
/// the working directory (`.` for the directory itself), absolute otherwise.
pub fn relative_arg(working_dir: &Path, base: &Path) -> String {
    match base.strip_prefix(working_dir) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => base.to_string_lossy().into_owned(),
    }
}
