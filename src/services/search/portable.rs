//! Portable Backend
//!
//! In-process listing and search built on `ignore::WalkBuilder`, so hidden
//! files, `.gitignore` rules and the ignored directory set behave the way
//! `fd` and `rg` treat them. Output lines match the fast backend's format.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use ignore::overrides::OverrideBuilder;
use ignore::types::TypesBuilder;
use ignore::WalkBuilder;
use regex::{Regex, RegexBuilder};

use panel_runtime_core::{CoreError, CoreResult};

use super::{display_relative, ListRequest, OutputMode, SearchBackend, SearchRequest, IGNORED_DIRS};

#[derive(Debug, Clone, Copy, Default)]
pub struct PortableBackend;

fn walker(base: &Path, file_pattern: Option<&str>, file_type: Option<&str>) -> CoreResult<WalkBuilder> {
    let mut overrides = OverrideBuilder::new(base);
    for dir in IGNORED_DIRS {
        overrides
            .add(&format!("!{}", dir))
            .map_err(|e| CoreError::internal(e.to_string()))?;
    }
    if let Some(pattern) = file_pattern.filter(|p| !p.is_empty() && *p != "*") {
        overrides
            .add(pattern)
            .map_err(|e| CoreError::invalid_argument(format!("Invalid file pattern: {}", e)))?;
    }
    let overrides = overrides
        .build()
        .map_err(|e| CoreError::invalid_argument(e.to_string()))?;

    let mut builder = WalkBuilder::new(base);
    builder
        .hidden(true)
        .git_ignore(true)
        .overrides(overrides)
        .sort_by_file_path(|a, b| a.cmp(b));

    if let Some(name) = file_type.filter(|t| !t.is_empty()) {
        let mut types = TypesBuilder::new();
        types.add_defaults();
        types.select(name);
        let types = types
            .build()
            .map_err(|e| CoreError::invalid_argument(e.to_string()))?;
        builder.types(types);
    }

    Ok(builder)
}

fn check_deadline(deadline: Instant, limit_secs: u64) -> CoreResult<()> {
    if Instant::now() >= deadline {
        Err(CoreError::Timeout(limit_secs))
    } else {
        Ok(())
    }
}

fn list_blocking(request: &ListRequest, deadline: Instant) -> CoreResult<Vec<String>> {
    let pattern = glob::Pattern::new(&request.name_glob())
        .map_err(|e| CoreError::invalid_argument(format!("Invalid glob pattern: {}", e)))?;

    let mut files = Vec::new();
    for entry in walker(&request.base, None, None)?.build() {
        check_deadline(deadline, super::LIST_TIMEOUT.as_secs())?;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[PortableSearch] Skipping entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if pattern.matches(&name) {
            files.push(display_relative(&request.working_dir, entry.path()));
        }
    }
    Ok(files)
}

fn build_regex(request: &SearchRequest) -> CoreResult<Regex> {
    RegexBuilder::new(&request.pattern)
        .case_insensitive(true)
        .multi_line(request.multiline)
        .dot_matches_new_line(request.multiline)
        .build()
        .map_err(|e| CoreError::invalid_argument(format!("Invalid regex: {}", e)))
}

/// Indexes of lines touched by a match.
fn matched_lines(regex: &Regex, text: &str, lines: &[&str], multiline: bool) -> Vec<bool> {
    let mut matched = vec![false; lines.len()];
    if !multiline {
        for (i, line) in lines.iter().enumerate() {
            matched[i] = regex.is_match(line);
        }
        return matched;
    }

    let mut starts = Vec::with_capacity(lines.len());
    let mut offset = 0;
    for line in lines {
        starts.push(offset);
        offset += line.len() + 1;
    }
    let line_of = |pos: usize| match starts.binary_search(&pos) {
        Ok(i) => i,
        Err(i) => i.saturating_sub(1),
    };

    for m in regex.find_iter(text) {
        if lines.is_empty() {
            break;
        }
        let first = line_of(m.start()).min(lines.len() - 1);
        let last = line_of(m.end().saturating_sub(1).max(m.start())).min(lines.len() - 1);
        for flag in &mut matched[first..=last] {
            *flag = true;
        }
    }
    matched
}

/// Appends this file's lines to `out`. `emitted_group` tracks whether a
/// context group was already written, for `--` separators.
fn search_file(
    request: &SearchRequest,
    regex: &Regex,
    path: &Path,
    out: &mut Vec<String>,
    emitted_group: &mut bool,
) {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("[PortableSearch] Cannot read {}: {}", path.display(), e);
            return;
        }
    };
    if bytes.contains(&0) {
        return;
    }
    let text = String::from_utf8_lossy(&bytes);
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }

    let matched = matched_lines(regex, &text, &lines, request.multiline);
    let count = matched.iter().filter(|m| **m).count();
    if count == 0 {
        return;
    }

    let display = display_relative(&request.working_dir, path);
    match request.output_mode {
        OutputMode::FilesWithMatches => out.push(display),
        OutputMode::Count => out.push(format!("{}:{}", display, count)),
        OutputMode::Content if !request.has_context() => {
            for (i, line) in lines.iter().enumerate() {
                if matched[i] {
                    out.push(format!("{}:{}:{}", display, i + 1, line));
                }
            }
        }
        OutputMode::Content => {
            let mut included = vec![false; lines.len()];
            for (i, _) in matched.iter().enumerate().filter(|(_, m)| **m) {
                let from = i.saturating_sub(request.context_before);
                let to = (i + request.context_after).min(lines.len() - 1);
                for flag in &mut included[from..=to] {
                    *flag = true;
                }
            }

            let mut previous: Option<usize> = None;
            for (i, line) in lines.iter().enumerate() {
                if !included[i] {
                    continue;
                }
                let contiguous = previous.map(|p| p + 1 == i).unwrap_or(false);
                if *emitted_group && !contiguous {
                    out.push("--".to_string());
                }
                let sep = if matched[i] { ':' } else { '-' };
                out.push(format!("{}{}{}{}{}", display, sep, i + 1, sep, line));
                previous = Some(i);
                *emitted_group = true;
            }
        }
    }
}

fn search_blocking(request: &SearchRequest, deadline: Instant) -> CoreResult<Vec<String>> {
    let regex = build_regex(request)?;
    let walk = walker(
        &request.base,
        Some(&request.file_pattern),
        request.file_type.as_deref(),
    )?;

    let mut out = Vec::new();
    let mut emitted_group = false;
    for entry in walk.build() {
        check_deadline(deadline, super::SEARCH_TIMEOUT.as_secs())?;
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("[PortableSearch] Skipping entry: {}", e);
                continue;
            }
        };
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            search_file(request, &regex, entry.path(), &mut out, &mut emitted_group);
        }
    }
    Ok(out)
}

#[async_trait]
impl SearchBackend for PortableBackend {
    fn list_label(&self) -> &'static str {
        "list"
    }

    fn search_label(&self) -> &'static str {
        "search"
    }

    fn is_portable(&self) -> bool {
        true
    }

    async fn list_files(&self, request: &ListRequest, deadline: Instant) -> CoreResult<Vec<String>> {
        let request = request.clone();
        tokio::task::spawn_blocking(move || list_blocking(&request, deadline))
            .await
            .map_err(|e| CoreError::internal(format!("listing task failed: {}", e)))?
    }

    async fn search(&self, request: &SearchRequest, deadline: Instant) -> CoreResult<Vec<String>> {
        let request = request.clone();
        tokio::task::spawn_blocking(move || search_blocking(&request, deadline))
            .await
            .map_err(|e| CoreError::internal(format!("search task failed: {}", e)))?
    }
}
