//! Approval Gate
//!
//! Per-panel gate that every mutating or shell tool passes before it acts.
//! A tool is approved silently when it is in the panel's allow-list or when
//! the panel has no UI attached (headless). Otherwise the gate sends a
//! request over the UI channel and waits on a oneshot for the decision.
//!
//! File edits use a separate diff review that ignores the allow-list.

use std::collections::HashSet;
use std::path::Path;

use similar::{ChangeTag, TextDiff};
use uuid::Uuid;

use panel_runtime_core::{CoreError, CoreResult};

use crate::services::ui::{ApprovalDecision, UiHandle};

/// Per-panel approval state.
#[derive(Debug)]
pub struct ApprovalGate {
    panel_id: String,
    /// Tool names approved with `Always`. Only grows.
    allowed: HashSet<String>,
    ui: Option<UiHandle>,
}

impl ApprovalGate {
    pub fn new(panel_id: impl Into<String>, ui: Option<UiHandle>) -> Self {
        Self {
            panel_id: panel_id.into(),
            allowed: HashSet::new(),
            ui,
        }
    }

    /// Whether a human is in the loop for this panel.
    pub fn is_interactive(&self) -> bool {
        self.ui.is_some()
    }

    pub fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed.contains(tool_name)
    }

    /// Allow-listed tool names, sorted.
    pub fn allowed_tools(&self) -> Vec<String> {
        let mut tools: Vec<String> = self.allowed.iter().cloned().collect();
        tools.sort();
        tools
    }

    /// Gate a tool invocation.
    ///
    /// Returns `Err(CoreError::RejectedByUser)` when the human says no and
    /// `Err(CoreError::Cancelled)` when the prompt is dismissed or the UI
    /// went away before answering.
    pub async fn request_approval(&mut self, tool_name: &str, command: &str) -> CoreResult<()> {
        if self.allowed.contains(tool_name) {
            tracing::debug!(
                "[ApprovalGate] {} allow-listed in panel {}",
                tool_name,
                self.panel_id
            );
            return Ok(());
        }

        let Some(ui) = self.ui.as_ref() else {
            return Ok(());
        };

        let request_id = Uuid::new_v4().to_string();
        let Some(pending) =
            ui.request_tool_approval(request_id.clone(), &self.panel_id, tool_name, command)
        else {
            tracing::warn!("[ApprovalGate] UI channel closed, treating {} as cancelled", request_id);
            return Err(CoreError::Cancelled);
        };

        // Dropped responder means the UI discarded the request.
        let decision = pending.await.unwrap_or(ApprovalDecision::Cancelled);
        tracing::debug!(
            "[ApprovalGate] {} for {} in panel {}: {:?}",
            request_id,
            tool_name,
            self.panel_id,
            decision
        );

        match decision {
            ApprovalDecision::Yes => Ok(()),
            ApprovalDecision::Always => {
                self.allowed.insert(tool_name.to_string());
                tracing::info!(
                    "[ApprovalGate] {} permanently allowed in panel {}",
                    tool_name,
                    self.panel_id
                );
                Ok(())
            }
            ApprovalDecision::No { feedback } => Err(CoreError::rejected(feedback)),
            ApprovalDecision::Cancelled => Err(CoreError::Cancelled),
        }
    }

    /// Ask the human to review a file edit. Headless panels accept.
    /// Returns false when the UI rejects or goes away.
    pub async fn request_diff_approval(&self, path: &Path, old: &str, new: &str) -> bool {
        let Some(ui) = self.ui.as_ref() else {
            return true;
        };

        let diff = render_unified_diff(&path.to_string_lossy(), old, new);
        let request_id = Uuid::new_v4().to_string();
        match ui.request_diff_approval(request_id, &self.panel_id, path.to_path_buf(), diff) {
            Some(pending) => pending.await.unwrap_or(false),
            None => false,
        }
    }
}

/// Render a unified diff with three lines of context.
pub fn render_unified_diff(path: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut output = format!("--- a/{}\n+++ b/{}\n", path, path);

    for group in diff.grouped_ops(3) {
        let (old_start, old_count, new_start, new_count) = group.iter().fold(
            (usize::MAX, 0usize, usize::MAX, 0usize),
            |(os, oc, ns, nc), op| {
                let old_range = op.old_range();
                let new_range = op.new_range();
                (
                    os.min(old_range.start),
                    oc + old_range.len(),
                    ns.min(new_range.start),
                    nc + new_range.len(),
                )
            },
        );
        output.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start + 1,
            old_count,
            new_start + 1,
            new_count
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                    ChangeTag::Equal => ' ',
                };
                output.push(prefix);
                output.push_str(change.value());
                if change.missing_newline() {
                    output.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }

    output
}
