//! Panel Tool Context
//!
//! Everything a tool invocation needs for one panel: working directory,
//! approval state, background processes, the segment log and the optional
//! UI and checkpoint collaborators. One context per panel; contexts share
//! no mutable state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use panel_runtime_core::{
    Checkpoint, CheckpointStore, CoreError, CoreResult, Segment, SegmentLog, ToolStatus,
};
use panel_runtime_tools::ToolResult;

use crate::models::settings::ToolSettings;
use crate::services::approval::ApprovalGate;
use crate::services::process::{BackgroundSignal, CompletedProcess, ProcessTable};
use crate::services::ui::UiHandle;

/// Whether a human is in the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelMode {
    /// Approvals go to the UI; edits are diff-reviewed and checkpointed
    Interactive,
    /// Everything is auto-approved; no diff review, no checkpoints
    Headless,
}

/// One in-flight tool invocation: its display command and, when a UI is
/// attached, the status id it was mounted under.
#[derive(Debug, Clone)]
pub(crate) struct Invocation {
    command: String,
    status_id: Option<String>,
}

impl Invocation {
    /// An invocation that has not been announced to the UI.
    pub(crate) fn pending(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            status_id: None,
        }
    }

    pub(crate) fn command(&self) -> &str {
        &self.command
    }
}

pub struct PanelToolContext {
    panel_id: String,
    session_id: Option<String>,
    working_dir: PathBuf,
    mode: PanelMode,
    pub(crate) approvals: ApprovalGate,
    pub(crate) processes: ProcessTable,
    segments: SegmentLog,
    pub(crate) background: BackgroundSignal,
    ui: Option<UiHandle>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    settings: ToolSettings,
}

impl PanelToolContext {
    pub fn new(
        panel_id: impl Into<String>,
        session_id: Option<String>,
        working_dir: impl Into<PathBuf>,
        ui: Option<UiHandle>,
        checkpoints: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        let panel_id = panel_id.into();
        let mode = if ui.is_some() {
            PanelMode::Interactive
        } else {
            PanelMode::Headless
        };
        Self {
            approvals: ApprovalGate::new(panel_id.clone(), ui.clone()),
            panel_id,
            session_id,
            working_dir: working_dir.into(),
            mode,
            processes: ProcessTable::new(),
            segments: SegmentLog::new(),
            background: BackgroundSignal::new(),
            ui,
            checkpoints,
            settings: ToolSettings::default(),
        }
    }

    /// A panel with a human in the loop.
    pub fn interactive(
        panel_id: impl Into<String>,
        session_id: Option<String>,
        working_dir: impl Into<PathBuf>,
        ui: UiHandle,
        checkpoints: Option<Arc<dyn CheckpointStore>>,
    ) -> Self {
        Self::new(panel_id, session_id, working_dir, Some(ui), checkpoints)
    }

    /// A non-interactive panel: auto-approve, no checkpoints.
    pub fn headless(working_dir: impl Into<PathBuf>) -> Self {
        Self::new("headless", None, working_dir, None, None)
    }

    pub fn with_settings(mut self, settings: ToolSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn panel_id(&self) -> &str {
        &self.panel_id
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn mode(&self) -> PanelMode {
        self.mode
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn approvals(&self) -> &ApprovalGate {
        &self.approvals
    }

    /// Clone of the background-request flag, for raising it while a
    /// command holds the context.
    pub fn background_handle(&self) -> BackgroundSignal {
        self.background.clone()
    }

    /// Ask the running foreground command to move to the background.
    pub fn request_background(&self) {
        self.background.raise();
    }

    pub fn get_segments(&self) -> Vec<Segment> {
        self.segments.snapshot()
    }

    pub fn clear_segments(&mut self) {
        self.segments.clear();
    }

    /// Record streamed assistant text, merged into a preceding text segment.
    pub fn add_text_segment(&mut self, text: &str) {
        self.segments.push_text(text);
    }

    /// Background processes of this panel that exited since the last sweep.
    pub fn check_completed_processes(&mut self) -> Vec<CompletedProcess> {
        self.processes.sweep(&self.panel_id)
    }

    /// Stop every background process; called when the panel closes.
    pub async fn shutdown(&mut self) {
        self.processes.stop_all().await;
    }

    /// Announce an invocation to the UI.
    pub(crate) fn begin(&self, command: impl Into<String>) -> Invocation {
        let command = command.into();
        let status_id = self
            .ui
            .as_ref()
            .map(|ui| ui.mount_status(&command, &self.panel_id));
        Invocation { command, status_id }
    }

    fn emit_status(&self, invocation: &Invocation, status: ToolStatus, preview: Option<String>) {
        if let (Some(ui), Some(id)) = (self.ui.as_ref(), invocation.status_id.as_deref()) {
            ui.update_status(id, status.display_status(), preview, &self.panel_id);
        }
    }

    /// Close an invocation: update its status and append its segment.
    pub(crate) fn finish(
        &mut self,
        invocation: &Invocation,
        status: ToolStatus,
        preview: Option<String>,
        tracked: impl Into<String>,
    ) {
        self.emit_status(invocation, status, preview);
        self.segments.push_tool(invocation.command.clone(), tracked, status);
    }

    /// Close an invocation with an error; the message is both tracked and
    /// returned.
    pub(crate) fn fail(&mut self, invocation: &Invocation, message: String) -> ToolResult {
        self.finish(invocation, ToolStatus::Error, None, message.clone());
        ToolResult::err(message)
    }

    /// Close an invocation that failed on an I/O-level error: the raw error
    /// is the status preview, `message` goes to the agent.
    pub(crate) fn fail_with(
        &mut self,
        invocation: &Invocation,
        error: impl std::fmt::Display,
        message: String,
    ) -> ToolResult {
        let detail = error.to_string();
        self.finish(invocation, ToolStatus::Error, Some(detail), message.clone());
        ToolResult::err(message)
    }

    /// Pass the approval gate. `subject` names the action in refusal
    /// messages (`Command rejected by user.`). Returns the finished result
    /// when the invocation must not proceed. Cancellation records no segment.
    pub(crate) async fn approve(
        &mut self,
        invocation: &Invocation,
        tool_name: &str,
        subject: &str,
    ) -> Option<ToolResult> {
        match self.approvals.request_approval(tool_name, invocation.command()).await {
            Ok(()) => None,
            Err(CoreError::Cancelled) => {
                self.emit_status(invocation, ToolStatus::Cancelled, Some("cancelled".into()));
                Some(ToolResult::cancelled(format!("{} cancelled", subject)))
            }
            Err(CoreError::RejectedByUser { feedback }) => {
                let message = match feedback {
                    Some(feedback) => {
                        format!("{} rejected by user. Feedback: {}", subject, feedback)
                    }
                    None => format!("{} rejected by user.", subject),
                };
                self.finish(
                    invocation,
                    ToolStatus::Rejected,
                    Some("rejected".into()),
                    message.clone(),
                );
                Some(ToolResult::rejected(message))
            }
            Err(e) => Some(self.fail(invocation, format!("Error: {}", e))),
        }
    }

    /// Snapshot `path` before a mutation. Headless panels and panels without
    /// a checkpoint store skip this and return `None`.
    pub(crate) fn create_checkpoint(
        &self,
        path: &Path,
        description: String,
    ) -> CoreResult<Option<Checkpoint>> {
        let Some(store) = self.checkpoints.as_ref() else {
            return Ok(None);
        };
        if self.mode == PanelMode::Headless {
            return Ok(None);
        }
        let checkpoint =
            store.create(&[path.to_path_buf()], &description, self.session_id.as_deref())?;
        tracing::debug!(
            "[PanelToolContext] Checkpoint {} for {} in panel {}",
            checkpoint.id,
            path.display(),
            self.panel_id
        );
        Ok(Some(checkpoint))
    }
}

/// ` (checkpoint: <id>)` or nothing.
pub(crate) fn checkpoint_note(checkpoint: &Option<Checkpoint>) -> String {
    checkpoint
        .as_ref()
        .map(|cp| format!(" (checkpoint: {})", cp.id))
        .unwrap_or_default()
}
