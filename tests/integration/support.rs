//! Shared fixtures for the integration tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use panel_runtime::{
    ui_channel, ApprovalDecision, Checkpoint, CheckpointStore, CoreError, CoreResult,
    PanelToolContext, UiEvent,
};

/// Checkpoint store that keeps every snapshot in memory.
#[derive(Default)]
pub struct MemoryCheckpoints {
    pub snapshots: Mutex<Vec<Checkpoint>>,
}

impl MemoryCheckpoints {
    pub fn descriptions(&self) -> Vec<String> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .map(|cp| cp.description.clone())
            .collect()
    }
}

impl CheckpointStore for MemoryCheckpoints {
    fn create(
        &self,
        paths: &[PathBuf],
        description: &str,
        session_id: Option<&str>,
    ) -> CoreResult<Checkpoint> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|e| CoreError::internal(e.to_string()))?;
        let checkpoint = Checkpoint {
            id: format!("cp-{}", snapshots.len() + 1),
            description: description.to_string(),
            paths: paths.to_vec(),
            session_id: session_id.map(String::from),
        };
        snapshots.push(checkpoint.clone());
        Ok(checkpoint)
    }
}

/// Everything the scripted UI loop observed.
#[derive(Debug, Default)]
pub struct Observed {
    /// `(tool_name, command)` of every approval prompt
    pub approvals: Vec<(String, String)>,
    pub diffs: Vec<String>,
    pub mounted: Vec<String>,
    /// `(invocation_id, status)` of every status update
    pub statuses: Vec<(String, String)>,
}

/// An interactive panel whose UI loop answers approvals from `decisions`
/// and diff reviews from `diffs`, then approves everything.
pub fn interactive_panel(
    dir: &Path,
    decisions: Vec<ApprovalDecision>,
    diffs: Vec<bool>,
) -> (PanelToolContext, Arc<MemoryCheckpoints>, Arc<Mutex<Observed>>) {
    let (ui, mut rx) = ui_channel();
    let observed = Arc::new(Mutex::new(Observed::default()));
    let seen = observed.clone();
    let mut decisions: VecDeque<_> = decisions.into();
    let mut diffs: VecDeque<_> = diffs.into();

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let mut seen = seen.lock().unwrap();
            match event {
                UiEvent::ToolApprovalRequest(request) => {
                    seen.approvals
                        .push((request.tool_name.clone(), request.command.clone()));
                    request.respond(decisions.pop_front().unwrap_or(ApprovalDecision::Yes));
                }
                UiEvent::DiffApprovalRequest(request) => {
                    seen.diffs.push(request.diff.clone());
                    request.respond(diffs.pop_front().unwrap_or(true));
                }
                UiEvent::MountStatus { command, .. } => seen.mounted.push(command),
                UiEvent::UpdateStatus {
                    invocation_id,
                    status,
                    ..
                } => seen.statuses.push((invocation_id, status)),
            }
        }
    });

    let store = Arc::new(MemoryCheckpoints::default());
    let checkpoints: Arc<dyn CheckpointStore> = store.clone();
    let ctx = PanelToolContext::interactive(
        "panel-1",
        Some("session-1".to_string()),
        dir,
        ui,
        Some(checkpoints),
    );
    (ctx, store, observed)
}
