//! Shared test utilities for tool unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use panel_runtime_core::{Checkpoint, CheckpointStore, CoreError, CoreResult};

use crate::services::tools::context::PanelToolContext;
use crate::services::ui::{ui_channel, ApprovalDecision, UiEvent, UiHandle};

/// A headless context rooted at `dir`.
pub(crate) fn headless_ctx(dir: &Path) -> PanelToolContext {
    PanelToolContext::headless(dir)
}

/// Checkpoint store that records descriptions; optionally always fails.
#[derive(Default)]
pub(crate) struct RecordingStore {
    pub created: Mutex<Vec<(String, Option<String>)>>,
    pub fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.created
            .lock()
            .map(|c| c.iter().map(|(d, _)| d.clone()).collect())
            .unwrap_or_default()
    }
}

impl CheckpointStore for RecordingStore {
    fn create(
        &self,
        _paths: &[PathBuf],
        description: &str,
        session_id: Option<&str>,
    ) -> CoreResult<Checkpoint> {
        if self.fail {
            return Err(CoreError::internal("disk full"));
        }
        let mut created = self
            .created
            .lock()
            .map_err(|e| CoreError::internal(e.to_string()))?;
        created.push((description.to_string(), session_id.map(String::from)));
        Ok(Checkpoint {
            id: format!("cp{}", created.len()),
            description: description.to_string(),
            paths: Vec::new(),
            session_id: session_id.map(String::from),
        })
    }
}

/// What the scripted UI saw.
#[derive(Debug, Default)]
pub(crate) struct UiLog {
    pub approvals: Vec<String>,
    pub diffs: Vec<String>,
}

/// A UI task answering tool approvals from `decisions` and diff reviews from
/// `diffs`, in order. Once a script runs out it answers `Yes` / accept.
pub(crate) fn scripted_ui(
    decisions: Vec<ApprovalDecision>,
    diffs: Vec<bool>,
) -> (UiHandle, Arc<Mutex<UiLog>>) {
    let (ui, mut rx) = ui_channel();
    let log = Arc::new(Mutex::new(UiLog::default()));
    let seen = log.clone();
    let mut decisions: VecDeque<_> = decisions.into();
    let mut diffs: VecDeque<_> = diffs.into();

    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                UiEvent::ToolApprovalRequest(request) => {
                    seen.lock().unwrap().approvals.push(request.command.clone());
                    request.respond(decisions.pop_front().unwrap_or(ApprovalDecision::Yes));
                }
                UiEvent::DiffApprovalRequest(request) => {
                    seen.lock().unwrap().diffs.push(request.diff.clone());
                    request.respond(diffs.pop_front().unwrap_or(true));
                }
                _ => {}
            }
        }
    });

    (ui, log)
}

/// An interactive context for panel `p1`, session `s1`.
pub(crate) fn interactive_ctx(
    dir: &Path,
    ui: UiHandle,
    store: Arc<RecordingStore>,
) -> PanelToolContext {
    let store: Arc<dyn CheckpointStore> = store;
    PanelToolContext::interactive("p1", Some("s1".into()), dir, ui, Some(store))
}
