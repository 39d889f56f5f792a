//! UI Channel
//!
//! The tool side talks to the interactive UI through a single unbounded
//! channel of `UiEvent`s. Requests that need an answer carry a oneshot
//! responder: the UI answers with a non-blocking `send`, and only the tool
//! side ever waits. Status events are fire-and-forget.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

/// The human's answer to a tool approval prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalDecision {
    /// Run this invocation only
    Yes,
    /// Run it and stop asking for this tool in this panel
    Always,
    /// Do not run it; optional feedback goes back to the agent
    No { feedback: Option<String> },
    /// The prompt was dismissed
    Cancelled,
}

/// A pending tool approval. Consumed by `respond`, so each request is
/// answered at most once.
#[derive(Debug)]
pub struct ToolApprovalRequest {
    pub request_id: String,
    pub panel_id: String,
    pub tool_name: String,
    /// Display text, e.g. `$ cargo test`
    pub command: String,
    responder: oneshot::Sender<ApprovalDecision>,
}

impl ToolApprovalRequest {
    pub fn respond(self, decision: ApprovalDecision) {
        // The tool side may have been dropped already; nothing to do then.
        let _ = self.responder.send(decision);
    }
}

/// A pending diff review for a file edit.
#[derive(Debug)]
pub struct DiffApprovalRequest {
    pub request_id: String,
    pub panel_id: String,
    pub path: PathBuf,
    /// Unified diff of the proposed change
    pub diff: String,
    responder: oneshot::Sender<bool>,
}

impl DiffApprovalRequest {
    pub fn respond(self, accept: bool) {
        let _ = self.responder.send(accept);
    }
}

/// Events delivered to the UI loop.
#[derive(Debug)]
pub enum UiEvent {
    ToolApprovalRequest(ToolApprovalRequest),
    DiffApprovalRequest(DiffApprovalRequest),
    /// A tool invocation started; `invocation_id` is `cmd-status-N`
    MountStatus {
        invocation_id: String,
        command: String,
        panel_id: String,
    },
    /// A tool invocation finished or changed state
    UpdateStatus {
        invocation_id: String,
        status: String,
        output: Option<String>,
        panel_id: String,
    },
}

/// Sending half of the UI channel, cloned into every interactive panel.
#[derive(Debug, Clone)]
pub struct UiHandle {
    tx: mpsc::UnboundedSender<UiEvent>,
    invocation_counter: Arc<AtomicU64>,
}

/// Create the UI channel. The receiver belongs to the UI loop.
pub fn ui_channel() -> (UiHandle, mpsc::UnboundedReceiver<UiEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        UiHandle {
            tx,
            invocation_counter: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

impl UiHandle {
    /// Whether the UI loop is still receiving.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Ask for a tool approval. Returns `None` if the UI loop is gone.
    pub fn request_tool_approval(
        &self,
        request_id: String,
        panel_id: &str,
        tool_name: &str,
        command: &str,
    ) -> Option<oneshot::Receiver<ApprovalDecision>> {
        let (responder, rx) = oneshot::channel();
        let event = UiEvent::ToolApprovalRequest(ToolApprovalRequest {
            request_id,
            panel_id: panel_id.to_string(),
            tool_name: tool_name.to_string(),
            command: command.to_string(),
            responder,
        });
        self.tx.send(event).ok().map(|_| rx)
    }

    /// Ask for a diff review. Returns `None` if the UI loop is gone.
    pub fn request_diff_approval(
        &self,
        request_id: String,
        panel_id: &str,
        path: PathBuf,
        diff: String,
    ) -> Option<oneshot::Receiver<bool>> {
        let (responder, rx) = oneshot::channel();
        let event = UiEvent::DiffApprovalRequest(DiffApprovalRequest {
            request_id,
            panel_id: panel_id.to_string(),
            path,
            diff,
            responder,
        });
        self.tx.send(event).ok().map(|_| rx)
    }

    /// Announce a new invocation and return its status id.
    pub fn mount_status(&self, command: &str, panel_id: &str) -> String {
        let n = self.invocation_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let invocation_id = format!("cmd-status-{}", n);
        let _ = self.tx.send(UiEvent::MountStatus {
            invocation_id: invocation_id.clone(),
            command: command.to_string(),
            panel_id: panel_id.to_string(),
        });
        invocation_id
    }

    pub fn update_status(
        &self,
        invocation_id: &str,
        status: &str,
        output: Option<String>,
        panel_id: &str,
    ) {
        let _ = self.tx.send(UiEvent::UpdateStatus {
            invocation_id: invocation_id.to_string(),
            status: status.to_string(),
            output,
            panel_id: panel_id.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_approval_round_trip() {
        let (ui, mut rx) = ui_channel();
        let pending = ui
            .request_tool_approval("r1".into(), "p1", "run_command", "$ ls")
            .unwrap();

        match rx.recv().await {
            Some(UiEvent::ToolApprovalRequest(req)) => {
                assert_eq!(req.tool_name, "run_command");
                assert_eq!(req.command, "$ ls");
                req.respond(ApprovalDecision::Always);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(pending.await.unwrap(), ApprovalDecision::Always);
    }

    #[tokio::test]
    async fn test_dropped_request_closes_receiver() {
        let (ui, mut rx) = ui_channel();
        let pending = ui
            .request_diff_approval("r2".into(), "p1", PathBuf::from("a.txt"), String::new())
            .unwrap();
        drop(rx.recv().await);
        assert!(pending.await.is_err());
    }

    #[test]
    fn test_closed_channel_returns_none() {
        let (ui, rx) = ui_channel();
        drop(rx);
        assert!(!ui.is_connected());
        assert!(ui
            .request_tool_approval("r3".into(), "p1", "write_file", "write a.txt")
            .is_none());
    }

    #[test]
    fn test_invocation_ids_increase_across_clones() {
        let (ui, mut rx) = ui_channel();
        let other = ui.clone();
        assert_eq!(ui.mount_status("read a.txt", "p1"), "cmd-status-1");
        assert_eq!(other.mount_status("read b.txt", "p2"), "cmd-status-2");
        assert!(matches!(
            rx.try_recv(),
            Ok(UiEvent::MountStatus { ref invocation_id, .. }) if invocation_id == "cmd-status-1"
        ));
    }
}
