//! Approval Protocol Tests
//!
//! Drives interactive panels against a scripted UI loop: permanent
//! approvals, rejection feedback, cancellation and diff review.

use tempfile::TempDir;

use panel_runtime::{ApprovalDecision, Segment, ToolStatus};

use crate::support::interactive_panel;

#[cfg(unix)]
#[tokio::test]
async fn test_always_approves_tool_for_rest_of_panel() {
    let dir = TempDir::new().unwrap();
    let (mut ctx, _checkpoints, observed) =
        interactive_panel(dir.path(), vec![ApprovalDecision::Always], vec![]);

    assert_eq!(ctx.run_command("echo one").await.content, "one\n");
    assert_eq!(ctx.run_command("echo two").await.content, "two\n");
    assert_eq!(ctx.approvals().allowed_tools(), vec!["run_command"]);

    // write_file is a different tool and still asks
    ctx.write_file("x.txt", "x", false).await;
    let observed = observed.lock().unwrap();
    let tools: Vec<&str> = observed.approvals.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(tools, vec!["run_command", "write_file"]);
}

#[tokio::test]
async fn test_rejection_feedback_reaches_agent() {
    let dir = TempDir::new().unwrap();
    let (mut ctx, _checkpoints, _observed) = interactive_panel(
        dir.path(),
        vec![ApprovalDecision::No {
            feedback: Some("use a different name".into()),
        }],
        vec![],
    );

    let result = ctx.write_file("x.txt", "x", false).await;
    assert_eq!(result.status, ToolStatus::Rejected);
    assert_eq!(
        result.content,
        "Write rejected by user. Feedback: use a different name"
    );
    assert!(!dir.path().join("x.txt").exists());
    assert_eq!(
        ctx.get_segments(),
        vec![Segment::Tool {
            command: "write x.txt".into(),
            output: "Write rejected by user. Feedback: use a different name".into(),
            status: ToolStatus::Rejected,
        }]
    );
}

#[tokio::test]
async fn test_cancellation_records_no_segment() {
    let dir = TempDir::new().unwrap();
    let (mut ctx, _checkpoints, _observed) =
        interactive_panel(dir.path(), vec![ApprovalDecision::Cancelled], vec![]);

    let result = ctx.run_command("echo never").await;
    assert_eq!(result.status, ToolStatus::Cancelled);
    assert_eq!(result.content, "Command cancelled");
    assert!(ctx.get_segments().is_empty());
}

#[tokio::test]
async fn test_rejected_diff_keeps_file_and_skips_checkpoint() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.txt"), "keep me\n").unwrap();
    let (mut ctx, checkpoints, observed) = interactive_panel(dir.path(), vec![], vec![false]);

    let result = ctx.edit_file("a.txt", "keep", "drop", false).await;
    assert_eq!(
        result.content,
        "Edit rejected by user. STOP and ask what they want instead."
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "keep me\n"
    );
    assert!(checkpoints.descriptions().is_empty());
    assert_eq!(observed.lock().unwrap().diffs.len(), 1);
}

#[tokio::test]
async fn test_notebook_edit_asks_and_checkpoints() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("nb.ipynb"),
        r#"{"cells": [{"cell_type": "code", "metadata": {}, "source": ["1"], "outputs": [], "execution_count": 1}], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#,
    )
    .unwrap();
    let (mut ctx, checkpoints, observed) = interactive_panel(dir.path(), vec![], vec![]);

    let result = ctx
        .notebook_edit(
            "nb.ipynb",
            1,
            "# Notes",
            panel_runtime::services::tools::NotebookEditMode::Insert,
            Some("markdown"),
        )
        .await;
    assert_eq!(
        result.content,
        "Inserted markdown cell at position 1 (checkpoint: cp-1)"
    );
    assert_eq!(
        checkpoints.descriptions(),
        vec!["Before notebook edit: nb.ipynb"]
    );
    assert_eq!(
        observed.lock().unwrap().approvals,
        vec![(
            "notebook_edit".to_string(),
            "notebook insert nb.ipynb[1]".to_string()
        )]
    );

    let rendered = ctx.read_notebook("nb.ipynb").await;
    assert!(rendered.content.contains("Cell 1 [markdown]"));
    assert!(rendered.content.contains("   1│ # Notes"));
}
