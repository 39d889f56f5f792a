//! End-to-end Session Tests
//!
//! One interactive panel goes through a typical agent turn: create a file,
//! edit it, run a command, list files. The segment log must record each
//! step in order.

use tempfile::TempDir;

use panel_runtime::{Segment, ToolRegistry, ToolStatus};

use crate::support::interactive_panel;

fn tool_segment(segment: &Segment) -> (&str, &str, ToolStatus) {
    match segment {
        Segment::Tool {
            command,
            output,
            status,
        } => (command.as_str(), output.as_str(), *status),
        Segment::Text { content } => panic!("unexpected text segment: {}", content),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_write_edit_run_list_session() {
    let dir = TempDir::new().unwrap();
    let (mut ctx, checkpoints, observed) = interactive_panel(dir.path(), vec![], vec![]);

    let written = ctx.write_file("a.txt", "hello\n", false).await;
    assert_eq!(written.content, "Created: a.txt");

    let edited = ctx.edit_file("a.txt", "hello", "world", false).await;
    assert_eq!(edited.content, "Edited: a.txt (checkpoint: cp-1)");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "world\n"
    );

    let ran = ctx.run_command("echo hi").await;
    assert_eq!(ran.status, ToolStatus::Success);
    assert_eq!(ran.content, "hi\n");

    let listed = ctx.list_files("*.txt", ".").await;
    assert_eq!(listed.content, "a.txt");

    let segments = ctx.get_segments();
    assert_eq!(segments.len(), 4);
    assert_eq!(
        tool_segment(&segments[0]),
        ("write a.txt", "Created (1 lines)", ToolStatus::Success)
    );
    assert_eq!(
        tool_segment(&segments[1]),
        ("edit a.txt", "edited", ToolStatus::Success)
    );
    assert_eq!(
        tool_segment(&segments[2]),
        ("$ echo hi", "hi\n", ToolStatus::Success)
    );
    let (list_command, list_output, list_status) = tool_segment(&segments[3]);
    assert!(list_command.ends_with(" *.txt"));
    assert_eq!(list_output, "a.txt");
    assert_eq!(list_status, ToolStatus::Success);

    assert_eq!(checkpoints.descriptions(), vec!["Before edit: a.txt"]);
    let snapshots = checkpoints.snapshots.lock().unwrap();
    assert_eq!(snapshots[0].session_id.as_deref(), Some("session-1"));
    drop(snapshots);

    let observed = observed.lock().unwrap();
    assert_eq!(
        observed.approvals,
        vec![
            ("write_file".to_string(), "write a.txt".to_string()),
            ("run_command".to_string(), "$ echo hi".to_string()),
        ]
    );
    assert_eq!(observed.diffs.len(), 1);
    assert!(observed.diffs[0].contains("-hello"));
    assert!(observed.diffs[0].contains("+world"));
    assert_eq!(observed.mounted[0], "write a.txt");
}

#[cfg(unix)]
#[tokio::test]
async fn test_headless_registry_session() {
    let dir = TempDir::new().unwrap();
    let mut ctx = panel_runtime::PanelToolContext::headless(dir.path());
    let registry = ToolRegistry::catalogue();

    let written = registry
        .execute(
            "write_file",
            &mut ctx,
            serde_json::json!({"path": "src/main.py", "content": "print('a')\nprint('b')\n"}),
        )
        .await;
    assert_eq!(written.content, "Created: src/main.py");

    let edited = registry
        .execute(
            "edit_file",
            &mut ctx,
            serde_json::json!({
                "path": "src/main.py",
                "old_string": "print",
                "new_string": "log",
                "replace_all": true
            }),
        )
        .await;
    // Headless panels never checkpoint
    assert_eq!(edited.content, "Edited: src/main.py (2 replacements)");

    let read = registry
        .execute(
            "read_file",
            &mut ctx,
            serde_json::json!({"path": "src/main.py", "offset": 2}),
        )
        .await;
    assert_eq!(read.content, "   2│ log('b')");

    let ran = registry
        .execute("run_command", &mut ctx, serde_json::json!({"command": "cat src/main.py"}))
        .await;
    assert_eq!(ran.content, "log('a')\nlog('b')\n");

    let processes = registry
        .execute("list_processes", &mut ctx, serde_json::json!({}))
        .await;
    assert_eq!(processes.content, "No background processes running");
    assert_eq!(ctx.get_segments().len(), 4);
}
