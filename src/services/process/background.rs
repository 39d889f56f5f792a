//! Background Process Registry
//!
//! Per-panel table of commands that were moved off the foreground. Each entry
//! owns its child, the line pump and a bounded output ring. Output is pulled
//! from the pump lazily, whenever the entry is queried or swept.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::process::Child;

use panel_runtime_core::{CoreError, CoreResult};

use super::output::{OutputBuffer, OutputPump};
use super::signal;

/// How long `stop` waits after SIGTERM before killing.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Default number of lines returned by `get_output`.
pub const DEFAULT_OUTPUT_LINES: usize = 50;

/// A background process that exited since the previous sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedProcess {
    pub panel_id: String,
    pub process_id: String,
    pub exit_code: i32,
    pub command: String,
}

#[derive(Debug)]
pub struct BackgroundProcess {
    id: String,
    command: String,
    child: Child,
    pump: OutputPump,
    buffer: OutputBuffer,
    started_at: Instant,
    exit_code: Option<i32>,
    notified: bool,
}

impl BackgroundProcess {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Non-blocking exit check. The code is cached once observed.
    pub fn poll_exit(&mut self) -> Option<i32> {
        if self.exit_code.is_none() {
            match self.child.try_wait() {
                Ok(Some(status)) => self.exit_code = Some(signal::exit_code(status)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("[BackgroundProcess] {} try_wait failed: {}", self.id, e);
                }
            }
        }
        self.exit_code
    }

    pub fn is_running(&mut self) -> bool {
        self.poll_exit().is_none()
    }

    /// Pull whatever the readers have produced into the ring.
    pub fn read_output(&mut self) {
        let buffer = &mut self.buffer;
        self.pump.drain(|line| buffer.push(line));
    }

    /// The last `lines` lines, or `(no output yet)`.
    pub fn recent_output(&mut self, lines: usize) -> String {
        self.read_output();
        let text = self.buffer.recent(lines);
        if text.is_empty() {
            "(no output yet)".to_string()
        } else {
            text
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn status_label(&mut self) -> &'static str {
        if self.is_running() {
            "running"
        } else {
            "stopped"
        }
    }
}

/// Background processes of one panel, keyed by the numeric part of `bg_N`.
#[derive(Debug)]
pub struct ProcessTable {
    entries: BTreeMap<u64, BackgroundProcess>,
    next_id: u64,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }
}

/// Only the canonical `bg_N` spelling addresses a process; `bg_01` or
/// `bg_+1` do not alias `bg_1`.
fn parse_id(id: &str) -> Option<u64> {
    let n: u64 = id.strip_prefix("bg_")?.parse().ok()?;
    (format!("bg_{}", n) == id).then_some(n)
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adopt a running child. Ids are never reused within a table.
    pub fn register(
        &mut self,
        command: impl Into<String>,
        child: Child,
        pump: OutputPump,
        buffer: OutputBuffer,
    ) -> String {
        let n = self.next_id;
        self.next_id += 1;
        let id = format!("bg_{}", n);
        let command = command.into();
        tracing::info!("[ProcessTable] Backgrounded {} as {}", command, id);
        self.entries.insert(
            n,
            BackgroundProcess {
                id: id.clone(),
                command,
                child,
                pump,
                buffer,
                started_at: Instant::now(),
                exit_code: None,
                notified: false,
            },
        );
        id
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut BackgroundProcess> {
        parse_id(id).and_then(|n| self.entries.get_mut(&n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `[bg_N] <command> (running|stopped)` followed by recent output.
    pub fn get_output(&mut self, id: &str, lines: usize) -> CoreResult<String> {
        let process = self
            .get_mut(id)
            .ok_or_else(|| CoreError::not_found(id.to_string()))?;
        let status = process.status_label();
        let output = process.recent_output(lines);
        Ok(format!(
            "[{}] {} ({})\n\n{}",
            process.id, process.command, status, output
        ))
    }

    /// Terminate (if still running) and unregister. Returns the command text.
    pub async fn stop(&mut self, id: &str) -> CoreResult<String> {
        let n = parse_id(id).ok_or_else(|| CoreError::not_found(id.to_string()))?;
        let mut process = self
            .entries
            .remove(&n)
            .ok_or_else(|| CoreError::not_found(id.to_string()))?;

        if process.is_running() {
            let code = signal::shutdown(&mut process.child, STOP_GRACE).await;
            tracing::info!("[ProcessTable] Stopped {} (exit {:?})", process.id, code);
        }
        Ok(process.command)
    }

    /// One line per entry in id order.
    pub fn list(&mut self) -> String {
        if self.entries.is_empty() {
            return "No background processes running".to_string();
        }
        self.entries
            .values_mut()
            .map(|p| {
                let status = p.status_label();
                format!(
                    "[{}] {} ({}, {}s)",
                    p.id,
                    p.command,
                    status,
                    p.elapsed().as_secs()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Report entries that exited and were not reported before. Reported
    /// entries stay in the table so their final output can still be read.
    pub fn sweep(&mut self, panel_id: &str) -> Vec<CompletedProcess> {
        let mut completed = Vec::new();
        for process in self.entries.values_mut() {
            if process.notified {
                continue;
            }
            let Some(exit_code) = process.poll_exit() else {
                continue;
            };
            process.notified = true;
            process.read_output();
            tracing::info!(
                "[ProcessTable] {} in panel {} exited with {}",
                process.id,
                panel_id,
                exit_code
            );
            completed.push(CompletedProcess {
                panel_id: panel_id.to_string(),
                process_id: process.id.clone(),
                exit_code,
                command: process.command.clone(),
            });
        }
        completed
    }

    /// Stop every entry; used when a panel closes.
    pub async fn stop_all(&mut self) {
        let ids: Vec<String> = self.entries.values().map(|p| p.id.clone()).collect();
        for id in ids {
            let _ = self.stop(&id).await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn(script: &str) -> (Child, OutputPump) {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0)
            .kill_on_drop(true);
        let mut child = cmd.spawn().unwrap();
        let pump = OutputPump::attach(&mut child);
        (child, pump)
    }

    async fn wait_until_exited(table: &mut ProcessTable, id: &str) {
        for _ in 0..100 {
            if !table.get_mut(id).unwrap().is_running() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("{} did not exit", id);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic_and_not_reused() {
        let mut table = ProcessTable::new();
        let (c1, p1) = spawn("sleep 5");
        let (c2, p2) = spawn("sleep 5");
        let id1 = table.register("sleep 5", c1, p1, OutputBuffer::new());
        let id2 = table.register("sleep 5", c2, p2, OutputBuffer::new());
        assert_eq!(id1, "bg_1");
        assert_eq!(id2, "bg_2");

        table.stop(&id2).await.unwrap();
        let (c3, p3) = spawn("sleep 5");
        assert_eq!(table.register("sleep 5", c3, p3, OutputBuffer::new()), "bg_3");
        table.stop_all().await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_get_output_includes_prior_buffer_and_new_lines() {
        let mut table = ProcessTable::new();
        let (child, pump) = spawn("echo later");
        let mut prior = OutputBuffer::new();
        prior.push("earlier\n".into());
        let id = table.register("echo later", child, pump, prior);

        wait_until_exited(&mut table, &id).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let out = table.get_output(&id, 50).unwrap();
        assert!(out.starts_with("[bg_1] echo later (stopped)\n\n"));
        assert!(out.ends_with("earlier\nlater\n"));
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let mut table = ProcessTable::new();
        assert!(matches!(table.get_output("bg_9", 50), Err(CoreError::NotFound(_))));
        assert!(matches!(table.stop("nope").await, Err(CoreError::NotFound(_))));
        assert_eq!(table.list(), "No background processes running");
    }

    #[test]
    fn test_parse_id_accepts_only_canonical_form() {
        assert_eq!(parse_id("bg_1"), Some(1));
        assert_eq!(parse_id("bg_10"), Some(10));
        assert_eq!(parse_id("bg_01"), None);
        assert_eq!(parse_id("bg_+1"), None);
        assert_eq!(parse_id("bg_"), None);
        assert_eq!(parse_id("1"), None);
    }

    #[tokio::test]
    async fn test_non_canonical_ids_do_not_alias() {
        let mut table = ProcessTable::new();
        let (child, pump) = spawn("sleep 5");
        let id = table.register("sleep 5", child, pump, OutputBuffer::new());
        assert_eq!(id, "bg_1");

        for alias in ["bg_01", "bg_+1"] {
            assert!(matches!(table.get_output(alias, 50), Err(CoreError::NotFound(_))));
            assert!(matches!(table.stop(alias).await, Err(CoreError::NotFound(_))));
        }
        assert!(table.get_output("bg_1", 50).is_ok());
        table.stop_all().await;
    }

    #[tokio::test]
    async fn test_sweep_reports_once() {
        let mut table = ProcessTable::new();
        let (child, pump) = spawn("exit 4");
        let id = table.register("exit 4", child, pump, OutputBuffer::new());
        wait_until_exited(&mut table, &id).await;

        let first = table.sweep("p1");
        assert_eq!(
            first,
            vec![CompletedProcess {
                panel_id: "p1".into(),
                process_id: "bg_1".into(),
                exit_code: 4,
                command: "exit 4".into(),
            }]
        );
        assert!(table.sweep("p1").is_empty());
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_running_process() {
        let mut table = ProcessTable::new();
        let (child, pump) = spawn("sleep 30");
        let id = table.register("sleep 30", child, pump, OutputBuffer::new());
        assert!(table.list().starts_with("[bg_1] sleep 30 (running, "));

        let started = Instant::now();
        assert_eq!(table.stop(&id).await.unwrap(), "sleep 30");
        assert!(started.elapsed() < STOP_GRACE);
        assert!(table.get_mut(&id).is_none());
    }
}
