//! Shell Command Runner
//!
//! Drives one foreground shell command. A single poll loop resolves three
//! races every 50ms, in this order: the user asked to background the
//! command, the command exited, the timeout elapsed.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

use panel_runtime_core::CoreResult;

use super::background::ProcessTable;
use super::output::{OutputCapture, OutputPump};
use super::signal;

/// Sleep between poll iterations.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Lines of output returned with a timeout error.
pub const TIMEOUT_TAIL_LINES: usize = 50;

/// How long readers get to reach EOF after the child exits.
const EOF_GRACE: Duration = Duration::from_millis(500);

/// Grace between SIGTERM and SIGKILL on timeout.
const TIMEOUT_KILL_GRACE: Duration = Duration::from_secs(1);

/// Per-panel "move the foreground command to the background" flag.
///
/// Cloned out of the panel so the UI can raise it while a command runs.
#[derive(Debug, Clone, Default)]
pub struct BackgroundSignal(Arc<AtomicBool>);

impl BackgroundSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Read and reset the flag.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What to run and where.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    pub shell: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

/// How a foreground command ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited; `output` is already capped.
    Exited { output: String, exit_code: i32 },
    /// The child now lives in the process table under `id`.
    Backgrounded { id: String },
    /// The child was terminated after the timeout; `tail` holds its last lines.
    TimedOut { tail: String },
}

fn shell_flag(shell: &str) -> &'static str {
    let name = std::path::Path::new(shell)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(shell);
    if name.eq_ignore_ascii_case("cmd") {
        "/C"
    } else {
        "-c"
    }
}

fn spawn(spec: &ShellCommand) -> std::io::Result<Child> {
    let mut cmd = Command::new(&spec.shell);
    cmd.arg(shell_flag(&spec.shell))
        .arg(&spec.command)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    cmd.spawn()
}

/// Run `spec` to completion, backgrounding or timeout. A backgrounded child
/// is registered in `processes` together with everything captured so far.
pub async fn run_foreground(
    spec: &ShellCommand,
    background: &BackgroundSignal,
    processes: &mut ProcessTable,
) -> CoreResult<RunOutcome> {
    let mut child = spawn(spec)?;
    let mut pump = OutputPump::attach(&mut child);
    let mut capture = OutputCapture::new();
    let started = Instant::now();

    tracing::debug!(
        "[ShellRunner] Spawned {:?} (pid {:?}) in {}",
        spec.command,
        child.id(),
        spec.working_dir.display()
    );

    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        pump.drain(|line| capture.push(line));

        if background.take() {
            let id = processes.register(spec.command.clone(), child, pump, capture.into_ring());
            return Ok(RunOutcome::Backgrounded { id });
        }

        if let Some(status) = child.try_wait()? {
            pump.finish(EOF_GRACE, |line| capture.push(line)).await;
            let exit_code = signal::exit_code(status);
            tracing::debug!(
                "[ShellRunner] {:?} exited with {} after {:?}",
                spec.command,
                exit_code,
                started.elapsed()
            );
            return Ok(RunOutcome::Exited {
                output: capture.finish(),
                exit_code,
            });
        }

        if started.elapsed() > spec.timeout {
            tracing::warn!(
                "[ShellRunner] {:?} timed out after {}s",
                spec.command,
                spec.timeout.as_secs()
            );
            signal::shutdown(&mut child, TIMEOUT_KILL_GRACE).await;
            pump.drain(|line| capture.push(line));
            return Ok(RunOutcome::TimedOut {
                tail: capture.tail(TIMEOUT_TAIL_LINES),
            });
        }
    }
}
