//! Process Output Capture
//!
//! Child stdout and stderr are read by two small tasks that forward whole
//! lines into one bounded channel. The owner drains that channel without
//! blocking whenever it looks at the process: every poll tick for a
//! foreground command, and on each query for a backgrounded one.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Lines buffered between reader tasks and the owner.
const LINE_CHANNEL_CAPACITY: usize = 1024;

/// Soft cap on retained lines; exceeding it trims to `RING_TRIM_TO`.
pub const RING_SOFT_CAP: usize = 1000;
pub const RING_TRIM_TO: usize = 500;

/// Characters of foreground output returned to the agent.
pub const MAX_OUTPUT_CHARS: usize = 10_000;

/// Bounded line ring. Lines keep their trailing newline.
#[derive(Debug, Default, Clone)]
pub struct OutputBuffer {
    lines: VecDeque<String>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line. When the ring grows past the soft cap the oldest lines
    /// are dropped until only the newest `RING_TRIM_TO` remain.
    pub fn push(&mut self, line: String) {
        self.lines.push_back(line);
        if self.lines.len() > RING_SOFT_CAP {
            let excess = self.lines.len() - RING_TRIM_TO;
            self.lines.drain(..excess);
        }
    }

    /// Concatenation of the last `count` lines.
    pub fn recent(&self, count: usize) -> String {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}

/// Foreground capture: the first `MAX_OUTPUT_CHARS` characters for the
/// final result plus a ring of recent lines for timeouts and backgrounding.
#[derive(Debug, Default)]
pub struct OutputCapture {
    head: String,
    head_chars: usize,
    truncated: bool,
    ring: OutputBuffer,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: String) {
        if self.head_chars < MAX_OUTPUT_CHARS {
            let room = MAX_OUTPUT_CHARS - self.head_chars;
            let line_chars = line.chars().count();
            if line_chars <= room {
                self.head.push_str(&line);
                self.head_chars += line_chars;
            } else {
                self.head.extend(line.chars().take(room));
                self.head_chars = MAX_OUTPUT_CHARS;
                self.truncated = true;
            }
        } else if !line.is_empty() {
            self.truncated = true;
        }
        self.ring.push(line);
    }

    /// Final output text: the head, with a marker when output was cut.
    pub fn finish(&self) -> String {
        if self.truncated {
            format!("{}\n... (truncated)", self.head)
        } else {
            self.head.clone()
        }
    }

    /// The last `count` captured lines.
    pub fn tail(&self, count: usize) -> String {
        self.ring.recent(count)
    }

    /// Hand the recent lines over to a background entry.
    pub fn into_ring(self) -> OutputBuffer {
        self.ring
    }
}

/// Merged stdout/stderr line stream of one child process.
#[derive(Debug)]
pub struct OutputPump {
    rx: mpsc::Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

impl OutputPump {
    /// Take the child's piped stdout and stderr and start forwarding lines.
    pub fn attach(child: &mut Child) -> Self {
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone())));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx.clone())));
        }
        Self { rx, readers }
    }

    /// Move every line available right now into `sink`. Never waits.
    pub fn drain(&mut self, mut sink: impl FnMut(String)) -> usize {
        let mut count = 0;
        while let Ok(line) = self.rx.try_recv() {
            sink(line);
            count += 1;
        }
        count
    }

    /// After the child exited: wait up to `grace` for the readers to reach
    /// EOF, forwarding everything they produce. Readers still running after
    /// that (a grandchild holding the pipe) are abandoned.
    pub async fn finish(&mut self, grace: Duration, mut sink: impl FnMut(String)) {
        let rx = &mut self.rx;
        let _ = tokio::time::timeout(grace, async {
            while let Some(line) = rx.recv().await {
                sink(line);
            }
        })
        .await;
        self.drain(sink);
        for reader in &self.readers {
            reader.abort();
        }
    }
}

impl Drop for OutputPump {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

async fn forward_lines<R>(stream: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("[OutputPump] Reader stopped: {}", e);
                break;
            }
        }
    }
}
