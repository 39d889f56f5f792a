//! Process Management
//!
//! Foreground shell execution and the per-panel background process table.

pub mod background;
pub mod output;
pub mod runner;
pub mod signal;

pub use background::{BackgroundProcess, CompletedProcess, ProcessTable, DEFAULT_OUTPUT_LINES};
pub use output::{OutputBuffer, OutputCapture, OutputPump};
pub use runner::{run_foreground, BackgroundSignal, RunOutcome, ShellCommand};
