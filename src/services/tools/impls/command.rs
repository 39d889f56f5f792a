//! Run Command Tool
//!
//! Runs a shell command in the panel's working directory after approval.
//! The user can move a running command to the background; it then keeps
//! running under a `bg_N` id.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::ToolStatus;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::process::{run_foreground, RunOutcome, ShellCommand};
use crate::services::tools::context::{Invocation, PanelToolContext};
use crate::services::tools::trait_def::Tool;

use super::required_str;

impl PanelToolContext {
    pub async fn run_command(&mut self, command: &str) -> ToolResult {
        // A request raised before this command started is stale.
        self.background.clear();

        let display = format!("$ {}", command);
        let pending = Invocation::pending(display.clone());
        if let Some(refused) = self.approve(&pending, "run_command", "Command").await {
            return refused;
        }

        let invocation = self.begin(display);
        let spec = ShellCommand {
            shell: self.settings().shell.clone(),
            command: command.to_string(),
            working_dir: self.working_dir().to_path_buf(),
            timeout: self.settings().command_timeout,
        };

        match run_foreground(&spec, &self.background, &mut self.processes).await {
            Ok(RunOutcome::Exited { output, exit_code }) => {
                let output = if output.is_empty() {
                    "(no output)".to_string()
                } else {
                    output
                };
                let status = if exit_code == 0 {
                    ToolStatus::Success
                } else {
                    ToolStatus::Error
                };
                self.finish(&invocation, status, Some(output.clone()), output.clone());
                ToolResult {
                    status,
                    content: output,
                }
            }
            Ok(RunOutcome::Backgrounded { id }) => {
                self.finish(&invocation, ToolStatus::Backgrounded, None, "backgrounded");
                ToolResult::backgrounded(format!(
                    "[Backgrounded: {id}] {command}\nUse get_process_output('{id}') to check status."
                ))
            }
            Ok(RunOutcome::TimedOut { tail }) => {
                let secs = spec.timeout.as_secs();
                let note = format!("Timed out after {}s", secs);
                self.finish(&invocation, ToolStatus::Error, Some(note.clone()), note);
                ToolResult::err(format!("Error: Command timed out after {}s\n{}", secs, tail))
            }
            Err(e) => {
                let message = format!("Error running command: {}", e);
                self.finish(&invocation, ToolStatus::Error, Some(e.to_string()), e.to_string());
                ToolResult::err(message)
            }
        }
    }
}

/// `run_command(command)`
pub struct RunCommandTool;

impl RunCommandTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RunCommandTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for RunCommandTool {
    fn name(&self) -> &str {
        "run_command"
    }

    fn description(&self) -> &str {
        "Run a shell command in the working directory and return its combined stdout/stderr. The user may move long-running commands to the background; use get_process_output to follow them."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "command".to_string(),
            ParameterSchema::string(Some("The shell command to run")),
        );
        ParameterSchema::object(
            Some("Run command parameters"),
            properties,
            vec!["command".to_string()],
        )
    }

    fn is_long_running(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let command = match required_str(&args, "command") {
            Ok(c) => c,
            Err(e) => return e,
        };
        ctx.run_command(command).await
    }
}
