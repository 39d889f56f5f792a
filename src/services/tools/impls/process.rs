//! Background Process Tools
//!
//! `get_process_output`, `stop_process` and `list_processes` over the
//! panel's process table. These only query or stop what `run_command`
//! backgrounded, so they pass no approval and record no segment.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use panel_runtime_core::CoreError;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::process::DEFAULT_OUTPUT_LINES;
use crate::services::tools::context::PanelToolContext;
use crate::services::tools::trait_def::Tool;

use super::{optional_usize, required_str};

impl PanelToolContext {
    pub fn get_process_output(&mut self, process_id: &str, lines: usize) -> ToolResult {
        match self.processes.get_output(process_id, lines) {
            Ok(output) => ToolResult::ok(output),
            Err(CoreError::NotFound(_)) => ToolResult::err(format!(
                "Error: No process with ID {}. Use list_processes() to see running processes.",
                process_id
            )),
            Err(e) => ToolResult::err(format!("Error: {}", e)),
        }
    }

    pub async fn stop_process(&mut self, process_id: &str) -> ToolResult {
        match self.processes.stop(process_id).await {
            Ok(command) => ToolResult::ok(format!("Stopped: {}", command)),
            Err(CoreError::NotFound(_)) => {
                ToolResult::err(format!("Error: No process with ID {}", process_id))
            }
            Err(e) => ToolResult::err(format!("Error: {}", e)),
        }
    }

    pub fn list_processes(&mut self) -> ToolResult {
        ToolResult::ok(self.processes.list())
    }
}

fn process_id_schema(description: &str) -> ParameterSchema {
    let mut properties = HashMap::new();
    properties.insert(
        "process_id".to_string(),
        ParameterSchema::string(Some("Background process id, e.g. \"bg_1\"")),
    );
    ParameterSchema::object(Some(description), properties, vec!["process_id".to_string()])
}

/// `get_process_output(process_id, lines = 50)`
pub struct GetProcessOutputTool;

impl GetProcessOutputTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GetProcessOutputTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GetProcessOutputTool {
    fn name(&self) -> &str {
        "get_process_output"
    }

    fn description(&self) -> &str {
        "Get the recent output and running state of a background process."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut schema = process_id_schema("Get process output parameters");
        if let Some(properties) = schema.properties.as_mut() {
            properties.insert(
                "lines".to_string(),
                ParameterSchema::integer(Some("Number of trailing lines to return"))
                    .with_default(Value::from(DEFAULT_OUTPUT_LINES)),
            );
        }
        schema
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let process_id = match required_str(&args, "process_id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        let lines = optional_usize(&args, "lines").unwrap_or(DEFAULT_OUTPUT_LINES);
        ctx.get_process_output(process_id, lines)
    }
}

/// `stop_process(process_id)`
pub struct StopProcessTool;

impl StopProcessTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StopProcessTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for StopProcessTool {
    fn name(&self) -> &str {
        "stop_process"
    }

    fn description(&self) -> &str {
        "Stop a background process: terminate it, force-kill after 5 seconds, and forget it."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        process_id_schema("Stop process parameters")
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let process_id = match required_str(&args, "process_id") {
            Ok(id) => id,
            Err(e) => return e,
        };
        ctx.stop_process(process_id).await
    }
}

/// `list_processes()`
pub struct ListProcessesTool;

impl ListProcessesTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ListProcessesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ListProcessesTool {
    fn name(&self) -> &str {
        "list_processes"
    }

    fn description(&self) -> &str {
        "List the background processes of this panel with their state and age."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::object(Some("List processes parameters"), HashMap::new(), vec![])
    }

    async fn execute(&self, ctx: &mut PanelToolContext, _args: Value) -> ToolResult {
        ctx.list_processes()
    }
}
