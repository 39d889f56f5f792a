//! Tool Trait and Registry
//!
//! Defines the `Tool` trait every agent tool implements and the
//! `ToolRegistry` the orchestration layer uses to list tool definitions and
//! dispatch calls by name against a panel's context.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use panel_runtime_tools::{ParameterSchema, ToolDefinition, ToolResult};

use crate::services::tools::context::PanelToolContext;
use crate::services::tools::impls::{
    EditFileTool, GetProcessOutputTool, ListFilesTool, ListProcessesTool, NotebookEditTool,
    ReadFileTool, ReadNotebookTool, RunCommandTool, SearchFilesTool, StopProcessTool,
    WriteFileTool,
};

/// A tool callable by the agent.
///
/// Tools are stateless; everything an invocation needs (working directory,
/// approvals, processes, segments) lives in the `PanelToolContext` it runs
/// against.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name of this tool (e.g., "read_file", "run_command")
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does
    fn description(&self) -> &str;

    /// JSON schema describing the tool's input parameters
    fn parameters_schema(&self) -> ParameterSchema;

    /// Whether this tool may run for a long time and can be backgrounded.
    /// Default: false.
    fn is_long_running(&self) -> bool {
        false
    }

    /// Execute the tool against one panel's context.
    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult;
}

/// Registry of available tools.
///
/// O(1) lookup by name; iteration follows registration order.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    /// Insertion order for deterministic iteration
    order: Vec<String>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// The full catalogue: file, search, command, process and notebook
    /// tools. Interactive and headless panels expose the same set.
    pub fn catalogue() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ReadFileTool::new()));
        registry.register(Arc::new(WriteFileTool::new()));
        registry.register(Arc::new(EditFileTool::new()));
        registry.register(Arc::new(ListFilesTool::new()));
        registry.register(Arc::new(SearchFilesTool::new()));
        registry.register(Arc::new(RunCommandTool::new()));
        registry.register(Arc::new(GetProcessOutputTool::new()));
        registry.register(Arc::new(StopProcessTool::new()));
        registry.register(Arc::new(ListProcessesTool::new()));
        registry.register(Arc::new(ReadNotebookTool::new()));
        registry.register(Arc::new(NotebookEditTool::new()));
        registry
    }

    /// Register a tool. If a tool with the same name already exists, it is replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, tool);
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.parameters_schema(),
            })
            .collect()
    }

    /// All registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name. Unknown names yield `ToolResult::err`.
    pub async fn execute(
        &self,
        name: &str,
        ctx: &mut PanelToolContext,
        args: Value,
    ) -> ToolResult {
        match self.tools.get(name) {
            Some(tool) => {
                tracing::debug!("[ToolRegistry] {} in panel {}", name, ctx.panel_id());
                tool.execute(ctx, args).await
            }
            None => ToolResult::err(format!("Unknown tool: {}", name)),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
