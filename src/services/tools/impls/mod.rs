//! Individual Tool Implementations
//!
//! Each file adds the typed operation to `PanelToolContext` and a `Tool`
//! struct that parses JSON arguments and calls it.

pub mod command;
pub mod edit;
pub mod list;
pub mod notebook;
pub mod process;
pub mod read;
pub mod search;
pub mod text_utils;
pub mod write;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use command::RunCommandTool;
pub use edit::EditFileTool;
pub use list::ListFilesTool;
pub use notebook::{NotebookEditMode, NotebookEditTool, ReadNotebookTool};
pub use process::{GetProcessOutputTool, ListProcessesTool, StopProcessTool};
pub use read::ReadFileTool;
pub use search::{SearchFilesTool, SearchParams};
pub use write::WriteFileTool;

use serde_json::Value;

use panel_runtime_tools::ToolResult;

fn missing_param_error(param: &str) -> ToolResult {
    ToolResult::err(format!("Missing required parameter: {}", param))
}

/// A required string argument.
pub(crate) fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str, ToolResult> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| missing_param_error(name))
}

/// An optional string argument; JSON `null` counts as absent.
pub(crate) fn optional_str<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.as_str())
}

/// An optional non-negative integer. Numeric strings are accepted, since
/// models sometimes quote numbers.
pub(crate) fn optional_usize(args: &Value, name: &str) -> Option<usize> {
    match args.get(name)? {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn optional_bool(args: &Value, name: &str) -> Option<bool> {
    match args.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
