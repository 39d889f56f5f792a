//! Notebook Tools
//!
//! `read_notebook` renders every cell of a Jupyter notebook with its
//! outputs; `notebook_edit` replaces, inserts or deletes one cell. Edits
//! validate the whole request before any checkpoint or write.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use panel_runtime_core::ToolStatus;
use panel_runtime_tools::{ParameterSchema, ToolResult};

use crate::services::tools::context::{checkpoint_note, Invocation, PanelToolContext};
use crate::services::tools::trait_def::Tool;
use crate::utils::paths::{display_path, resolve_path};

use super::read::MAX_LINE_CHARS;
use super::text_utils::{atomic_write, tracked_output, truncate_chars};
use super::{optional_str, required_str};

const CELL_RULE_WIDTH: usize = 40;

/// What `notebook_edit` does to the addressed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotebookEditMode {
    #[default]
    Replace,
    Insert,
    Delete,
}

impl NotebookEditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotebookEditMode::Replace => "replace",
            NotebookEditMode::Insert => "insert",
            NotebookEditMode::Delete => "delete",
        }
    }
}

impl fmt::Display for NotebookEditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotebookEditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(NotebookEditMode::Replace),
            "insert" => Ok(NotebookEditMode::Insert),
            "delete" => Ok(NotebookEditMode::Delete),
            other => Err(format!(
                "Unknown edit mode: '{}'. Use \"replace\", \"insert\", or \"delete\".",
                other
            )),
        }
    }
}

/// A notebook string field: either a plain string or a list of line
/// fragments.
fn joined_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts.iter().filter_map(|p| p.as_str()).collect(),
        _ => String::new(),
    }
}

fn render_outputs(outputs: &[Value], out: &mut Vec<String>) {
    for output in outputs {
        let data = output.get("data");
        match output.get("output_type").and_then(|t| t.as_str()) {
            Some("stream") => {
                out.push(joined_text(output.get("text")).trim_end().to_string());
            }
            Some("execute_result") => {
                if let Some(text) = data.and_then(|d| d.get("text/plain")) {
                    out.push(joined_text(Some(text)).trim_end().to_string());
                }
            }
            Some("error") => {
                let ename = output.get("ename").and_then(|v| v.as_str()).unwrap_or("Error");
                let evalue = output.get("evalue").and_then(|v| v.as_str()).unwrap_or("");
                out.push(format!("{}: {}", ename, evalue));
            }
            Some("display_data") => {
                if let Some(text) = data.and_then(|d| d.get("text/plain")) {
                    out.push(joined_text(Some(text)).trim_end().to_string());
                } else if data.and_then(|d| d.get("image/png")).is_some() {
                    out.push("[Image output]".to_string());
                }
            }
            _ => {}
        }
    }
}

/// Render all cells. Returns the text and the cell count.
pub(crate) fn render_notebook(notebook: &Value) -> (String, usize) {
    let empty = Vec::new();
    let cells = notebook
        .get("cells")
        .and_then(|c| c.as_array())
        .unwrap_or(&empty);
    let rule = "─".repeat(CELL_RULE_WIDTH);

    let mut out = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        let cell_type = cell
            .get("cell_type")
            .and_then(|t| t.as_str())
            .unwrap_or("unknown");
        out.push(rule.clone());
        out.push(format!("Cell {} [{}]", i, cell_type));
        out.push(rule.clone());

        let source = joined_text(cell.get("source"));
        for (j, line) in source.split('\n').enumerate() {
            out.push(format!(
                "{:>4}│ {}",
                j + 1,
                truncate_chars(line, MAX_LINE_CHARS, "...")
            ));
        }

        if cell_type == "code" {
            let outputs = cell.get("outputs").and_then(|o| o.as_array());
            if let Some(outputs) = outputs.filter(|o| !o.is_empty()) {
                out.push(String::new());
                out.push("Output:".to_string());
                render_outputs(outputs, &mut out);
            }
        }
        out.push(String::new());
    }
    (out.join("\n"), cells.len())
}

/// Cell source as stored on disk: one entry per line, each keeping its
/// newline except the last.
fn source_lines(source: &str) -> Value {
    let parts: Vec<&str> = source.split('\n').collect();
    let last = parts.len() - 1;
    Value::Array(
        parts
            .iter()
            .enumerate()
            .map(|(i, line)| {
                if i < last {
                    Value::String(format!("{}\n", line))
                } else {
                    Value::String(line.to_string())
                }
            })
            .collect(),
    )
}

/// Check an edit against the current cell count before anything is
/// touched.
pub(crate) fn validate_edit(
    cells: &[Value],
    index: i64,
    mode: NotebookEditMode,
    cell_type: Option<&str>,
) -> Result<usize, String> {
    let len = cells.len();
    match mode {
        NotebookEditMode::Replace | NotebookEditMode::Delete => {
            if index < 0 || index as usize >= len {
                return Err(format!(
                    "Error: Cell {} out of range (0-{})",
                    index,
                    len as i64 - 1
                ));
            }
            if mode == NotebookEditMode::Replace && !cells[index as usize].is_object() {
                return Err(format!("Error: Invalid notebook: cell {} is not an object", index));
            }
        }
        NotebookEditMode::Insert => {
            if index < 0 || index as usize > len {
                return Err(format!(
                    "Error: Insert position {} out of range (0-{})",
                    index, len
                ));
            }
            if cell_type.map_or(true, str::is_empty) {
                return Err("Error: cell_type required for insert mode".to_string());
            }
        }
    }
    Ok(index as usize)
}

/// Apply a validated edit. Returns the result text without the
/// checkpoint note.
pub(crate) fn apply_edit(
    cells: &mut Vec<Value>,
    index: usize,
    new_source: &str,
    mode: NotebookEditMode,
    cell_type: Option<&str>,
) -> String {
    match mode {
        NotebookEditMode::Delete => {
            cells.remove(index);
            format!("Deleted cell {}", index)
        }
        NotebookEditMode::Insert => {
            let cell_type = cell_type.unwrap_or("code");
            let mut cell = json!({
                "cell_type": cell_type,
                "metadata": {},
                "source": source_lines(new_source),
            });
            if cell_type == "code" {
                cell["outputs"] = json!([]);
                cell["execution_count"] = Value::Null;
            }
            cells.insert(index, cell);
            format!("Inserted {} cell at position {}", cell_type, index)
        }
        NotebookEditMode::Replace => {
            let Some(cell) = cells.get_mut(index).and_then(Value::as_object_mut) else {
                return format!("Error: Invalid notebook: cell {} is not an object", index);
            };
            cell.insert("source".into(), source_lines(new_source));
            if let Some(cell_type) = cell_type.filter(|t| !t.is_empty()) {
                cell.insert("cell_type".into(), Value::String(cell_type.to_string()));
            }
            let is_code = cell.get("cell_type").and_then(|t| t.as_str()) == Some("code");
            if is_code {
                cell.insert("outputs".into(), json!([]));
                cell.insert("execution_count".into(), Value::Null);
            } else {
                cell.remove("outputs");
                cell.remove("execution_count");
            }
            format!("Replaced cell {}", index)
        }
    }
}

/// Serialize with one-space indentation, the layout Jupyter writes.
pub(crate) fn serialize_notebook(notebook: &Value) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    notebook.serialize(&mut serializer)?;
    Ok(buf)
}

impl PanelToolContext {
    /// Existence and extension checks shared by both notebook tools.
    fn check_notebook_path(&mut self, invocation: &Invocation, file_path: &Path) -> Option<ToolResult> {
        if !file_path.exists() {
            return Some(self.fail(
                invocation,
                format!("Error: Notebook not found: {}", file_path.display()),
            ));
        }
        if file_path.extension().and_then(|e| e.to_str()) != Some("ipynb") {
            return Some(self.fail(
                invocation,
                format!("Error: Not a notebook file: {}", file_path.display()),
            ));
        }
        None
    }

    pub async fn read_notebook(&mut self, path: &str) -> ToolResult {
        let file_path = resolve_path(self.working_dir(), path);
        let invocation = self.begin(format!("read notebook {}", display_path(path)));
        if let Some(failed) = self.check_notebook_path(&invocation, &file_path) {
            return failed;
        }

        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) => {
                let message = format!("Error reading notebook: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };
        let notebook: Value = match serde_json::from_str(&content) {
            Ok(notebook) => notebook,
            Err(e) => {
                let message = format!("Error parsing notebook JSON: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };

        let (rendered, cell_count) = render_notebook(&notebook);
        self.finish(
            &invocation,
            ToolStatus::Success,
            Some(format!("{} cells", cell_count)),
            tracked_output(&rendered),
        );
        ToolResult::ok(rendered)
    }

    pub async fn notebook_edit(
        &mut self,
        path: &str,
        cell_index: i64,
        new_source: &str,
        mode: NotebookEditMode,
        cell_type: Option<&str>,
    ) -> ToolResult {
        let file_path = resolve_path(self.working_dir(), path);
        let invocation = self.begin(format!(
            "notebook {} {}[{}]",
            mode,
            display_path(path),
            cell_index
        ));
        if let Some(failed) = self.check_notebook_path(&invocation, &file_path) {
            return failed;
        }

        let content = match tokio::fs::read_to_string(&file_path).await {
            Ok(content) => content,
            Err(e) => {
                let message = format!("Error editing notebook: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };
        let mut notebook: Value = match serde_json::from_str(&content) {
            Ok(notebook) => notebook,
            Err(e) => {
                let message = format!("Error parsing notebook JSON: {}", e);
                return self.fail_with(&invocation, e, message);
            }
        };
        let validated = match notebook.get("cells").and_then(|c| c.as_array()) {
            Some(cells) => validate_edit(cells, cell_index, mode, cell_type),
            None => Err("Error: Invalid notebook: missing 'cells' array".to_string()),
        };
        let index = match validated {
            Ok(index) => index,
            Err(message) => return self.fail(&invocation, message),
        };

        if let Some(refused) = self.approve(&invocation, "notebook_edit", "Notebook edit").await {
            return refused;
        }

        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        let checkpoint =
            match self.create_checkpoint(&file_path, format!("Before notebook edit: {}", name)) {
                Ok(checkpoint) => checkpoint,
                Err(e) => {
                    let message = format!("Error editing notebook: checkpoint failed: {}", e);
                    return self.fail_with(&invocation, e, message);
                }
            };

        let summary = match notebook.get_mut("cells").and_then(|c| c.as_array_mut()) {
            Some(cells) => apply_edit(cells, index, new_source, mode, cell_type),
            None => {
                return self.fail(
                    &invocation,
                    "Error: Invalid notebook: missing 'cells' array".to_string(),
                )
            }
        };

        let written = serialize_notebook(&notebook)
            .map_err(|e| e.to_string())
            .and_then(|bytes| atomic_write(&file_path, &bytes).map_err(|e| e.to_string()));
        if let Err(e) = written {
            let message = format!("Error editing notebook: {}", e);
            return self.fail_with(&invocation, e, message);
        }

        let result = format!("{}{}", summary, checkpoint_note(&checkpoint));
        let preview = match mode {
            NotebookEditMode::Replace => "replaced",
            NotebookEditMode::Insert => "inserted",
            NotebookEditMode::Delete => "deleted",
        };
        tracing::debug!("[NotebookEdit] {} in {}", summary, file_path.display());
        self.finish(&invocation, ToolStatus::Success, Some(preview.into()), result.clone());
        ToolResult::ok(result)
    }
}

/// `read_notebook(path)`
pub struct ReadNotebookTool;

impl ReadNotebookTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReadNotebookTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for ReadNotebookTool {
    fn name(&self) -> &str {
        "read_notebook"
    }

    fn description(&self) -> &str {
        "Read a Jupyter notebook (.ipynb) and show every cell with numbered source lines and outputs."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Path to the .ipynb file")),
        );
        ParameterSchema::object(
            Some("Read notebook parameters"),
            properties,
            vec!["path".to_string()],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let path = match required_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        ctx.read_notebook(path).await
    }
}

/// `notebook_edit(path, cell_index, new_source, mode = "replace", cell_type?)`
pub struct NotebookEditTool;

impl NotebookEditTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NotebookEditTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for NotebookEditTool {
    fn name(&self) -> &str {
        "notebook_edit"
    }

    fn description(&self) -> &str {
        "Edit a Jupyter notebook cell: replace its source, insert a new cell before the given index, or delete it. cell_type is required for insert."
    }

    fn parameters_schema(&self) -> ParameterSchema {
        let mut properties = HashMap::new();
        properties.insert(
            "path".to_string(),
            ParameterSchema::string(Some("Path to the .ipynb file")),
        );
        properties.insert(
            "cell_index".to_string(),
            ParameterSchema::integer(Some("0-based cell index")),
        );
        properties.insert(
            "new_source".to_string(),
            ParameterSchema::string(Some("New cell content (ignored for delete)")),
        );
        properties.insert(
            "mode".to_string(),
            ParameterSchema::string_enum(Some("Edit mode"), &["replace", "insert", "delete"])
                .with_default(Value::String("replace".into())),
        );
        properties.insert(
            "cell_type".to_string(),
            ParameterSchema::string_enum(Some("Cell type, required for insert"), &["code", "markdown"]),
        );
        ParameterSchema::object(
            Some("Notebook edit parameters"),
            properties,
            vec!["path".to_string(), "cell_index".to_string()],
        )
    }

    async fn execute(&self, ctx: &mut PanelToolContext, args: Value) -> ToolResult {
        let path = match required_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        // cell_number / edit_mode are accepted as older spellings
        let index = args
            .get("cell_index")
            .or_else(|| args.get("cell_number"))
            .and_then(|v| match v {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            });
        let Some(cell_index) = index else {
            return ToolResult::err("Missing required parameter: cell_index");
        };
        let mode = match optional_str(&args, "mode").or_else(|| optional_str(&args, "edit_mode")) {
            Some(raw) => match raw.parse::<NotebookEditMode>() {
                Ok(mode) => mode,
                Err(e) => return ToolResult::err(format!("Error: {}", e)),
            },
            None => NotebookEditMode::Replace,
        };
        let new_source = optional_str(&args, "new_source").unwrap_or("");
        if mode != NotebookEditMode::Delete && args.get("new_source").is_none() {
            return ToolResult::err("Missing required parameter: new_source");
        }
        let cell_type = optional_str(&args, "cell_type");
        ctx.notebook_edit(path, cell_index, new_source, mode, cell_type)
            .await
    }
}
