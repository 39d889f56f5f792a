//! Panel Runtime
//!
//! Tool-execution runtime for an interactive coding agent. It provides:
//! - File, notebook, search and shell tools bound to a panel's working
//!   directory
//! - An approval gate with a panel-scoped allow-list and diff review
//! - Foreground commands that can be moved to the background, with a
//!   per-panel process table and a cross-panel completion sweep
//! - fd/ripgrep search with a portable in-process fallback

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::settings::{ConfigUpdate, RuntimeConfig, SearchBackendKind, ToolSettings};
pub use services::{
    ui_channel, ApprovalDecision, CompletedProcess, PanelMode, PanelRegistry, PanelToolContext,
    Tool, ToolRegistry, UiEvent, UiHandle,
};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};

pub use panel_runtime_core::{Checkpoint, CheckpointStore, CoreError, CoreResult, Segment, ToolStatus};
pub use panel_runtime_tools::{ParameterSchema, ToolDefinition, ToolResult};
