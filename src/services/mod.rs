//! Services
//!
//! The tool runtime: approval gate, shell runner and background processes,
//! search backends, agent tools and the per-panel registry.

pub mod approval;
pub mod panels;
pub mod process;
pub mod search;
pub mod tools;
pub mod ui;

pub use approval::ApprovalGate;
pub use panels::{PanelHandle, PanelRegistry};
pub use process::CompletedProcess;
pub use tools::{PanelMode, PanelToolContext, Tool, ToolRegistry};
pub use ui::{ui_channel, ApprovalDecision, UiEvent, UiHandle};
