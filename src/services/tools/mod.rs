//! Agent Tools
//!
//! The per-panel tool context, the `Tool` trait and registry, and the
//! eleven tool implementations.

pub mod context;
pub mod impls;
pub mod trait_def;

pub use context::{PanelMode, PanelToolContext};
pub use impls::{NotebookEditMode, SearchParams};
pub use trait_def::{Tool, ToolRegistry};
