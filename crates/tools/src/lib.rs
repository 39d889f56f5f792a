//! Panel Runtime Tools
//!
//! Portable types for the tool catalogue that compile independently of the
//! runtime itself:
//! - `ToolResult` - text result plus invocation status
//! - `ParameterSchema` / `ToolDefinition` - argument schemas for the catalogue
//!
//! The `Tool` trait, the registry and the tool implementations live in the
//! main crate's `services::tools` module, next to `PanelToolContext`.

pub mod executor;
pub mod schema;

// Re-export core types
pub use executor::ToolResult;
pub use schema::{ParameterSchema, ToolDefinition};
