//! Data Models
//!
//! Runtime configuration and the settings tools read from it.

pub mod settings;

pub use settings::*;
