//! Panel Runtime Core
//!
//! Foundational types shared by every crate of the panel runtime workspace.
//! This crate has no dependency on process management, the UI channel or the
//! filesystem tools.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `checkpoint` - Checkpoint collaborator contract (`Checkpoint`, `CheckpointStore`)
//! - `segment` - Per-panel segment log (`Segment`, `SegmentLog`, `ToolStatus`)

pub mod checkpoint;
pub mod error;
pub mod segment;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Checkpoints ────────────────────────────────────────────────────────
pub use checkpoint::{Checkpoint, CheckpointStore};

// ── Segment Log ────────────────────────────────────────────────────────
pub use segment::{Segment, SegmentLog, ToolStatus};
