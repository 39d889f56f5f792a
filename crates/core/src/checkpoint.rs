//! Checkpoint Collaborator
//!
//! The runtime never stores checkpoints itself. Mutation tools ask a
//! `CheckpointStore` to snapshot the files they are about to touch and echo
//! the returned id in their output so the user can restore it later.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::CoreResult;

/// A snapshot handle returned by the checkpoint collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Opaque identifier echoed in tool output as `(checkpoint: <id>)`
    pub id: String,
    /// Human-readable description, e.g. `Before edit: main.rs`
    pub description: String,
    /// Files covered by the snapshot
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    /// Session the snapshot belongs to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Storage backend for pre-mutation snapshots.
pub trait CheckpointStore: Send + Sync {
    /// Snapshot `paths` before they are modified.
    fn create(
        &self,
        paths: &[PathBuf],
        description: &str,
        session_id: Option<&str>,
    ) -> CoreResult<Checkpoint>;
}
