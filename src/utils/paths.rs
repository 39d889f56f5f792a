//! Cross-Platform Path Utilities
//!
//! Resolves the runtime's data directory (~/.panel-runtime/) and turns
//! tool-supplied paths into absolute ones.

use std::path::{Component, Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the runtime directory (~/.panel-runtime/)
pub fn runtime_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".panel-runtime"))
}

/// Get the config file path (~/.panel-runtime/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(runtime_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the runtime directory, creating if it doesn't exist
pub fn ensure_runtime_dir() -> AppResult<PathBuf> {
    let path = runtime_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}

/// Resolve `path` against `working_dir` and normalize `.` and `..`
/// components lexically. Symlinks are left alone so the target does not
/// need to exist yet.
pub fn resolve_path(working_dir: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        working_dir.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Shorten a path for status display: `...` plus the last 37 characters
/// when it is longer than 40.
pub fn display_path(path: &str) -> String {
    let count = path.chars().count();
    if count <= 40 {
        return path.to_string();
    }
    let tail: String = path.chars().skip(count - 37).collect();
    format!("...{}", tail)
}
