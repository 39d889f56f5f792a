//! Settings Models
//!
//! Runtime configuration and the per-panel tool settings derived from it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default foreground timeout for `run_command`, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 120;

/// Which search/list implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchBackendKind {
    /// Use `fd`/`rg` when the capability probe finds them
    #[default]
    Auto,
    /// Always use the external binaries
    Fast,
    /// Always use the in-process walker
    Portable,
}

impl FromStr for SearchBackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "fast" => Ok(Self::Fast),
            "portable" => Ok(Self::Portable),
            other => Err(format!(
                "Invalid search backend: {}. Must be 'auto', 'fast', or 'portable'",
                other
            )),
        }
    }
}

fn default_shell() -> String {
    if cfg!(windows) {
        "cmd".to_string()
    } else {
        "sh".to_string()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_command_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

/// Runtime configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Shell program used by `run_command`
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Foreground timeout for `run_command`, in seconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// Search/list backend selection
    #[serde(default)]
    pub search_backend: SearchBackendKind,
    /// Default tracing filter for the binary
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            search_backend: SearchBackendKind::Auto,
            log_level: default_log_level(),
        }
    }
}

/// Configuration update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    pub shell: Option<String>,
    pub command_timeout_secs: Option<u64>,
    pub search_backend: Option<SearchBackendKind>,
    pub log_level: Option<String>,
}

/// The subset of configuration every tool invocation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    pub shell: String,
    pub command_timeout: Duration,
    pub search_backend: SearchBackendKind,
}

impl Default for ToolSettings {
    fn default() -> Self {
        RuntimeConfig::default().tool_settings()
    }
}

impl RuntimeConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(shell) = update.shell {
            self.shell = shell;
        }
        if let Some(timeout) = update.command_timeout_secs {
            self.command_timeout_secs = timeout;
        }
        if let Some(backend) = update.search_backend {
            self.search_backend = backend;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.shell.trim().is_empty() {
            return Err("shell cannot be empty".to_string());
        }

        if self.command_timeout_secs < 1 {
            return Err("command_timeout_secs must be at least 1 second".to_string());
        }
        if self.command_timeout_secs > 3600 {
            return Err("command_timeout_secs cannot exceed 3600".to_string());
        }

        if self.log_level.trim().is_empty() {
            return Err("log_level cannot be empty".to_string());
        }

        Ok(())
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            shell: self.shell.clone(),
            command_timeout: Duration::from_secs(self.command_timeout_secs),
            search_backend: self.search_backend,
        }
    }
}
