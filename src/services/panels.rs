//! Panel Registry
//!
//! Owns one `PanelToolContext` per open panel, keyed by panel id. Each
//! context sits behind its own mutex so panels never block each other; the
//! background-request flag is kept beside it so a key binding can reach a
//! command that currently holds the lock.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use panel_runtime_core::{CheckpointStore, Segment};

use crate::models::settings::ToolSettings;
use crate::services::process::{BackgroundSignal, CompletedProcess};
use crate::services::tools::context::PanelToolContext;
use crate::services::ui::UiHandle;

/// Shared handle to one panel's context.
pub type PanelHandle = Arc<Mutex<PanelToolContext>>;

struct PanelEntry {
    context: PanelHandle,
    background: BackgroundSignal,
}

/// All open panels of one runtime.
pub struct PanelRegistry {
    panels: RwLock<HashMap<String, PanelEntry>>,
    ui: Option<UiHandle>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    settings: ToolSettings,
}

impl PanelRegistry {
    /// Panels opened here are interactive when `ui` is set, headless
    /// otherwise.
    pub fn new(
        ui: Option<UiHandle>,
        checkpoints: Option<Arc<dyn CheckpointStore>>,
        settings: ToolSettings,
    ) -> Self {
        Self {
            panels: RwLock::new(HashMap::new()),
            ui,
            checkpoints,
            settings,
        }
    }

    /// Open a panel, or return the existing one with the same id.
    pub async fn open(
        &self,
        panel_id: &str,
        session_id: Option<String>,
        working_dir: impl Into<PathBuf>,
    ) -> PanelHandle {
        let mut panels = self.panels.write().await;
        if let Some(entry) = panels.get(panel_id) {
            return entry.context.clone();
        }

        let context = PanelToolContext::new(
            panel_id,
            session_id,
            working_dir,
            self.ui.clone(),
            self.checkpoints.clone(),
        )
        .with_settings(self.settings.clone());
        let background = context.background_handle();
        let handle = Arc::new(Mutex::new(context));
        tracing::debug!("[PanelRegistry] Opened panel {}", panel_id);
        panels.insert(
            panel_id.to_string(),
            PanelEntry {
                context: handle.clone(),
                background,
            },
        );
        handle
    }

    pub async fn get(&self, panel_id: &str) -> Option<PanelHandle> {
        self.panels
            .read()
            .await
            .get(panel_id)
            .map(|entry| entry.context.clone())
    }

    /// Close a panel and stop its background processes. Returns false for
    /// an unknown id.
    pub async fn close(&self, panel_id: &str) -> bool {
        let entry = self.panels.write().await.remove(panel_id);
        match entry {
            Some(entry) => {
                entry.context.lock().await.shutdown().await;
                tracing::info!("[PanelRegistry] Closed panel {}", panel_id);
                true
            }
            None => false,
        }
    }

    /// Sorted ids of the open panels.
    pub async fn panel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.panels.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Ask the panel's running foreground command to move to the
    /// background. Does not wait for the context lock.
    pub async fn request_background(&self, panel_id: &str) -> bool {
        match self.panels.read().await.get(panel_id) {
            Some(entry) => {
                entry.background.raise();
                true
            }
            None => false,
        }
    }

    /// Sweep every panel for background processes that exited since the
    /// last sweep. Panels busy with a tool call are skipped this round and
    /// picked up by a later sweep.
    pub async fn check_completed_processes(&self) -> Vec<CompletedProcess> {
        let panels = self.panels.read().await;
        let mut ids: Vec<&String> = panels.keys().collect();
        ids.sort();

        let mut completed = Vec::new();
        for id in ids {
            let Some(entry) = panels.get(id) else {
                continue;
            };
            match entry.context.try_lock() {
                Ok(mut context) => completed.extend(context.check_completed_processes()),
                Err(_) => tracing::debug!("[PanelRegistry] Panel {} busy, sweep deferred", id),
            }
        }
        completed
    }

    pub async fn get_segments(&self, panel_id: &str) -> Option<Vec<Segment>> {
        let handle = self.get(panel_id).await?;
        let context = handle.lock().await;
        Some(context.get_segments())
    }

    pub async fn clear_segments(&self, panel_id: &str) -> bool {
        match self.get(panel_id).await {
            Some(handle) => {
                handle.lock().await.clear_segments();
                true
            }
            None => false,
        }
    }

    pub async fn add_text_segment(&self, panel_id: &str, text: &str) -> bool {
        match self.get(panel_id).await {
            Some(handle) => {
                handle.lock().await.add_text_segment(text);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn headless_registry() -> PanelRegistry {
        PanelRegistry::new(None, None, ToolSettings::default())
    }

    #[tokio::test]
    async fn test_open_is_idempotent_and_panels_are_isolated() {
        let dir = TempDir::new().unwrap();
        let registry = headless_registry();
        let a = registry.open("a", None, dir.path()).await;
        let again = registry.open("a", None, dir.path()).await;
        assert!(Arc::ptr_eq(&a, &again));
        registry.open("b", None, dir.path()).await;

        assert!(registry.add_text_segment("a", "hello").await);
        assert_eq!(registry.get_segments("a").await.unwrap().len(), 1);
        assert!(registry.get_segments("b").await.unwrap().is_empty());
        assert_eq!(registry.panel_ids().await, vec!["a", "b"]);

        assert!(registry.clear_segments("a").await);
        assert!(registry.get_segments("a").await.unwrap().is_empty());
        assert!(registry.get_segments("zzz").await.is_none());
    }

    #[tokio::test]
    async fn test_close_removes_panel() {
        let dir = TempDir::new().unwrap();
        let registry = headless_registry();
        registry.open("a", None, dir.path()).await;
        assert!(registry.close("a").await);
        assert!(!registry.close("a").await);
        assert!(registry.get("a").await.is_none());
        assert!(!registry.request_background("a").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_completion_sweep_reports_once() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(headless_registry());
        let handle = registry.open("p1", None, dir.path()).await;

        let requester = registry.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            requester.request_background("p1").await;
        });
        let result = handle.lock().await.run_command("sleep 0.5; echo finished").await;
        assert_eq!(result.status, panel_runtime_core::ToolStatus::Backgrounded);

        let mut reported = Vec::new();
        for _ in 0..50 {
            reported.extend(registry.check_completed_processes().await);
            if !reported.is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
        assert_eq!(
            reported,
            vec![CompletedProcess {
                panel_id: "p1".into(),
                process_id: "bg_1".into(),
                exit_code: 0,
                command: "sleep 0.5; echo finished".into(),
            }]
        );
        assert!(registry.check_completed_processes().await.is_empty());

        let output = handle.lock().await.get_process_output("bg_1", 50);
        assert!(output.content.contains("finished"));
        assert!(output.content.contains("(stopped)"));
    }
}
