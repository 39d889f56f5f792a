//! Backend Equivalence Tests
//!
//! The same list and search requests must give identical results through
//! the real fd/rg and through the in-process walker. Skipped when the
//! binaries are not installed; the fast backend's unit tests cover the
//! same comparison with stub binaries.

use std::path::Path;

use tempfile::TempDir;

use panel_runtime::services::search::capabilities;
use panel_runtime::services::tools::SearchParams;
use panel_runtime::{PanelToolContext, SearchBackendKind, ToolSettings};

fn panel(dir: &Path, backend: SearchBackendKind) -> PanelToolContext {
    PanelToolContext::headless(dir).with_settings(ToolSettings {
        search_backend: backend,
        ..ToolSettings::default()
    })
}

fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for sub in ["src/util", "docs", "node_modules/pkg", ".hidden"] {
        std::fs::create_dir_all(root.join(sub)).unwrap();
    }
    std::fs::write(
        root.join("src/main.rs"),
        "fn main() {\n    // TODO wire config\n    run();\n}\n",
    )
    .unwrap();
    std::fs::write(
        root.join("src/util/mod.rs"),
        "pub fn run() {\n    println!(\"todo\");\n}\n",
    )
    .unwrap();
    std::fs::write(root.join("docs/notes.md"), "Todo list\n\nnothing here\n").unwrap();
    std::fs::write(root.join("node_modules/pkg/index.js"), "// TODO vendored\n").unwrap();
    std::fs::write(root.join(".hidden/secret.rs"), "// TODO hidden\n").unwrap();
    dir
}

async fn fast_tools_available() -> bool {
    let caps = capabilities().await;
    caps.fd.is_some() && caps.rg
}

#[tokio::test]
async fn test_list_files_matches_across_backends() {
    if !fast_tools_available().await {
        eprintln!("fd/rg not installed; skipping");
        return;
    }
    let dir = fixture();
    let mut fast = panel(dir.path(), SearchBackendKind::Fast);
    let mut portable = panel(dir.path(), SearchBackendKind::Portable);

    for (pattern, path) in [("*.rs", "."), ("**/*", "."), ("*.rs", "src"), ("*.md", "docs")] {
        let a = fast.list_files(pattern, path).await;
        let b = portable.list_files(pattern, path).await;
        assert_eq!(a.content, b.content, "list_files({}, {})", pattern, path);
    }

    let all = portable.list_files("**/*", ".").await;
    assert!(!all.content.contains("node_modules"));
    assert!(!all.content.contains(".hidden"));
}

#[tokio::test]
async fn test_search_files_matches_across_backends() {
    if !fast_tools_available().await {
        eprintln!("fd/rg not installed; skipping");
        return;
    }
    let dir = fixture();
    let mut fast = panel(dir.path(), SearchBackendKind::Fast);
    let mut portable = panel(dir.path(), SearchBackendKind::Portable);

    let mut requests = Vec::new();
    requests.push(SearchParams::new("todo"));
    let mut rust_only = SearchParams::new("todo");
    rust_only.file_pattern = "*.rs".into();
    requests.push(rust_only);
    let files_mode: SearchParams = serde_json::from_value(
        serde_json::json!({"pattern": "todo", "output_mode": "files_with_matches"}),
    )
    .unwrap();
    requests.push(files_mode);
    let count_mode: SearchParams =
        serde_json::from_value(serde_json::json!({"pattern": "run", "output_mode": "count"}))
            .unwrap();
    requests.push(count_mode);
    let mut with_context = SearchParams::new("todo");
    with_context.context = 1;
    requests.push(with_context);

    for params in requests {
        let label = format!("{:?}", params);
        let a = fast.search_files(params.clone()).await;
        let b = portable.search_files(params).await;
        assert_eq!(a.content, b.content, "search_files {}", label);
    }
}
