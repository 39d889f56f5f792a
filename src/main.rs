//! Panel Runtime - headless tool executor
//!
//! Reads one JSON tool call per stdin line (`{"tool": ..., "arguments": {...}}`),
//! runs it against a headless panel and prints the result as one JSON line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use panel_runtime::{ConfigService, PanelToolContext, ToolRegistry, ToolResult};

#[derive(Parser, Debug)]
#[command(
    name = "panel-runtime",
    version,
    about = "Run agent tool calls from stdin against a headless panel"
)]
struct Cli {
    /// Working directory for the panel (defaults to the current directory)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Path to config file (defaults to ~/.panel-runtime/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter; overrides the configured level. RUST_LOG wins over both.
    #[arg(long)]
    log_level: Option<String>,

    /// Print the tool definitions as JSON and exit
    #[arg(long)]
    list_tools: bool,
}

/// One line of input.
#[derive(Debug, Deserialize)]
struct ToolCall {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

fn init_logging(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_service = match &cli.config {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new(),
    }
    .context("failed to load configuration")?;
    let config = config_service.get_config().clone();

    init_logging(cli.log_level.as_deref().unwrap_or(&config.log_level));

    let registry = ToolRegistry::catalogue();
    if cli.list_tools {
        println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        return Ok(());
    }

    let working_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    tracing::info!(
        "[Main] Headless panel in {} (backend: {:?})",
        working_dir.display(),
        config.search_backend
    );
    let mut ctx = PanelToolContext::headless(working_dir).with_settings(config.tool_settings());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let result = match serde_json::from_str::<ToolCall>(&line) {
            Ok(call) => registry.execute(&call.tool, &mut ctx, call.arguments).await,
            Err(e) => ToolResult::err(format!("Invalid tool call: {}", e)),
        };
        for completed in ctx.check_completed_processes() {
            tracing::info!(
                "[Main] {} ({}) exited with {}",
                completed.process_id,
                completed.command,
                completed.exit_code
            );
        }
        let mut out = serde_json::to_vec(&result)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    ctx.shutdown().await;
    Ok(())
}
