//! Fast Backend
//!
//! Lists with `fd` and searches with `rg`. Both run with the working
//! directory as cwd and a relative path argument, so their output already
//! uses working-directory-relative paths (minus a leading `./`).

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use panel_runtime_core::{CoreError, CoreResult};

use super::{relative_arg, ListRequest, OutputMode, SearchBackend, SearchRequest, IGNORED_DIRS};

#[derive(Debug, Clone)]
pub struct FastBackend {
    fd_program: String,
    rg_program: String,
}

impl FastBackend {
    /// `fd_program` is `fd` or `fdfind`, whichever the probe found.
    pub fn new(fd_program: impl Into<String>) -> Self {
        Self::with_programs(fd_program, "rg")
    }

    pub fn with_programs(fd_program: impl Into<String>, rg_program: impl Into<String>) -> Self {
        Self {
            fd_program: fd_program.into(),
            rg_program: rg_program.into(),
        }
    }

    pub fn fd_args(request: &ListRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--type".into(),
            "f".into(),
            "--color".into(),
            "never".into(),
            "--case-sensitive".into(),
            "--glob".into(),
        ];
        for dir in IGNORED_DIRS {
            args.push("--exclude".into());
            args.push((*dir).to_string());
        }
        args.push("--".into());
        args.push(request.name_glob());
        args.push(relative_arg(&request.working_dir, &request.base));
        args
    }

    pub fn rg_args(request: &SearchRequest) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "--color=never".into(),
            "-i".into(),
            "--sort".into(),
            "path".into(),
            "--with-filename".into(),
        ];

        match request.output_mode {
            OutputMode::FilesWithMatches => args.push("--files-with-matches".into()),
            OutputMode::Count => args.push("--count".into()),
            OutputMode::Content => {
                args.push("--line-number".into());
                args.push("--no-heading".into());
            }
        }

        if request.multiline {
            args.push("-U".into());
            args.push("--multiline-dotall".into());
        }

        if request.output_mode == OutputMode::Content {
            if request.context_before > 0 {
                args.push("-B".into());
                args.push(request.context_before.to_string());
            }
            if request.context_after > 0 {
                args.push("-A".into());
                args.push(request.context_after.to_string());
            }
        }

        if let Some(file_type) = request.file_type.as_deref().filter(|t| !t.is_empty()) {
            args.push("--type".into());
            args.push(file_type.to_string());
        }
        if request.file_pattern != "*" && !request.file_pattern.is_empty() {
            args.push("--glob".into());
            args.push(request.file_pattern.clone());
        }
        for dir in IGNORED_DIRS {
            args.push("--glob".into());
            args.push(format!("!{}", dir));
        }

        args.push("--regexp".into());
        args.push(request.pattern.clone());
        args.push("--".into());
        args.push(relative_arg(&request.working_dir, &request.base));
        args
    }
}

/// Run an external tool until `deadline`. Returns its stdout lines when it
/// succeeded or produced output; `ok_codes` lists extra non-error exit codes.
async fn run_tool(
    program: &str,
    args: &[String],
    cwd: &Path,
    deadline: Instant,
    ok_codes: &[i32],
) -> CoreResult<Vec<String>> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let started = Instant::now();
    let remaining = deadline.saturating_duration_since(started);
    let output = match tokio::time::timeout(remaining, cmd.output()).await {
        Ok(result) => result?,
        Err(_) => return Err(CoreError::Timeout(remaining.as_secs())),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<String> = stdout
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| line.strip_prefix("./").unwrap_or(line).to_string())
        .collect();

    let code = output.status.code();
    let accepted = output.status.success() || code.map(|c| ok_codes.contains(&c)).unwrap_or(false);
    if accepted || !lines.is_empty() {
        return Ok(lines);
    }

    Err(CoreError::internal(format!(
        "{} exited with {:?}: {}",
        program,
        code,
        String::from_utf8_lossy(&output.stderr).trim()
    )))
}

#[async_trait]
impl SearchBackend for FastBackend {
    fn list_label(&self) -> &'static str {
        "fd"
    }

    fn search_label(&self) -> &'static str {
        "rg"
    }

    async fn list_files(&self, request: &ListRequest, deadline: Instant) -> CoreResult<Vec<String>> {
        let args = Self::fd_args(request);
        run_tool(&self.fd_program, &args, &request.working_dir, deadline, &[]).await
    }

    async fn search(&self, request: &SearchRequest, deadline: Instant) -> CoreResult<Vec<String>> {
        let args = Self::rg_args(request);
        // rg exits 1 when nothing matched
        run_tool(&self.rg_program, &args, &request.working_dir, deadline, &[1]).await
    }
}
