//! Capability Probe
//!
//! Detects the fast external lister (`fd`, packaged as `fdfind` on Debian)
//! and searcher (`rg`) once per process. A missing binary is a normal
//! outcome, never an error.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Which external tools are on PATH.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Program name that answered `--version` for the file lister
    pub fd: Option<&'static str>,
    pub rg: bool,
}

static CAPABILITIES: OnceCell<Capabilities> = OnceCell::const_new();

/// Probe results, computed on first use.
pub async fn capabilities() -> Capabilities {
    *CAPABILITIES
        .get_or_init(|| async {
            let fd = if probe("fd").await {
                Some("fd")
            } else if probe("fdfind").await {
                Some("fdfind")
            } else {
                None
            };
            let rg = probe("rg").await;
            let caps = Capabilities { fd, rg };
            tracing::info!("[Capability] fd: {:?}, rg: {}", caps.fd, caps.rg);
            caps
        })
        .await
}

/// Whether `program --version` runs successfully within the probe timeout.
pub async fn probe(program: &str) -> bool {
    let mut cmd = Command::new(program);
    cmd.arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(PROBE_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) => false,
        Err(_) => {
            tracing::debug!("[Capability] {} --version timed out", program);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_false() {
        assert!(!probe("definitely-not-a-real-binary-4c1d").await);
    }

    #[tokio::test]
    async fn test_capabilities_are_cached() {
        let first = capabilities().await;
        let second = capabilities().await;
        assert_eq!(first, second);
    }
}
