//! Process Group Termination
//!
//! Shell commands run in their own process group so that signals reach
//! everything the shell started. Never signal our own group.

use std::io;
use std::time::Duration;

use tokio::process::Child;

#[cfg(unix)]
fn signal_process_group(process_group_id: u32, signal: libc::c_int) -> io::Result<()> {
    use std::io::ErrorKind;

    let pgid = process_group_id as libc::pid_t;
    let self_pgid = unsafe { libc::getpgrp() };
    if pgid == self_pgid {
        return Ok(());
    }

    let result = unsafe { libc::killpg(pgid, signal) };
    if result == -1 {
        let err = io::Error::last_os_error();
        // ESRCH: the group already exited
        if err.kind() != ErrorKind::NotFound && err.raw_os_error() != Some(libc::ESRCH) {
            return Err(err);
        }
    }

    Ok(())
}

/// Ask the child's process group to exit (SIGTERM on Unix).
pub fn terminate(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            return signal_process_group(pid, libc::SIGTERM);
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        child.start_kill()
    }
}

/// Kill the child's process group outright.
pub fn kill(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            signal_process_group(pid, libc::SIGKILL)?;
        }
    }
    match child.start_kill() {
        Ok(()) => Ok(()),
        // Already reaped
        Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
        Err(e) => Err(e),
    }
}

/// Terminate gracefully, then force-kill if the child is still alive after
/// `grace`. Returns the exit code when one was observed.
pub async fn shutdown(child: &mut Child, grace: Duration) -> Option<i32> {
    if let Ok(Some(status)) = child.try_wait() {
        return Some(exit_code(status));
    }

    if let Err(e) = terminate(child) {
        tracing::warn!("[ProcessSignal] SIGTERM failed: {}", e);
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => Some(exit_code(status)),
        Ok(Err(e)) => {
            tracing::warn!("[ProcessSignal] wait failed: {}", e);
            None
        }
        Err(_) => {
            tracing::info!("[ProcessSignal] Child ignored SIGTERM for {:?}, killing", grace);
            if let Err(e) = kill(child) {
                tracing::warn!("[ProcessSignal] kill failed: {}", e);
            }
            child.wait().await.ok().map(exit_code)
        }
    }
}

/// Exit code of a finished process; a negative signal number when the
/// process was killed by a signal.
pub fn exit_code(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::process::Stdio;
    use tokio::process::Command;

    fn spawn_in_group(script: &str) -> Child {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(script)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .kill_on_drop(true);
        cmd.spawn().unwrap()
    }

    #[tokio::test]
    async fn test_shutdown_terminates_sleeping_child() {
        let mut child = spawn_in_group("sleep 30");
        let code = shutdown(&mut child, Duration::from_secs(5)).await;
        assert_eq!(code, Some(-libc::SIGTERM));
    }

    #[tokio::test]
    async fn test_shutdown_escalates_when_term_is_ignored() {
        let mut child = spawn_in_group("trap '' TERM; sleep 30");
        // Give the shell a moment to install the trap
        tokio::time::sleep(Duration::from_millis(200)).await;
        let code = shutdown(&mut child, Duration::from_millis(300)).await;
        assert_eq!(code, Some(-libc::SIGKILL));
    }

    #[tokio::test]
    async fn test_shutdown_on_exited_child_reports_code() {
        let mut child = spawn_in_group("exit 3");
        child.wait().await.unwrap();
        assert_eq!(shutdown(&mut child, Duration::from_secs(1)).await, Some(3));
    }
}
