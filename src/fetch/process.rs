//! Process-group handling for backend child processes
//!
//! yt-dlp starts its own children (ffmpeg for merging and transcoding).
//! `kill_on_drop` only reaches yt-dlp itself, so the backend is started as the
//! leader of a new process group and the whole group is killed when the fetch
//! ends, however it ends.

use std::ffi::OsStr;
use tokio::process::Command;

/// Create a `tokio::process::Command` that runs in its own process group on Unix.
///
/// On other targets this is a plain command with `kill_on_drop` set.
pub(crate) fn group_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Kills a process group when dropped
///
/// Held for as long as the child runs. Dropping it (normal return, timeout,
/// cancellation) sends `SIGKILL` to every process still in the group.
#[derive(Debug)]
pub(crate) struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    /// Guard the group led by `pid` (the value of `Child::id()`)
    pub(crate) fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        let Some(pgid) = self.pgid.take() else {
            return;
        };
        kill_group(pgid);
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    if pgid <= 1 {
        return;
    }

    // SAFETY: killpg takes plain integers and touches no memory. pgid is the
    // id of a group this process created with process_group(0).
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        // ESRCH: every member already exited
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "failed to kill backend process group");
        }
    } else {
        tracing::debug!(pgid, "backend process group killed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn dropping_guard_kills_the_group() {
        let mut child = group_command("sh")
            .arg("-c")
            .arg("sleep 30 & exec sleep 30")
            .spawn()
            .unwrap();
        let guard = ProcessGroupGuard::new(child.id());

        drop(guard);
        let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
            .await
            .expect("leader should die with its group")
            .unwrap();
        assert!(!status.success());
    }

    #[test]
    fn guard_without_pid_is_inert() {
        drop(ProcessGroupGuard::new(None));
    }
}
