//! Process table polling.
//!
//! Finds the running game client by name and resolves its install directory,
//! which is where the credential lock file lives.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use sysinfo::{Pid, Process, ProcessesToUpdate, System};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, trace};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default name of the client UX process.
#[cfg(windows)]
pub const DEFAULT_PROCESS_NAME: &str = "LeagueClientUx.exe";

/// Default name of the client UX process.
#[cfg(not(windows))]
pub const DEFAULT_PROCESS_NAME: &str = "LeagueClientUx";

/// Default interval between process table polls.
pub(crate) const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default deadline for the process to appear.
pub(crate) const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(60);

/// Command-line argument carrying the install directory.
const INSTALL_DIR_ARG: &str = "--install-directory=";

// ============================================================================
// ProcessHandle
// ============================================================================

/// A located client process.
///
/// Becomes stale when the underlying process exits; the facade's liveness
/// monitor detects that and fires the disconnect signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    /// OS process ID.
    pub pid: u32,
    /// Install directory containing the lock file.
    pub install_dir: PathBuf,
}

// ============================================================================
// ProcessLocator
// ============================================================================

/// Polls the OS process table for the client process.
///
/// # Example
///
/// ```no_run
/// use lcu_connector::{CancelToken, ProcessLocator};
///
/// # async fn example() -> lcu_connector::Result<()> {
/// let (_handle, token) = CancelToken::new();
/// let process = ProcessLocator::default().locate(&token).await?;
/// println!("client pid: {}", process.pid);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ProcessLocator {
    /// Process name to match.
    process_name: String,
    /// Interval between polls.
    poll_interval: Duration,
    /// Deadline for the process to appear.
    timeout: Duration,
}

impl Default for ProcessLocator {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESS_NAME)
    }
}

impl ProcessLocator {
    /// Creates a locator for the given process name with default timing.
    #[must_use]
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_LOCATE_TIMEOUT,
        }
    }

    /// Sets the interval between process table polls.
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the deadline for the process to appear.
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polls the process table until the process appears.
    ///
    /// A matching process without a resolvable install directory is skipped
    /// and polling continues; the directory usually becomes resolvable once
    /// the process finishes starting up.
    ///
    /// # Errors
    ///
    /// - [`Error::ProcessNotFound`] if the deadline elapses
    /// - [`Error::Cancelled`] if `cancel` fires; returns within one poll
    ///   interval of the cancellation
    pub async fn locate(&self, cancel: &CancelToken) -> Result<ProcessHandle> {
        let deadline = Instant::now() + self.timeout;
        debug!(
            process_name = %self.process_name,
            timeout_ms = self.timeout.as_millis() as u64,
            "locating client process"
        );

        loop {
            if let Some(handle) = scan(&self.process_name) {
                info!(
                    pid = handle.pid,
                    install_dir = %handle.install_dir.display(),
                    "client process located"
                );
                return Ok(handle);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::process_not_found(
                    &self.process_name,
                    self.timeout.as_millis() as u64,
                ));
            }

            let wait = self.poll_interval.min(deadline - now);
            tokio::select! {
                _ = sleep(wait) => {}
                _ = cancel.cancelled() => {
                    debug!(process_name = %self.process_name, "locate cancelled");
                    return Err(Error::Cancelled);
                }
            }
        }
    }
}

// ============================================================================
// Process Table Queries
// ============================================================================

/// Scans the process table once for a matching process.
fn scan(process_name: &str) -> Option<ProcessHandle> {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    for (pid, process) in sys.processes() {
        if process.name().to_string_lossy() != process_name {
            continue;
        }

        trace!(%pid, "matched process name");

        if let Some(install_dir) = install_dir(process) {
            return Some(ProcessHandle {
                pid: pid.as_u32(),
                install_dir,
            });
        }

        trace!(%pid, "matched process has no resolvable install directory yet");
    }

    None
}

/// Resolves a process's install directory.
///
/// Prefers the `--install-directory=` command-line argument the client is
/// launched with; falls back to the executable's parent directory.
fn install_dir(process: &Process) -> Option<PathBuf> {
    for arg in process.cmd() {
        let arg = arg.to_string_lossy();
        if let Some(dir) = arg.strip_prefix(INSTALL_DIR_ARG) {
            let dir = dir.trim_matches('"');
            if !dir.is_empty() {
                return Some(PathBuf::from(dir));
            }
        }
    }

    process
        .exe()
        .and_then(|exe| exe.parent())
        .map(PathBuf::from)
}

/// Returns `true` if a process with the given PID is still running.
#[must_use]
pub fn is_alive(pid: u32) -> bool {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid).is_some()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::time::timeout;

    #[tokio::test]
    async fn test_locate_times_out_for_missing_process() {
        let (_handle, token) = CancelToken::new();
        let locator = ProcessLocator::new("lcu-connector-no-such-process")
            .with_poll_interval(Duration::from_millis(50))
            .with_timeout(Duration::from_millis(200));

        let err = locator
            .locate(&token)
            .await
            .expect_err("missing process must time out");

        assert!(matches!(err, Error::ProcessNotFound { .. }));
    }

    #[tokio::test]
    async fn test_locate_cancellation_unblocks_promptly() {
        let (handle, token) = CancelToken::new();
        let locator = ProcessLocator::new("lcu-connector-no-such-process")
            .with_poll_interval(Duration::from_millis(100))
            .with_timeout(Duration::from_secs(30));

        let locate = tokio::spawn(async move { locator.locate(&token).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        // Bounded by one poll interval, not the 30s timeout.
        let result = timeout(Duration::from_millis(500), locate)
            .await
            .expect("cancelled locate must return promptly")
            .expect("locate task should not panic");

        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_is_alive_for_current_process() {
        assert!(is_alive(std::process::id()));
    }

    #[test]
    fn test_default_locator_uses_client_process_name() {
        let locator = ProcessLocator::default();
        assert_eq!(locator.process_name, DEFAULT_PROCESS_NAME);
    }
}
