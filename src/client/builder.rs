//! Connection configuration.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::cancel::CancelToken;
use crate::discovery::lockfile::DEFAULT_RESOLVE_TIMEOUT;
use crate::discovery::process::{
    DEFAULT_LOCATE_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_PROCESS_NAME,
};
use crate::error::{Error, Result};

use super::facade::LeagueClient;

// ============================================================================
// Constants
// ============================================================================

/// Default interval between process liveness checks.
const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(2);

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for a [`LeagueClient`] connection.
///
/// The defaults match a stock client install; overrides exist mainly for
/// tests and unusual deployments.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use lcu_connector::LeagueClient;
///
/// # async fn example() -> lcu_connector::Result<()> {
/// let client = LeagueClient::builder()
///     .locate_timeout(Duration::from_secs(120))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Process name to poll for.
    pub(crate) process_name: String,
    /// Interval between process table polls.
    pub(crate) poll_interval: Duration,
    /// Deadline for the process to appear.
    pub(crate) locate_timeout: Duration,
    /// Deadline for the lock file to appear once the process is found.
    pub(crate) lockfile_timeout: Duration,
    /// Interval between process liveness checks after connecting.
    pub(crate) liveness_interval: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            locate_timeout: DEFAULT_LOCATE_TIMEOUT,
            lockfile_timeout: DEFAULT_RESOLVE_TIMEOUT,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }
}

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the process name to poll for.
    #[must_use]
    pub fn process_name(mut self, process_name: impl Into<String>) -> Self {
        self.process_name = process_name.into();
        self
    }

    /// Sets the interval between process table polls.
    #[inline]
    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets the deadline for the process to appear.
    #[inline]
    #[must_use]
    pub fn locate_timeout(mut self, locate_timeout: Duration) -> Self {
        self.locate_timeout = locate_timeout;
        self
    }

    /// Sets the deadline for the lock file to appear.
    #[inline]
    #[must_use]
    pub fn lockfile_timeout(mut self, lockfile_timeout: Duration) -> Self {
        self.lockfile_timeout = lockfile_timeout;
        self
    }

    /// Sets the interval between process liveness checks.
    #[inline]
    #[must_use]
    pub fn liveness_interval(mut self, liveness_interval: Duration) -> Self {
        self.liveness_interval = liveness_interval;
        self
    }

    /// Connects with this configuration.
    ///
    /// Equivalent to [`connect_with_cancel`](Self::connect_with_cancel) with
    /// a token that never fires.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the configuration is invalid
    /// - [`Error::Connect`] wrapping the failing bootstrap phase
    pub async fn connect(self) -> Result<LeagueClient> {
        let (_handle, token) = CancelToken::new();
        self.connect_with_cancel(token).await
    }

    /// Connects with this configuration, abortable through `cancel`.
    ///
    /// # Errors
    ///
    /// Same as [`connect`](Self::connect), plus [`Error::Cancelled`] if the
    /// token fires during discovery or credential resolution.
    pub async fn connect_with_cancel(self, cancel: CancelToken) -> Result<LeagueClient> {
        self.validate()?;
        LeagueClient::bootstrap(self, cancel).await
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<()> {
        if self.process_name.trim().is_empty() {
            return Err(Error::config("process name must not be empty"));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::config("poll interval must be positive"));
        }

        if self.liveness_interval.is_zero() {
            return Err(Error::config("liveness interval must be positive"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
