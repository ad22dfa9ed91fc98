//! Lock file reading and parsing.
//!
//! The client writes a single-line lock file to its install directory at
//! startup:
//!
//! ```text
//! LeagueClient:12345:54321:opaque-token:https
//! ```
//!
//! Fields are colon-separated: process name, PID, API port, auth token, and
//! protocol. Only the port and token matter here; extra trailing fields are
//! ignored. The file races the process becoming visible, so a missing file
//! is retried with a bounded deadline while a malformed file fails
//! immediately: wrong contents mean an incompatible client version, not a
//! timing race.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

use tokio::fs;
use tokio::time::{Instant, sleep};
use tracing::{debug, trace};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Fixed name of the credentials file in the install directory.
pub(crate) const LOCKFILE_NAME: &str = "lockfile";

/// Default deadline for the lock file to appear.
pub(crate) const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between read attempts while the file is missing.
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Minimum colon-separated fields in a well-formed lock file.
const MIN_FIELDS: usize = 4;

/// Zero-based index of the port field.
const PORT_FIELD: usize = 2;

/// Zero-based index of the token field.
const TOKEN_FIELD: usize = 3;

// ============================================================================
// Credentials
// ============================================================================

/// Resolved connection credentials.
///
/// Immutable once resolved and never persisted. Both the HTTPS request
/// channel and the WebSocket event stream are built from the same instance.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// API port chosen by the client at startup.
    pub port: u16,
    /// Opaque auth token, used as the Basic-auth password.
    pub token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("port", &self.port)
            .field("token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Reads and parses the lock file under `install_dir`.
///
/// Retries while the file does not exist yet, up to `timeout`. Parse
/// failures and non-`NotFound` I/O errors are fatal and never retried.
///
/// # Errors
///
/// - [`Error::LockFile`] if the file is malformed, unreadable, or absent
///   past the deadline
/// - [`Error::Cancelled`] if `cancel` fires mid-retry
pub async fn resolve(
    install_dir: &Path,
    timeout: Duration,
    cancel: &CancelToken,
) -> Result<Credentials> {
    let path = install_dir.join(LOCKFILE_NAME);
    let deadline = Instant::now() + timeout;
    debug!(path = %path.display(), "resolving credentials");

    loop {
        match fs::read_to_string(&path).await {
            Ok(contents) => {
                let credentials = parse(&contents)?;
                debug!(port = credentials.port, "credentials resolved");
                return Ok(credentials);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %path.display(), "lock file not written yet");
            }
            Err(e) => {
                return Err(Error::lock_file(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::lock_file(format!(
                "lock file did not appear at {} within {}ms",
                path.display(),
                timeout.as_millis()
            )));
        }

        let wait = RETRY_INTERVAL.min(deadline - now);
        tokio::select! {
            _ = sleep(wait) => {}
            _ = cancel.cancelled() => {
                debug!("credential resolution cancelled");
                return Err(Error::Cancelled);
            }
        }
    }
}

/// Parses lock file contents into [`Credentials`].
pub(crate) fn parse(contents: &str) -> Result<Credentials> {
    let line = contents.trim();
    let fields: Vec<&str> = line.split(':').collect();

    if fields.len() < MIN_FIELDS {
        return Err(Error::lock_file(format!(
            "expected at least {MIN_FIELDS} colon-separated fields, found {}",
            fields.len()
        )));
    }

    let port: u16 = fields[PORT_FIELD].parse().map_err(|_| {
        Error::lock_file(format!("port field is not a valid port: {:?}", fields[PORT_FIELD]))
    })?;

    if port == 0 {
        return Err(Error::lock_file("port field must be non-zero"));
    }

    let token = fields[TOKEN_FIELD];
    if token.is_empty() {
        return Err(Error::lock_file("token field is empty"));
    }

    Ok(Credentials {
        port,
        token: token.to_string(),
    })
}

// ============================================================================
// Tests
// ============================================================================
