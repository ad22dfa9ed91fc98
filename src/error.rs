//! Error types for the LCU connector.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use lcu_connector::{LeagueClient, Result};
//!
//! async fn example() -> Result<()> {
//!     let client = LeagueClient::connect().await?;
//!     client.request()?.send(Method::GET, "/riotclient/region-locale", &[]).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Discovery | [`Error::ProcessNotFound`], [`Error::LockFile`] |
//! | Request path | [`Error::Network`], [`Error::Timeout`], [`Error::Http`] |
//! | Event path | [`Error::Socket`], [`Error::Protocol`], [`Error::WebSocket`] |
//! | Lifecycle | [`Error::Connect`], [`Error::ConnectionClosed`], [`Error::Cancelled`] |
//! | External | [`Error::Json`], [`Error::Tls`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when builder configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// The client process never appeared in the process table.
    #[error("Process {process_name} not found after {timeout_ms}ms")]
    ProcessNotFound {
        /// Name of the process that was polled for.
        process_name: String,
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
    },

    /// Lock file missing past its deadline, malformed, or unreadable.
    ///
    /// A malformed lock file is never retried; it indicates an
    /// incompatible client version, not a timing race.
    #[error("Lock file error: {message}")]
    LockFile {
        /// Description of the lock file problem.
        message: String,
    },

    // ========================================================================
    // Request Path Errors
    // ========================================================================
    /// Transport failure on the HTTPS request path.
    #[error("Network error: {message}")]
    Network {
        /// Description of the transport failure.
        message: String,
    },

    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Non-2xx HTTP status from the client API.
    #[error("HTTP error {status}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body, if any.
        body: String,
    },

    // ========================================================================
    // Event Path Errors
    // ========================================================================
    /// WebSocket-level failure on the event stream.
    #[error("Socket error: {message}")]
    Socket {
        /// Description of the socket failure.
        message: String,
    },

    /// Malformed event frame or protocol violation.
    ///
    /// Protocol errors terminate the event stream; they are never retried.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A connection bootstrap phase failed.
    ///
    /// Wraps the specific underlying error; inspect [`std::error::Error::source`]
    /// or match on `source` for the precise kind.
    #[error("Connect failed during {phase}: {source}")]
    Connect {
        /// Bootstrap phase that failed.
        phase: &'static str,
        /// The underlying error.
        source: Box<Error>,
    },

    /// Operation attempted on a connection that is not live.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Operation aborted by caller-initiated cancellation.
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// TLS connector construction error.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a process not found error.
    #[inline]
    pub fn process_not_found(process_name: impl Into<String>, timeout_ms: u64) -> Self {
        Self::ProcessNotFound {
            process_name: process_name.into(),
            timeout_ms,
        }
    }

    /// Creates a lock file error.
    #[inline]
    pub fn lock_file(message: impl Into<String>) -> Self {
        Self::LockFile {
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[inline]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Creates an HTTP status error.
    #[inline]
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Creates a socket error.
    #[inline]
    pub fn socket(message: impl Into<String>) -> Self {
        Self::Socket {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Wraps a bootstrap-phase failure.
    ///
    /// [`Error::Cancelled`] passes through unwrapped so cancellation stays
    /// distinguishable from connection failure.
    #[inline]
    pub fn connect(phase: &'static str, source: Error) -> Self {
        match source {
            Self::Cancelled => Self::Cancelled,
            source => Self::Connect {
                phase,
                source: Box::new(source),
            },
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` if this error originated on the event path.
    #[inline]
    #[must_use]
    pub fn is_event_error(&self) -> bool {
        matches!(
            self,
            Self::Socket { .. } | Self::Protocol { .. } | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a bootstrap failure.
    #[inline]
    #[must_use]
    pub fn is_connect_error(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Returns the HTTP status code if this is an [`Error::Http`].
    #[inline]
    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::lock_file("wrong field count");
        assert_eq!(err.to_string(), "Lock file error: wrong field count");
    }

    #[test]
    fn test_process_not_found_display() {
        let err = Error::process_not_found("LeagueClientUx", 60_000);
        assert_eq!(
            err.to_string(),
            "Process LeagueClientUx not found after 60000ms"
        );
    }

    #[test]
    fn test_connect_wraps_source() {
        let err = Error::connect("credential resolution", Error::lock_file("bad"));
        assert!(err.is_connect_error());
        assert!(err.to_string().contains("credential resolution"));

        match err {
            Error::Connect { source, .. } => {
                assert!(matches!(*source, Error::LockFile { .. }));
            }
            _ => panic!("expected Connect variant"),
        }
    }

    #[test]
    fn test_connect_passes_cancellation_through() {
        let err = Error::connect("process discovery", Error::Cancelled);
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::timeout("http request", 30_000);
        let other_err = Error::network("refused");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_event_error() {
        assert!(Error::socket("reset").is_event_error());
        assert!(Error::protocol("bad frame").is_event_error());
        assert!(!Error::network("refused").is_event_error());
    }

    #[test]
    fn test_http_status() {
        let err = Error::http(404, "not found");
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(Error::ConnectionClosed.http_status(), None);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
