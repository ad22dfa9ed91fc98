//! Authenticated HTTPS request channel.
//!
//! Every call to the client API goes through [`RequestClient`]: Basic auth
//! with the resolved token, JSON bodies, and the loopback trust policy from
//! [`crate::tls`]. Downstream endpoint wrappers deserialize the raw response
//! text themselves; this layer stays payload-agnostic.

// ============================================================================
// Submodules
// ============================================================================

/// Request construction and execution.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use request::{ApiResponse, AUTH_USERNAME, RequestClient};

/// HTTP method re-export for callers of [`RequestClient::send`].
pub use reqwest::Method;
