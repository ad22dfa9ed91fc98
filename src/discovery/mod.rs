//! Connection bootstrap: process discovery and credential resolution.
//!
//! The client API's port and auth token are not fixed; the game client picks
//! a free port at startup and writes both to a lock file in its install
//! directory. Discovery therefore runs in two steps:
//!
//! 1. [`ProcessLocator`] polls the OS process table until the client process
//!    appears and resolves its install directory.
//! 2. [`lockfile::resolve`] reads and parses the lock file from that
//!    directory, retrying while the client is still writing it.
//!
//! Both steps honor a [`CancelToken`](crate::cancel::CancelToken) and a
//! bounded timeout. Credentials are resolved at most once per connection
//! attempt; a reconnect always re-runs both steps because the port/token
//! pair changes across client launches.

// ============================================================================
// Submodules
// ============================================================================

/// Lock file reading and parsing.
pub mod lockfile;

/// Process table polling.
pub mod process;

// ============================================================================
// Re-exports
// ============================================================================

pub use lockfile::Credentials;
pub use process::{ProcessHandle, ProcessLocator};
