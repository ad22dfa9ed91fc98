//! WebSocket event stream.
//!
//! The client API pushes asynchronous notifications over a single secure
//! WebSocket. There is no per-topic subscription at the wire level: the
//! stream subscribes once to the "all events" topic and filters client-side.
//!
//! # Connection Lifecycle
//!
//! ```text
//! Idle -> Connecting -> Subscribing -> Streaming -> Closed
//! ```
//!
//! 1. `EventStream::connect` - TLS handshake with Basic auth
//! 2. Subscription frame `[5,"OnJsonApiEvent"]` sent
//! 3. Read loop dispatches each event frame to matching listeners
//! 4. Socket error or `disconnect()` transitions to `Closed`; there is no
//!    automatic reconnect, since credentials may have changed
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connect, subscribe, and read loop |
//! | `envelope` | Wire frame parsing into typed envelopes |
//! | `subscription` | Listener registry and topic matching |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and read loop.
pub mod connection;

/// Wire frame parsing.
pub mod envelope;

/// Listener registry and topic matching.
pub mod subscription;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{EventStream, StreamState};
pub use envelope::{EventEnvelope, PayloadKind};
