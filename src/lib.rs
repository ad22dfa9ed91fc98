//! LCU connector - Local client API connector for League of Legends.
//!
//! This library connects to the API the game client hosts on loopback:
//! it finds the running client process, reads the rotating credentials
//! from the client's lock file, and opens two authenticated channels over
//! the client's self-signed TLS endpoint.
//!
//! # Architecture
//!
//! A connection is bootstrapped in phases:
//!
//! 1. **Discovery**: poll the process table for the client process and
//!    resolve its install directory
//! 2. **Authentication**: read port and token from the lock file, retrying
//!    while the client is still writing it
//! 3. **Channels**: an HTTPS request channel plus a WebSocket event stream,
//!    both using Basic auth with the resolved token
//!
//! Key design principles:
//!
//! - Credentials rotate with every client launch, so they are resolved per
//!   connection attempt and never cached across reconnects
//! - One wire subscription carries all events; topic filtering is client-side
//! - No automatic reconnect: a dead connection fires a one-shot
//!   [`DisconnectSignal`] and the caller decides what happens next
//!
//! # Quick Start
//!
//! ```no_run
//! use lcu_connector::{LeagueClient, Method, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Waits for the client process, then authenticates
//!     let client = LeagueClient::connect().await?;
//!
//!     // Push notifications, filtered by topic pattern
//!     client.on("/lol-gameflow/*", |event| {
//!         println!("{} {}: {}", event.kind, event.topic, event.data);
//!     })?;
//!
//!     // Request/response
//!     let response = client
//!         .request()?
//!         .send(Method::GET, "/lol-summoner/v1/current-summoner", &[])
//!         .await?;
//!     println!("{}", response.body);
//!
//!     // Resolves when the client exits or the socket drops
//!     client.disconnected().wait().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cancel`] | Caller-initiated cancellation of bootstrap waits |
//! | [`client`] | High-level facade: [`LeagueClient`], builder, lifecycle |
//! | [`discovery`] | Process discovery and lock-file credential resolution |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`http`] | Authenticated HTTPS request channel |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`tls`] | Loopback trust policy for the self-signed endpoint |
//! | [`ws`] | WebSocket event stream (internal wire handling) |

// ============================================================================
// Modules
// ============================================================================

/// Caller-initiated cancellation.
///
/// A [`CancelToken`] unblocks the long bootstrap waits (process discovery,
/// lock file resolution) before their timeouts.
pub mod cancel;

/// High-level client facade.
///
/// Use [`LeagueClient::connect()`] or [`LeagueClient::builder()`].
pub mod client;

/// Connection bootstrap: process discovery and credential resolution.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Authenticated HTTPS request channel.
pub mod http;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Loopback trust policy.
///
/// The client API presents a self-signed certificate; this module scopes
/// the decision to accept it.
pub mod tls;

/// WebSocket event stream.
///
/// Internal module handling the wire subscription and frame dispatch.
pub mod ws;

// ============================================================================
// Re-exports
// ============================================================================

// Facade types
pub use client::{ClientBuilder, ConnectionState, DisconnectSignal, LeagueClient};

// Bootstrap types
pub use cancel::{CancelHandle, CancelToken};
pub use discovery::{Credentials, ProcessHandle, ProcessLocator};
pub use tls::LoopbackTrust;

// Request channel types
pub use http::{ApiResponse, Method, RequestClient};

// Event stream types
pub use ws::{EventEnvelope, EventStream, PayloadKind, StreamState};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::SubscriptionId;
