//! High-level client facade.
//!
//! Most programs use only this module: [`LeagueClient::connect`] runs the
//! whole bootstrap (process discovery, credential resolution, channel setup)
//! and hands back one object carrying the request channel, the event stream,
//! and a disconnect signal.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | Connection configuration |
//! | `facade` | Connected client, lifecycle state, liveness monitor |

// ============================================================================
// Submodules
// ============================================================================

/// Connection configuration.
pub mod builder;

/// Connected client facade.
pub mod facade;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use facade::{ConnectionState, DisconnectSignal, LeagueClient};
