//! Loopback TLS trust policy.
//!
//! The client API serves HTTPS and WSS on `127.0.0.1` with a self-signed
//! certificate, so chain validation can never succeed. [`LoopbackTrust`] is
//! the one place in the crate where validation is disabled, injected into
//! both transports rather than applied as a global setting.
//!
//! This trust decision is scoped to verified-loopback targets only. Do not
//! reuse these constructors for arbitrary hosts.

use std::time::Duration;

use tokio_tungstenite::Connector;

use crate::error::{Error, Result};

// ============================================================================
// LoopbackTrust
// ============================================================================

/// Trust policy accepting the client's self-signed loopback certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopbackTrust(());

impl LoopbackTrust {
    /// Creates the loopback trust policy.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(())
    }

    /// Builds the HTTPS client for the request channel.
    pub(crate) fn http_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::network(format!("failed to build http client: {e}")))
    }

    /// Builds the TLS connector for the WebSocket event stream.
    pub(crate) fn ws_connector(&self) -> Result<Connector> {
        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Connector::NativeTls(tls))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_builds() {
        let trust = LoopbackTrust::new();
        trust
            .http_client(Duration::from_secs(5))
            .expect("client should build");
    }

    #[test]
    fn test_ws_connector_builds() {
        let trust = LoopbackTrust::new();
        let connector = trust.ws_connector().expect("connector should build");
        assert!(matches!(connector, Connector::NativeTls(_)));
    }
}
