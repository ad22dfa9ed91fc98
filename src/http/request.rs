//! Request construction and execution.
//!
//! Mirrors the host protocol's expectations: Basic auth on every request,
//! `application/json` only when a body is actually present, and raw query
//! parameters joined verbatim (the host treats them as pre-encoded).

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use tracing::{debug, trace};

use crate::discovery::Credentials;
use crate::error::{Error, Result};
use crate::tls::LoopbackTrust;

// ============================================================================
// Constants
// ============================================================================

/// Fixed Basic-auth username expected by the client API.
pub const AUTH_USERNAME: &str = "riot";

/// Client-wide request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON content type for request bodies.
const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// ApiResponse
// ============================================================================

/// A successful (2xx) response from the client API.
///
/// The body is raw text; endpoint wrappers deserialize it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

// ============================================================================
// RequestClient
// ============================================================================

/// Authenticated HTTPS channel to the client API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct RequestClient {
    /// Base URL, `https://127.0.0.1:<port>` with no trailing slash.
    base_url: String,
    /// Basic-auth password.
    token: String,
    /// Underlying HTTP client with the loopback trust policy applied.
    http: reqwest::Client,
}

impl RequestClient {
    /// Creates a request channel for the resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(trust: &LoopbackTrust, credentials: &Credentials) -> Result<Self> {
        let http = trust.http_client(REQUEST_TIMEOUT)?;

        Ok(Self {
            base_url: format!("https://127.0.0.1:{}", credentials.port),
            token: credentials.token.clone(),
            http,
        })
    }

    /// Test seam: channel against an arbitrary base URL.
    #[cfg(test)]
    pub(crate) fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            base_url,
            token: token.into(),
            http,
        }
    }

    /// Sends a bodyless request.
    ///
    /// No body means no `Content-Type` header at all, which the host
    /// distinguishes from an empty JSON object body.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - Relative path, e.g. `/lol-summoner/v1/current-summoner`
    /// * `query` - Raw `key=value` entries; blank entries are dropped
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the request times out
    /// - [`Error::Network`] on transport failure
    /// - [`Error::Http`] for non-2xx responses
    pub async fn send(&self, method: Method, path: &str, query: &[&str]) -> Result<ApiResponse> {
        self.execute(method, path, query, None).await
    }

    /// Sends a request with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send), plus [`Error::Json`] if the body fails
    /// to serialize.
    pub async fn send_with_body<B>(
        &self,
        method: Method,
        path: &str,
        query: &[&str],
        body: &B,
    ) -> Result<ApiResponse>
    where
        B: Serialize + ?Sized,
    {
        let json = serde_json::to_string(body)?;
        self.execute(method, path, query, Some(json)).await
    }

    /// Executes a prepared request.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[&str],
        body: Option<String>,
    ) -> Result<ApiResponse> {
        let url = self.build_url(path, query);
        trace!(%method, %url, has_body = body.is_some(), "sending request");

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(AUTH_USERNAME, Some(&self.token));

        if let Some(json) = body {
            request = request.header(CONTENT_TYPE, JSON_CONTENT_TYPE).body(json);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let text = response.text().await.map_err(map_transport_error)?;

        if !status.is_success() {
            debug!(%url, status = status.as_u16(), "request rejected");
            return Err(Error::http(status.as_u16(), text));
        }

        Ok(ApiResponse {
            status: status.as_u16(),
            body: text,
        })
    }

    /// Builds the full request URL.
    fn build_url(&self, path: &str, query: &[&str]) -> String {
        let path = path.trim_start_matches('/');
        format!("{}/{}{}", self.base_url, path, build_query_string(query))
    }
}

// ============================================================================
// Query String Construction
// ============================================================================

/// Joins non-blank query parameters into a `?a=1&b=2` suffix.
///
/// Blank or whitespace-only entries are dropped; if nothing remains, no `?`
/// is appended. Entries are taken verbatim, pre-encoded by the caller.
pub(crate) fn build_query_string(params: &[&str]) -> String {
    let kept: Vec<&str> = params
        .iter()
        .copied()
        .filter(|p| !p.trim().is_empty())
        .collect();

    if kept.is_empty() {
        String::new()
    } else {
        format!("?{}", kept.join("&"))
    }
}

/// Classifies a reqwest transport failure.
fn map_transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::timeout("http request", REQUEST_TIMEOUT.as_millis() as u64)
    } else {
        Error::network(e.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
