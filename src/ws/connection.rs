//! WebSocket connection and read loop.
//!
//! This module owns the persistent event channel: the authenticated TLS
//! handshake, the one-time subscription frame, and the read loop that
//! demultiplexes inbound frames to registered listeners.
//!
//! # Read Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Inbound frames (parsed via [`super::envelope`], dispatched in wire order)
//! - Shutdown commands from the caller API
//! - Cleanup on socket error: listeners drained, closed signal raised
//!
//! There is no automatic reconnect; a fresh connection attempt must re-run
//! the whole bootstrap because credentials may have changed.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};
use tracing::{debug, error, trace, warn};

use crate::discovery::Credentials;
use crate::error::{Error, Result};
use crate::http::AUTH_USERNAME;
use crate::identifiers::SubscriptionId;
use crate::tls::LoopbackTrust;

use super::envelope::{self, EventEnvelope};
use super::subscription::ListenerRegistry;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for the WebSocket handshake.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the read loop drains frames after sending a close.
const CLOSE_DRAIN: Duration = Duration::from_secs(2);

/// How long `disconnect()` waits for a graceful close before aborting.
const CLOSE_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Write half of the event socket.
type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of the event socket.
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Internal commands for the read loop.
enum StreamCommand {
    /// Close the socket gracefully.
    Shutdown,
}

// ============================================================================
// StreamState
// ============================================================================

/// Lifecycle state of the event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No connection attempt yet.
    Idle,
    /// TLS/WebSocket handshake in progress.
    Connecting,
    /// Handshake done, subscription frame sent, read loop not yet running.
    Subscribing,
    /// Read loop running; events flowing.
    Streaming,
    /// Socket closed; terminal.
    Closed,
}

// ============================================================================
// EventStream
// ============================================================================

/// Persistent WebSocket event channel to the client API.
///
/// Listeners registered before streaming begins simply activate with the
/// first frame; registration after [`StreamState::Closed`] fails.
///
/// # Thread Safety
///
/// `EventStream` is `Send + Sync`; clones share the same connection.
pub struct EventStream {
    /// Channel for sending commands to the read loop.
    command_tx: mpsc::UnboundedSender<StreamCommand>,
    /// Listener registry (shared with the read loop).
    registry: Arc<ListenerRegistry>,
    /// Lifecycle state (shared with the read loop).
    state: Arc<Mutex<StreamState>>,
    /// Raised exactly once when the read loop terminates.
    closed_rx: watch::Receiver<bool>,
    /// Read loop task, for forced abort on close timeout.
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Clone for EventStream {
    fn clone(&self) -> Self {
        Self {
            command_tx: self.command_tx.clone(),
            registry: Arc::clone(&self.registry),
            state: Arc::clone(&self.state),
            closed_rx: self.closed_rx.clone(),
            task: Arc::clone(&self.task),
        }
    }
}

impl EventStream {
    /// Connects to `wss://127.0.0.1:<port>/` and subscribes to all events.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if the handshake stalls
    /// - [`Error::WebSocket`] on handshake failure
    /// - [`Error::Tls`] if the loopback connector cannot be built
    pub async fn connect(trust: &LoopbackTrust, credentials: &Credentials) -> Result<Self> {
        let url = format!("wss://127.0.0.1:{}/", credentials.port);
        let authorization = basic_authorization(&credentials.token);
        let connector = trust.ws_connector()?;

        Self::connect_url(&url, Some(authorization), Some(connector)).await
    }

    /// Connects to an explicit URL.
    ///
    /// Split out from [`connect`](Self::connect) so tests can target a
    /// plaintext `ws://` mock host.
    pub(crate) async fn connect_url(
        url: &str,
        authorization: Option<String>,
        connector: Option<Connector>,
    ) -> Result<Self> {
        let state = Arc::new(Mutex::new(StreamState::Idle));
        *state.lock() = StreamState::Connecting;

        let mut request = url.into_client_request()?;
        if let Some(authorization) = authorization {
            let value = HeaderValue::from_str(&authorization)
                .map_err(|e| Error::socket(format!("invalid authorization header: {e}")))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let handshake = connect_async_tls_with_config(request, None, false, connector);
        let (ws_stream, _response) = timeout(HANDSHAKE_TIMEOUT, handshake)
            .await
            .map_err(|_| {
                Error::timeout("websocket handshake", HANDSHAKE_TIMEOUT.as_millis() as u64)
            })??;
        debug!(url, "websocket connected");

        *state.lock() = StreamState::Subscribing;
        let (mut ws_write, ws_read) = ws_stream.split();
        ws_write
            .send(Message::Text(envelope::subscribe_frame().into()))
            .await?;
        trace!(topic = envelope::ALL_EVENTS_TOPIC, "subscription frame sent");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let registry = Arc::new(ListenerRegistry::new());
        let (closed_tx, closed_rx) = watch::channel(false);

        let task = tokio::spawn(Self::run_read_loop(
            ws_write,
            ws_read,
            command_rx,
            Arc::clone(&registry),
            Arc::clone(&state),
            closed_tx,
        ));

        Ok(Self {
            command_tx,
            registry,
            state,
            closed_rx,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    /// Registers a listener for topics matching `pattern`.
    ///
    /// Patterns are exact topics, a trailing-`*` prefix wildcard, or `*`
    /// for everything. Matching envelopes are delivered in wire order.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] once the stream has closed.
    pub fn on<F>(&self, pattern: impl Into<String>, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        if self.state() == StreamState::Closed {
            return Err(Error::ConnectionClosed);
        }

        let id = self.registry.insert(pattern.into(), Arc::new(handler));
        trace!(%id, "listener registered");
        Ok(id)
    }

    /// Removes a listener. Returns `false` if the handle was unknown.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> StreamState {
        *self.state.lock()
    }

    /// Watch channel raised exactly once when the stream closes.
    pub(crate) fn closed(&self) -> watch::Receiver<bool> {
        self.closed_rx.clone()
    }

    /// Closes the stream gracefully.
    ///
    /// Sends a close frame and waits up to a bounded grace period for the
    /// close handshake; after that the read loop is aborted outright.
    /// Idempotent.
    pub async fn disconnect(&self) {
        if self.state() == StreamState::Closed {
            return;
        }

        let _ = self.command_tx.send(StreamCommand::Shutdown);

        let mut closed = self.closed_rx.clone();
        if *closed.borrow_and_update() {
            return;
        }

        if timeout(CLOSE_GRACE, closed.changed()).await.is_err() {
            warn!("graceful close timed out, aborting read loop");
            if let Some(task) = self.task.lock().take() {
                task.abort();
            }
            *self.state.lock() = StreamState::Closed;
            self.registry.clear();
        }
    }

    /// Read loop that owns the socket.
    async fn run_read_loop(
        mut ws_write: WsSink,
        mut ws_read: WsSource,
        mut command_rx: mpsc::UnboundedReceiver<StreamCommand>,
        registry: Arc<ListenerRegistry>,
        state: Arc<Mutex<StreamState>>,
        closed_tx: watch::Sender<bool>,
    ) {
        *state.lock() = StreamState::Streaming;

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            match envelope::parse_frame(text.as_str()) {
                                Ok(Some(envelope)) => registry.dispatch(&envelope),
                                Ok(None) => {}
                                Err(e) => {
                                    // Malformed frames mean an incompatible
                                    // host; terminate rather than guess.
                                    error!(error = %e, "malformed event frame, closing stream");
                                    let _ = ws_write.close().await;
                                    break;
                                }
                            }
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("websocket closed by host");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "websocket error");
                            break;
                        }

                        None => {
                            debug!("websocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    // None means every handle was dropped; close as well.
                    match command {
                        Some(StreamCommand::Shutdown) | None => {
                            debug!("shutdown requested");
                            let _ = ws_write.close().await;
                            let drained = timeout(CLOSE_DRAIN, async {
                                while let Some(message) = ws_read.next().await {
                                    if matches!(message, Ok(Message::Close(_)) | Err(_)) {
                                        break;
                                    }
                                }
                            })
                            .await;

                            if drained.is_err() {
                                warn!("close handshake timed out");
                            }
                            break;
                        }
                    }
                }
            }
        }

        *state.lock() = StreamState::Closed;
        let dropped = registry.clear();
        if dropped > 0 {
            debug!(listeners = dropped, "dropped listeners on close");
        }
        let _ = closed_tx.send(true);

        debug!("read loop terminated");
    }
}

// ============================================================================
// Auth Header
// ============================================================================

/// Builds the `Authorization: Basic` value for the resolved token.
pub(crate) fn basic_authorization(token: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{AUTH_USERNAME}:{token}"))
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;

    /// Spawns a plaintext mock host that checks the subscription frame,
    /// emits `frames`, then closes.
    async fn spawn_emitting_host(frames: Vec<String>) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
            let (mut write, mut read) = ws.split();

            let first = read.next().await.expect("subscribe frame").expect("frame");
            assert_eq!(
                first.into_text().expect("text frame").as_str(),
                r#"[5,"OnJsonApiEvent"]"#
            );

            // Give the client a moment to register listeners.
            tokio::time::sleep(Duration::from_millis(250)).await;

            for frame in frames {
                write
                    .send(Message::Text(frame.into()))
                    .await
                    .expect("send frame");
            }
            let _ = write.close().await;
        });

        (format!("ws://127.0.0.1:{port}"), task)
    }

    /// Spawns a mock host that stays open until the client closes.
    async fn spawn_idle_host() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");

            while let Some(message) = ws.next().await {
                match message {
                    Ok(Message::Close(_)) | Err(_) => break,
                    _ => {}
                }
            }
        });

        (format!("ws://127.0.0.1:{port}"), task)
    }

    async fn wait_closed(stream: &EventStream) {
        let mut closed = stream.closed();
        if !*closed.borrow_and_update() {
            let _ = timeout(Duration::from_secs(5), closed.changed()).await;
        }
    }

    #[tokio::test]
    async fn test_events_delivered_in_wire_order_with_filtering() {
        let (url, host) = spawn_emitting_host(vec![
            r#"[8, "a", 1]"#.into(),
            r#"[8, "b", 2]"#.into(),
            r#"[8, "a", 3]"#.into(),
        ])
        .await;

        let stream = EventStream::connect_url(&url, None, None)
            .await
            .expect("connect");

        let (tx, mut rx) = unbounded_channel();
        stream
            .on("a", move |envelope| {
                let _ = tx.send(envelope.data.clone());
            })
            .expect("register listener");

        wait_closed(&stream).await;
        host.await.expect("mock host");

        let mut seen = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            seen.push(payload);
        }
        assert_eq!(seen, vec![serde_json::json!(1), serde_json::json!(3)]);
    }

    #[tokio::test]
    async fn test_close_drains_listeners_and_raises_signal_once() {
        let (url, host) = spawn_emitting_host(Vec::new()).await;
        let stream = EventStream::connect_url(&url, None, None)
            .await
            .expect("connect");

        stream.on("*", |_| {}).expect("register listener");
        wait_closed(&stream).await;
        host.await.expect("mock host");

        assert_eq!(stream.state(), StreamState::Closed);
        assert!(*stream.closed().borrow());

        // Registration after close is rejected.
        let err = stream.on("*", |_| {}).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_explicit_disconnect_closes_gracefully() {
        let (url, host) = spawn_idle_host().await;
        let stream = EventStream::connect_url(&url, None, None)
            .await
            .expect("connect");

        assert_ne!(stream.state(), StreamState::Closed);
        stream.disconnect().await;

        assert_eq!(stream.state(), StreamState::Closed);
        host.await.expect("mock host saw the close");

        // Idempotent.
        stream.disconnect().await;
    }

    #[tokio::test]
    async fn test_malformed_frame_terminates_stream() {
        let (url, host) =
            spawn_emitting_host(vec![r#"{"not": "an array"}"#.into()]).await;
        let stream = EventStream::connect_url(&url, None, None)
            .await
            .expect("connect");

        wait_closed(&stream).await;
        assert_eq!(stream.state(), StreamState::Closed);
        host.abort();
    }

    #[test]
    fn test_basic_authorization_encoding() {
        // base64("riot:token") == "cmlvdDp0b2tlbg=="
        assert_eq!(basic_authorization("token"), "Basic cmlvdDp0b2tlbg==");
    }
}
