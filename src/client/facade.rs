//! Connected client facade.
//!
//! Ties the bootstrap pipeline together and owns the two live channels:
//! the HTTPS request channel and the WebSocket event stream. A background
//! monitor watches both the socket and the client process so that either
//! kind of death surfaces through one [`DisconnectSignal`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::discovery::process::{self, ProcessLocator};
use crate::discovery::{ProcessHandle, lockfile};
use crate::error::{Error, Result};
use crate::http::RequestClient;
use crate::identifiers::SubscriptionId;
use crate::tls::LoopbackTrust;
use crate::ws::{EventEnvelope, EventStream};

use super::builder::ClientBuilder;

// ============================================================================
// Constants
// ============================================================================

/// How long `disconnect()` waits for the monitor to confirm shutdown.
const DISCONNECT_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected; terminal after a disconnect.
    Disconnected,
    /// Polling the process table for the client process.
    Discovering,
    /// Process found; resolving credentials and opening channels.
    Authenticating,
    /// Both channels live.
    Connected,
    /// Caller-initiated shutdown in progress.
    Closing,
}

// ============================================================================
// DisconnectSignal
// ============================================================================

/// One-shot signal that resolves when the connection dies.
///
/// Fires for any cause: socket closure, client process exit, or an explicit
/// [`LeagueClient::disconnect`]. Obtain one per waiter via
/// [`LeagueClient::disconnected`].
#[derive(Debug)]
pub struct DisconnectSignal {
    rx: watch::Receiver<bool>,
}

impl DisconnectSignal {
    /// Resolves once the connection is down. Returns immediately if it
    /// already is.
    pub async fn wait(mut self) {
        if *self.rx.borrow_and_update() {
            return;
        }
        // An Err means the monitor is gone, which also means disconnected.
        let _ = self.rx.changed().await;
    }
}

// ============================================================================
// LeagueClient
// ============================================================================

/// A connected client session.
///
/// Cheap to clone; clones share the same connection and monitor.
///
/// # Example
///
/// ```no_run
/// use lcu_connector::{LeagueClient, Method};
///
/// # async fn example() -> lcu_connector::Result<()> {
/// let client = LeagueClient::connect().await?;
///
/// client.on("/lol-gameflow/*", |event| {
///     println!("{}: {}", event.topic, event.data);
/// })?;
///
/// let response = client
///     .request()?
///     .send(Method::GET, "/lol-summoner/v1/current-summoner", &[])
///     .await?;
/// println!("{}", response.body);
///
/// client.disconnected().wait().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LeagueClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for LeagueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeagueClient")
            .field("pid", &self.inner.process.pid)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct ClientInner {
    /// The located client process.
    process: ProcessHandle,
    /// HTTPS request channel.
    request: RequestClient,
    /// WebSocket event stream.
    events: EventStream,
    /// Lifecycle state (shared with the monitor).
    state: Arc<Mutex<ConnectionState>>,
    /// Raised exactly once when the connection dies.
    disconnect_rx: watch::Receiver<bool>,
    /// Liveness monitor task.
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl LeagueClient {
    /// Connects with default settings.
    ///
    /// # Errors
    ///
    /// [`Error::Connect`] wrapping the failing bootstrap phase.
    pub async fn connect() -> Result<Self> {
        Self::builder().connect().await
    }

    /// Returns a builder for customized settings.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Runs the bootstrap pipeline: discover, authenticate, open channels.
    pub(crate) async fn bootstrap(config: ClientBuilder, cancel: CancelToken) -> Result<Self> {
        let state = Arc::new(Mutex::new(ConnectionState::Discovering));
        let trust = LoopbackTrust::new();

        let locator = ProcessLocator::new(&config.process_name)
            .with_poll_interval(config.poll_interval)
            .with_timeout(config.locate_timeout);
        let process = locator
            .locate(&cancel)
            .await
            .map_err(|e| Error::connect("process discovery", e))?;

        *state.lock() = ConnectionState::Authenticating;
        let credentials =
            lockfile::resolve(&process.install_dir, config.lockfile_timeout, &cancel)
                .await
                .map_err(|e| Error::connect("credential resolution", e))?;

        let request = RequestClient::new(&trust, &credentials)
            .map_err(|e| Error::connect("request channel", e))?;
        let events = EventStream::connect(&trust, &credentials)
            .await
            .map_err(|e| Error::connect("event stream", e))?;

        *state.lock() = ConnectionState::Connected;
        info!(pid = process.pid, port = credentials.port, "client connected");

        let (disconnect_rx, monitor) = spawn_monitor(
            process.pid,
            events.clone(),
            Arc::clone(&state),
            config.liveness_interval,
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                process,
                request,
                events,
                state,
                disconnect_rx,
                monitor: Mutex::new(Some(monitor)),
            }),
        })
    }

    /// The located client process.
    #[inline]
    #[must_use]
    pub fn process(&self) -> &ProcessHandle {
        &self.inner.process
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.lock()
    }

    /// The HTTPS request channel.
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] unless the connection is live.
    pub fn request(&self) -> Result<&RequestClient> {
        if self.state() != ConnectionState::Connected {
            return Err(Error::ConnectionClosed);
        }
        Ok(&self.inner.request)
    }

    /// Registers an event listener. See [`EventStream::on`].
    ///
    /// # Errors
    ///
    /// [`Error::ConnectionClosed`] unless the connection is live.
    pub fn on<F>(&self, pattern: impl Into<String>, handler: F) -> Result<SubscriptionId>
    where
        F: Fn(&EventEnvelope) + Send + Sync + 'static,
    {
        if self.state() != ConnectionState::Connected {
            return Err(Error::ConnectionClosed);
        }
        self.inner.events.on(pattern, handler)
    }

    /// Removes an event listener. Returns `false` if the handle was unknown.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.events.off(id)
    }

    /// Returns a one-shot signal for this connection's death.
    #[must_use]
    pub fn disconnected(&self) -> DisconnectSignal {
        DisconnectSignal {
            rx: self.inner.disconnect_rx.clone(),
        }
    }

    /// Shuts the connection down.
    ///
    /// Closes the event stream, waits for the monitor to confirm, and
    /// leaves the client [`ConnectionState::Disconnected`]. Idempotent.
    pub async fn disconnect(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == ConnectionState::Disconnected {
                return;
            }
            *state = ConnectionState::Closing;
        }
        debug!("disconnecting");

        self.inner.events.disconnect().await;

        let mut rx = self.inner.disconnect_rx.clone();
        let already_down = *rx.borrow_and_update();
        if !already_down && timeout(DISCONNECT_GRACE, rx.changed()).await.is_err() {
            warn!("monitor did not confirm shutdown in time");
            if let Some(task) = self.inner.monitor.lock().take() {
                task.abort();
            }
        }

        *self.inner.state.lock() = ConnectionState::Disconnected;
    }
}

// ============================================================================
// Liveness Monitor
// ============================================================================

/// Spawns the background monitor for one connection.
///
/// The monitor waits on the event stream's closed signal and periodically
/// checks that the client process is still alive. Whichever fires first
/// tears the connection down; the watch channel guarantees waiters observe
/// the disconnect exactly once.
fn spawn_monitor(
    pid: u32,
    events: EventStream,
    state: Arc<Mutex<ConnectionState>>,
    liveness_interval: Duration,
) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut closed = events.closed();
        let mut ticker = interval(liveness_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it.
        ticker.tick().await;

        if !*closed.borrow_and_update() {
            loop {
                tokio::select! {
                    _ = closed.changed() => {
                        debug!("event stream closed");
                        break;
                    }

                    _ = ticker.tick() => {
                        if !process::is_alive(pid) {
                            info!(pid, "client process exited");
                            events.disconnect().await;
                            break;
                        }
                    }
                }
            }
        }

        *state.lock() = ConnectionState::Disconnected;
        let _ = tx.send(true);
        debug!("monitor terminated");
    });

    (rx, task)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    use crate::ws::StreamState;

    /// Mock event host that stays open until the client closes.
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

    /// Mock event host that closes the socket shortly after the handshake.
    async fn spawn_closing_host() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");

            let _ = ws.next().await; // subscription frame
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = ws.send(Message::Close(None)).await;
        });

        (format!("ws://127.0.0.1:{port}"), task)
    }

    async fn connect_stream(url: &str) -> EventStream {
        EventStream::connect_url(url, None, None)
            .await
            .expect("connect mock host")
    }

    #[tokio::test]
    async fn test_monitor_fires_once_on_socket_close() {
        let (url, host) = spawn_closing_host().await;
        let stream = connect_stream(&url).await;

        let state = Arc::new(Mutex::new(ConnectionState::Connected));
        let (rx, monitor) = spawn_monitor(
            std::process::id(),
            stream,
            Arc::clone(&state),
            Duration::from_secs(60),
        );

        let signal = DisconnectSignal { rx: rx.clone() };
        timeout(Duration::from_secs(5), signal.wait())
            .await
            .expect("disconnect signal after socket close");

        assert_eq!(*state.lock(), ConnectionState::Disconnected);
        assert!(*rx.borrow(), "signal latches after firing");

        // A signal taken after the fact resolves immediately.
        let late = DisconnectSignal { rx };
        timeout(Duration::from_millis(100), late.wait())
            .await
            .expect("late waiter resolves immediately");

        monitor.await.expect("monitor task");
        host.await.expect("mock host");
    }

    #[tokio::test]
    async fn test_monitor_detects_process_exit() {
        let (url, host) = spawn_idle_host().await;
        let stream = connect_stream(&url).await;

        let state = Arc::new(Mutex::new(ConnectionState::Connected));
        // No live process has this PID.
        let (rx, monitor) = spawn_monitor(
            u32::MAX,
            stream.clone(),
            Arc::clone(&state),
            Duration::from_millis(50),
        );

        let signal = DisconnectSignal { rx };
        timeout(Duration::from_secs(5), signal.wait())
            .await
            .expect("disconnect signal after process exit");

        assert_eq!(*state.lock(), ConnectionState::Disconnected);
        assert_eq!(stream.state(), StreamState::Closed, "monitor closes the stream");

        monitor.await.expect("monitor task");
        host.await.expect("mock host");
    }

    #[tokio::test]
    async fn test_monitor_stays_quiet_while_connection_is_healthy() {
        let (url, host) = spawn_idle_host().await;
        let stream = connect_stream(&url).await;

        let state = Arc::new(Mutex::new(ConnectionState::Connected));
        let (rx, monitor) = spawn_monitor(
            std::process::id(),
            stream.clone(),
            Arc::clone(&state),
            Duration::from_millis(50),
        );

        let signal = DisconnectSignal { rx };
        let result = timeout(Duration::from_millis(400), signal.wait()).await;
        assert!(result.is_err(), "healthy connection must not fire the signal");
        assert_eq!(*state.lock(), ConnectionState::Connected);

        stream.disconnect().await;
        monitor.await.expect("monitor task");
        host.await.expect("mock host");
    }
}
