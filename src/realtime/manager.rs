//! Socket connection manager.
//!
//! # Responsibilities
//! - Own at most one live socket session to the backend
//! - Drive the connect / reconnect / exhaust state machine
//! - Feed text frames to the [`Dispatcher`]
//!
//! # Data Flow
//! ```text
//! connect(token) ──spawn──→ driver task
//!                              │ dial ws(s)://backend/ws?token=…
//!                              ├─ open  → Connected, attempts reset
//!                              ├─ frame → Dispatcher::dispatch_frame
//!                              └─ lost  → Reconnecting (fixed delay)
//!                                         or Exhausted (budget spent)
//! disconnect() ──stop──→ driver closes the socket and exits
//! ```
//!
//! # Design Decisions
//! - Every session carries a generation number; state writes from a
//!   superseded session are ignored
//! - The driver owns the reconnect timer, so stopping the driver cancels it
//! - Each handshake runs under `connect_timeout_ms`; an overrun is a lost
//!   connection like any other
//! - State is published on a `watch` channel

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::config::RealtimeConfig;
use crate::net;
use crate::observability::metrics;
use crate::realtime::{ConnectionState, Dispatcher, RealtimeError};
use crate::resilience::ReconnectPolicy;

#[derive(Debug, Default)]
struct Session {
    generation: u64,
    stop: Option<oneshot::Sender<()>>,
}

#[derive(Debug)]
struct Shared {
    session: Mutex<Session>,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish `state` if `generation` is still the live session.
    fn transition(&self, generation: u64, state: ConnectionState) -> bool {
        let session = self.lock();
        if session.generation != generation {
            return false;
        }
        self.publish(state);
        true
    }

    fn publish(&self, state: ConnectionState) {
        metrics::record_connection_state(state.is_connected());
        tracing::debug!(state = %state, "Connection state changed");
        self.state.send_replace(state);
    }
}

/// Owns the client's socket session and its subscribers.
#[derive(Debug)]
pub struct ConnectionManager {
    config: RealtimeConfig,
    backend_url: String,
    dispatcher: Arc<Dispatcher>,
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(config: RealtimeConfig, backend_url: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            backend_url: backend_url.into(),
            dispatcher: Dispatcher::new(),
            shared: Arc::new(Shared {
                session: Mutex::new(Session::default()),
                state,
            }),
        }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// `ws(s)://<backend><ws_path>?token=<token>`.
    pub fn ws_url(&self, token: &str) -> Result<Url, RealtimeError> {
        let invalid = |reason: String| RealtimeError::InvalidUrl {
            url: self.backend_url.clone(),
            reason,
        };

        let mut url = Url::parse(&self.backend_url).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };
        url.set_scheme(scheme)
            .map_err(|_| invalid(format!("cannot switch to '{scheme}'")))?;

        let path = format!("{}{}", url.path().trim_end_matches('/'), self.config.ws_path);
        url.set_path(&path);
        url.query_pairs_mut().clear().append_pair("token", token);
        Ok(url)
    }

    /// Open a session, closing any existing one first.
    ///
    /// Returns once the driver task is spawned; watch
    /// [`state_changes`](Self::state_changes) for the outcome. Must be called
    /// from within a Tokio runtime.
    pub fn connect(&self, token: &str) -> Result<(), RealtimeError> {
        if token.trim().is_empty() {
            tracing::error!("No authentication token available for socket connection");
            return Err(RealtimeError::MissingToken);
        }
        let url = self.ws_url(token)?;
        net::install_crypto_provider();

        let (stop_tx, stop_rx) = oneshot::channel();
        let generation = {
            let mut session = self.shared.lock();
            if let Some(previous) = session.stop.take() {
                tracing::debug!("Closing existing session before reconnecting");
                let _ = previous.send(());
            }
            session.generation += 1;
            session.stop = Some(stop_tx);
            self.shared.publish(ConnectionState::Connecting);
            session.generation
        };

        tracing::info!(host = ?url.host_str(), path = %url.path(), "Connecting to realtime socket");
        let driver = Driver {
            shared: Arc::clone(&self.shared),
            dispatcher: Arc::clone(&self.dispatcher),
            url,
            policy: ReconnectPolicy::from_config(&self.config),
            connect_timeout: Duration::from_millis(self.config.connect_timeout_ms),
            generation,
        };
        tokio::spawn(driver.run(stop_rx));
        Ok(())
    }

    /// Close the socket, cancel any pending reconnect and drop all listeners.
    /// Repeated calls are no-ops.
    pub fn disconnect(&self) {
        let was_active = {
            let mut session = self.shared.lock();
            let stop = session.stop.take();
            let active =
                stop.is_some() || *self.shared.state.borrow() != ConnectionState::Disconnected;
            if let Some(stop) = stop {
                let _ = stop.send(());
            }
            if active {
                session.generation += 1;
                self.shared.publish(ConnectionState::Disconnected);
            }
            active
        };
        self.dispatcher.clear();
        if was_active {
            tracing::info!("Realtime socket disconnected");
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(stop) = self.shared.lock().stop.take() {
            let _ = stop.send(());
        }
    }
}

enum Exit {
    Stopped,
    Lost(String),
}

struct Driver {
    shared: Arc<Shared>,
    dispatcher: Arc<Dispatcher>,
    url: Url,
    policy: ReconnectPolicy,
    connect_timeout: Duration,
    generation: u64,
}

impl Driver {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        loop {
            let reason = match self.session(&mut stop).await {
                Exit::Stopped => break,
                Exit::Lost(reason) => reason,
            };

            let Some(delay) = self.policy.next_delay() else {
                tracing::error!(
                    attempts = self.policy.max_attempts(),
                    "Failed to reconnect, giving up"
                );
                self.shared.transition(self.generation, ConnectionState::Exhausted);
                break;
            };

            let attempt = self.policy.attempts();
            if !self
                .shared
                .transition(self.generation, ConnectionState::Reconnecting { attempt })
            {
                break;
            }
            tracing::warn!(
                attempt,
                max_attempts = self.policy.max_attempts(),
                delay_ms = delay.as_millis() as u64,
                reason = %reason,
                "Realtime socket lost, scheduling reconnect"
            );
            metrics::record_reconnect();

            tokio::select! {
                _ = &mut stop => break,
                _ = tokio::time::sleep(delay) => {}
            }
            if !self.shared.transition(self.generation, ConnectionState::Connecting) {
                break;
            }
        }
        tracing::debug!(generation = self.generation, "Realtime driver stopped");
    }

    /// One dial plus read loop. Returns when the socket is gone.
    async fn session(&mut self, stop: &mut oneshot::Receiver<()>) -> Exit {
        let dial = tokio::time::timeout(self.connect_timeout, connect_async(self.url.as_str()));
        let socket = tokio::select! {
            _ = &mut *stop => return Exit::Stopped,
            dialed = dial => match dialed {
                Ok(Ok((socket, _))) => socket,
                Ok(Err(e)) => return Exit::Lost(e.to_string()),
                Err(_) => {
                    return Exit::Lost(format!(
                        "handshake timed out after {}ms",
                        self.connect_timeout.as_millis()
                    ))
                }
            },
        };

        if !self.shared.transition(self.generation, ConnectionState::Connected) {
            return Exit::Stopped;
        }
        self.policy.reset();
        tracing::info!("Realtime socket connection established");

        let (mut write, mut read) = socket.split();
        loop {
            tokio::select! {
                _ = &mut *stop => {
                    let _ = write.send(Message::Close(None)).await;
                    return Exit::Stopped;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        self.dispatcher.dispatch_frame(text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        return Exit::Lost(format!("closed by server: {frame:?}"));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Exit::Lost(e.to_string()),
                    None => return Exit::Lost("stream ended".to_string()),
                },
            }
        }
    }
}
