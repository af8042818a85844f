//! High-level client API.

use crate::connection::{tcp_connector, ConnectionConfig, ConnectionState, Connector, Session};
use crate::error::ClientError;
use crate::event::ClientEvent;
use avrlink_protocol::Command;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;

/// Default capacity of the event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default capacity of the outbound command queue.
const REQUEST_CHANNEL_CAPACITY: usize = 64;

/// Handle to the task serving one connection.
struct SessionHandle {
    requests: mpsc::Sender<Command>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Control adapter for one receiver.
///
/// The client is reusable: after [`ClientEvent::Closed`], call
/// [`Client::connect`] again. Each connection starts from fresh session
/// state.
pub struct Client {
    events: broadcast::Sender<ClientEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    session: Mutex<Option<SessionHandle>>,
    connector: Connector,
}

impl Client {
    pub fn new() -> Self {
        Self::with_connector(tcp_connector())
    }

    pub(crate) fn with_connector(connector: Connector) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            events,
            state: Arc::new(state),
            session: Mutex::new(None),
            connector,
        }
    }

    /// Subscribes to adapter events.
    ///
    /// Subscribe before [`Client::connect`] to observe the whole connection.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Returns a receiver tracking the connection state.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Starts connecting.
    ///
    /// Returns once the connection task is started; the outcome is reported
    /// through events ([`ClientEvent::Connected`], or
    /// [`ClientEvent::Errored`] followed by [`ClientEvent::Closed`]). An
    /// existing connection is closed first. Commands issued while connecting
    /// are sent after the baseline queries.
    pub async fn connect(&self, config: ConnectionConfig) {
        let mut session = self.session.lock().await;

        if let Some(previous) = session.take() {
            tracing::debug!("Replacing previous connection");
            Self::stop(previous).await;
        }

        let (requests_tx, requests_rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Set before spawning so `state()` is consistent on return.
        self.state.send_replace(ConnectionState::Connecting);

        let task = tokio::spawn(
            Session::new(
                config,
                self.connector.clone(),
                requests_rx,
                shutdown_rx,
                self.events.clone(),
                self.state.clone(),
            )
            .run(),
        );

        *session = Some(SessionHandle {
            requests: requests_tx,
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Closes the connection, if any, and waits for its task to finish.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.session.lock().await.take() {
            Self::stop(handle).await;
        }
    }

    async fn stop(handle: SessionHandle) {
        let _ = handle.shutdown.send(());
        if let Err(e) = handle.task.await {
            tracing::warn!("Connection task ended abnormally: {}", e);
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Queues a command for the current connection.
    ///
    /// Commands that would not encode to a single line are rejected with
    /// [`ClientError::Protocol`].
    pub async fn send(&self, command: Command) -> Result<(), ClientError> {
        command.validate()?;
        let requests = {
            let session = self.session.lock().await;
            let handle = session.as_ref().ok_or(ClientError::NotConnected)?;
            handle.requests.clone()
        };
        requests
            .send(command)
            .await
            .map_err(|_| ClientError::NotConnected)
    }

    /// Requests the current value of a status code.
    pub async fn query(&self, code: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::query(code)).await
    }

    /// Requests the now-playing information list.
    pub async fn request_info(&self) -> Result<(), ClientError> {
        self.send(Command::RequestInfo).await
    }

    pub async fn set_master_power(&self, active: bool) -> Result<(), ClientError> {
        self.send(Command::SetMasterPower(active)).await
    }

    /// Sets the main zone volume from a fraction of the receiver's maximum.
    ///
    /// Values outside `[0, 1]` are not clamped.
    pub async fn set_master_volume(&self, fraction: f64) -> Result<(), ClientError> {
        self.send(Command::SetMasterVolume(fraction)).await
    }

    pub async fn play(&self) -> Result<(), ClientError> {
        self.send(Command::Play).await
    }

    pub async fn pause(&self) -> Result<(), ClientError> {
        self.send(Command::Pause).await
    }

    pub async fn skip_next(&self) -> Result<(), ClientError> {
        self.send(Command::SkipNext).await
    }

    pub async fn skip_previous(&self) -> Result<(), ClientError> {
        self.send(Command::SkipPrevious).await
    }

    /// Sends a raw code, terminated but otherwise unchanged.
    ///
    /// The code must be non-empty and must not contain CR or LF.
    pub async fn send_raw(&self, raw: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::raw(raw)?).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
