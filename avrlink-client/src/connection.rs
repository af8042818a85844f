//! Connection management.
//!
//! Each call to [`Client::connect`](crate::Client::connect) spawns one
//! [`Session`] task. The task owns the transport, the line framer, the
//! dispatcher (and with it the session state), the connect/idle timer and
//! the metadata poll. All I/O and event emission for a connection happen on
//! that task, so events come out in the order lines were read.

use crate::error::ClientError;
use crate::event::ClientEvent;
use avrlink_protocol::{Command, Dispatch, Dispatcher, Encoder, LineFramer, DEFAULT_PORT};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};

/// Default read buffer size (4 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Default connect (and idle) timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

/// Default metadata poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2500);

/// Default delay callers should wait before reconnecting.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(2500);

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Receiver host name or address.
    pub host: String,
    /// Receiver control port.
    pub port: u16,
    /// Connect timeout. Once connected, the same duration is the idle
    /// timeout after which [`ClientEvent::TimedOut`] is raised.
    pub connect_timeout: Duration,
    /// Interval of the now-playing metadata poll.
    pub poll_interval: Duration,
    /// Reconnect delay hint for the caller. The client never reconnects by
    /// itself.
    pub reconnect_delay: Duration,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    /// Uses the receiver's default control port.
    pub fn with_default_port(host: impl Into<String>) -> Self {
        Self::new(host, DEFAULT_PORT)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }

    /// Returns the `host:port` string used to connect.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Pending transport connection.
pub(crate) type ConnectFuture = Pin<Box<dyn Future<Output = std::io::Result<TcpStream>> + Send>>;

/// Opens the transport to a `host:port` address.
pub(crate) type Connector = Arc<dyn Fn(String) -> ConnectFuture + Send + Sync>;

/// Connects over plain TCP.
pub(crate) fn tcp_connector() -> Connector {
    Arc::new(|addr: String| Box::pin(TcpStream::connect(addr)) as ConnectFuture)
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Why a session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The receiver closed the connection.
    RemoteClosed,
    /// The caller asked to disconnect (or dropped the client).
    Shutdown,
    Failed(ClientError),
}

/// Outcome of one turn of the session loop.
enum Step {
    Read(std::io::Result<usize>),
    Request(Option<Command>),
    Poll,
    Idle,
    Shutdown,
}

/// One connection attempt and, if it succeeds, its lifetime.
pub(crate) struct Session {
    config: ConnectionConfig,
    connector: Connector,
    requests: mpsc::Receiver<Command>,
    shutdown: oneshot::Receiver<()>,
    events: broadcast::Sender<ClientEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    dispatcher: Dispatcher,
    framer: LineFramer,
}

impl Session {
    pub(crate) fn new(
        config: ConnectionConfig,
        connector: Connector,
        requests: mpsc::Receiver<Command>,
        shutdown: oneshot::Receiver<()>,
        events: broadcast::Sender<ClientEvent>,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        Self {
            config,
            connector,
            requests,
            shutdown,
            events,
            state,
            dispatcher: Dispatcher::new(),
            framer: LineFramer::new(),
        }
    }

    /// Connects, runs the session until it ends, and reports the end.
    pub(crate) async fn run(mut self) {
        self.state.send_replace(ConnectionState::Connecting);

        let addr = self.config.addr();
        let timeout = self.config.connect_timeout;
        tracing::debug!("Connecting to {}...", addr);

        let connect = tokio::time::timeout(timeout, (self.connector)(addr.clone()));
        let attempt = tokio::select! {
            result = connect => Some(result),
            _ = &mut self.shutdown => None,
        };

        let stream = match attempt {
            None => {
                tracing::debug!("Connect to {} cancelled", addr);
                return self.finish(SessionEnd::Shutdown);
            }
            Some(Err(_)) => {
                tracing::debug!("Connection timeout");
                return self.finish(SessionEnd::Failed(ClientError::ConnectTimeout {
                    addr,
                    timeout,
                }));
            }
            Some(Ok(Err(e))) => {
                tracing::debug!("Connection failed: {}", e);
                return self.finish(SessionEnd::Failed(ClientError::Io(e)));
            }
            Some(Ok(Ok(stream))) => stream,
        };

        stream.set_nodelay(true).ok();
        tracing::info!("Connected to {}", addr);

        let end = self.drive(stream).await;
        self.finish(end);
    }

    /// Runs a connected session. Timers and the transport are dropped when
    /// this returns, before the end is reported.
    async fn drive(&mut self, stream: TcpStream) -> SessionEnd {
        let (mut reader, mut writer) = stream.into_split();

        if let Err(e) = self.write(&mut writer, &Command::handshake()).await {
            return SessionEnd::Failed(ClientError::Io(e));
        }

        self.state.send_replace(ConnectionState::Connected);
        self.emit(ClientEvent::Connected);

        let idle_timeout = self.config.connect_timeout;
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);
        let mut idle_fired = false;

        // `interval_at` panics on a zero period.
        let poll_interval = self.config.poll_interval.max(Duration::from_millis(1));
        let mut poll = tokio::time::interval_at(Instant::now() + poll_interval, poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buf = vec![0u8; self.config.read_buffer_size];

        loop {
            let step = tokio::select! {
                read = reader.read(&mut buf) => Step::Read(read),
                request = self.requests.recv() => Step::Request(request),
                _ = poll.tick() => Step::Poll,
                _ = &mut idle, if !idle_fired => Step::Idle,
                _ = &mut self.shutdown => Step::Shutdown,
            };

            let written = match step {
                Step::Read(Ok(0)) => {
                    tracing::debug!("Receiver closed the connection");
                    if let Some(line) = self.framer.finish() {
                        self.dispatch(&line);
                    }
                    return SessionEnd::RemoteClosed;
                }
                Step::Read(Ok(n)) => {
                    self.framer.extend(&buf[..n]);
                    while let Some(line) = self.framer.next_line() {
                        self.dispatch(&line);
                    }
                    idle.as_mut().reset(Instant::now() + idle_timeout);
                    idle_fired = false;
                    continue;
                }
                Step::Read(Err(e)) => return SessionEnd::Failed(ClientError::Io(e)),
                Step::Request(Some(command)) => self.write(&mut writer, &[command]).await,
                Step::Poll => self.write(&mut writer, &[Command::RequestInfo]).await,
                Step::Idle => {
                    tracing::debug!("No traffic for {:?}", idle_timeout);
                    idle_fired = true;
                    self.emit(ClientEvent::TimedOut);
                    continue;
                }
                Step::Request(None) | Step::Shutdown => {
                    tracing::debug!("Shutting down writer");
                    let _ = writer.shutdown().await;
                    return SessionEnd::Shutdown;
                }
            };

            if let Err(e) = written {
                return SessionEnd::Failed(ClientError::Io(e));
            }
            idle.as_mut().reset(Instant::now() + idle_timeout);
            idle_fired = false;
        }
    }

    /// Encodes and writes commands against the current session state.
    async fn write(
        &mut self,
        writer: &mut OwnedWriteHalf,
        commands: &[Command],
    ) -> std::io::Result<()> {
        let encoded = Encoder::encode_all(commands, self.dispatcher.session());
        for command in commands {
            tracing::debug!(
                "Sending {}: {:?}",
                command.name(),
                Encoder::line(command, self.dispatcher.session())
            );
        }
        writer.write_all(&encoded).await
    }

    fn dispatch(&mut self, line: &str) {
        match self.dispatcher.dispatch(line) {
            Dispatch::Parsed(field, value) => {
                tracing::debug!("Parsed {} = {}", field, value);
                self.emit(ClientEvent::Parsed(field, value));
            }
            Dispatch::Unrecognized(line) => {
                tracing::trace!("Unrecognized line: {:?}", line);
                self.emit(ClientEvent::Unrecognized(line));
            }
        }
    }

    /// Resets the session and reports how it ended. Commands sent after this
    /// point fail with [`ClientError::NotConnected`].
    fn finish(mut self, end: SessionEnd) {
        self.requests.close();
        self.dispatcher.reset();
        self.framer.clear();
        self.state.send_replace(ConnectionState::Disconnected);

        match end {
            SessionEnd::Failed(e) => {
                tracing::debug!("Connection to {} failed: {}", self.config.addr(), e);
                self.emit(ClientEvent::Errored(Arc::new(e)));
            }
            SessionEnd::RemoteClosed => {
                tracing::info!("Connection to {} closed by receiver", self.config.addr());
            }
            SessionEnd::Shutdown => {
                tracing::debug!("Connection to {} closed", self.config.addr());
            }
        }
        self.emit(ClientEvent::Closed);
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
