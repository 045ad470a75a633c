//! Single-connection command server.
//!
//! A [`CommandServer`] owns the listener of one service and serves at most
//! one client at a time. It alternates between waiting for a client and
//! serving that client's line stream until the shared [`ShutdownFlag`] is
//! set. Both phases block for at most the accept timeout before looking at
//! the flag again.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use spadic_config::{Config, ServiceEndpoint, ServiceKind};
use spadic_protocol::LineDecoder;

use crate::service::MessageHandler;
use crate::shutdown::ShutdownFlag;
use crate::transport::{LISTENER_TARGET, ListenerError, ServiceListener, resolve_peer_name};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Timing and buffer settings shared by every command server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Upper bound on a single accept or read wait.
    pub accept_timeout: Duration,
    /// Size of each socket read.
    pub read_chunk_bytes: usize,
    /// Longest accepted request line.
    pub max_line_bytes: usize,
}

impl ServerOptions {
    /// Extracts server settings from the daemon configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            accept_timeout: config.accept_timeout(),
            read_chunk_bytes: config.read_chunk_bytes,
            max_line_bytes: config.max_line_bytes,
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Result of waiting for a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// A client connected.
    Connected {
        /// Host name of the client, or its address when reverse lookup fails.
        peer: String,
    },
    /// Shutdown was requested before a client arrived.
    StopRequested,
}

/// Reason a serve loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// No client was connected.
    NotConnected,
    /// The client closed the connection.
    PeerClosed,
    /// Shutdown was requested.
    StopRequested,
    /// Reading from the client failed.
    ReadFailed,
    /// A reply could not be delivered within the accept timeout.
    WriteFailed,
}

#[derive(Debug)]
struct Connection {
    stream: TcpStream,
    peer: String,
}

/// Listener, handler and active connection of one service.
pub struct CommandServer {
    kind: ServiceKind,
    listener: ServiceListener,
    handler: Box<dyn MessageHandler>,
    options: ServerOptions,
    shutdown: ShutdownFlag,
    connection: Option<Connection>,
}

impl CommandServer {
    /// Binds the listening socket for `kind` at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError`] when the address cannot be resolved or bound.
    pub fn bind(
        kind: ServiceKind,
        endpoint: &ServiceEndpoint,
        handler: Box<dyn MessageHandler>,
        options: ServerOptions,
        shutdown: ShutdownFlag,
    ) -> Result<Self, ListenerError> {
        let listener = ServiceListener::bind(endpoint)?;
        Ok(Self {
            kind,
            listener,
            handler,
            options,
            shutdown,
            connection: None,
        })
    }

    /// Service this server answers for.
    #[must_use]
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Blocks until a client connects or shutdown is requested.
    pub fn await_connection(&mut self) -> AcceptOutcome {
        let mut accept_errors = RepeatedErrorFilter::default();
        loop {
            if self.shutdown.is_requested() {
                return AcceptOutcome::StopRequested;
            }
            match self.listener.accept_within(self.options.accept_timeout) {
                Ok(Some((stream, addr))) => {
                    accept_errors.reset();
                    if let Err(error) = self.apply_timeouts(&stream) {
                        warn!(
                            target: LISTENER_TARGET,
                            service = %self.kind,
                            error = %error,
                            "failed to set socket timeouts; dropping connection"
                        );
                        continue;
                    }
                    let peer = resolve_peer_name(&addr);
                    info!(
                        target: SERVER_TARGET,
                        service = %self.kind,
                        peer = %peer,
                        addr = %addr,
                        "client connected"
                    );
                    self.connection = Some(Connection {
                        stream,
                        peer: peer.clone(),
                    });
                    return AcceptOutcome::Connected { peer };
                }
                Ok(None) => accept_errors.reset(),
                Err(error) => {
                    if accept_errors.first_occurrence(error.kind()) {
                        warn!(
                            target: LISTENER_TARGET,
                            service = %self.kind,
                            error = %error,
                            "socket accept error"
                        );
                    }
                    thread::sleep(ERROR_BACKOFF);
                }
            }
        }
    }

    /// Serves the connected client until it leaves or shutdown is requested.
    ///
    /// The connection is closed when this returns.
    pub fn serve(&mut self) -> ServeOutcome {
        let Some(mut connection) = self.connection.take() else {
            return ServeOutcome::NotConnected;
        };
        let mut decoder = LineDecoder::with_max_line_bytes(self.options.max_line_bytes);
        let mut chunk = vec![0_u8; self.options.read_chunk_bytes];

        let outcome = 'connection: loop {
            if self.shutdown.is_requested() {
                break ServeOutcome::StopRequested;
            }
            match connection.stream.read(&mut chunk) {
                Ok(0) => break ServeOutcome::PeerClosed,
                Ok(read) => {
                    decoder.extend(&chunk[..read]);
                    for message in decoder.messages() {
                        let Err(error) = self.handler.process(message, &mut connection.stream)
                        else {
                            continue;
                        };
                        warn!(
                            target: SERVER_TARGET,
                            service = %self.kind,
                            peer = %connection.peer,
                            error = %error,
                            "message rejected"
                        );
                        // A half-written reply leaves the stream unframed.
                        if error.is_transport_failure() {
                            break 'connection ServeOutcome::WriteFailed;
                        }
                    }
                }
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock
                            | io::ErrorKind::TimedOut
                            | io::ErrorKind::Interrupted
                    ) => {}
                Err(error) => {
                    warn!(
                        target: SERVER_TARGET,
                        service = %self.kind,
                        peer = %connection.peer,
                        error = %error,
                        "read failed"
                    );
                    break ServeOutcome::ReadFailed;
                }
            }
        };

        info!(
            target: SERVER_TARGET,
            service = %self.kind,
            peer = %connection.peer,
            outcome = ?outcome,
            "connection closed"
        );
        outcome
    }

    /// Bounds blocking reads and writes so the shutdown flag is revisited.
    fn apply_timeouts(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_read_timeout(Some(self.options.accept_timeout))?;
        stream.set_write_timeout(Some(self.options.accept_timeout))
    }

    /// Alternates between accepting and serving until shutdown is requested.
    pub fn run(&mut self) {
        info!(
            target: SERVER_TARGET,
            service = %self.kind,
            endpoint = %self.listener.endpoint(),
            "command server listening"
        );
        loop {
            if let AcceptOutcome::StopRequested = self.await_connection() {
                break;
            }
            if let ServeOutcome::StopRequested = self.serve() {
                break;
            }
        }
        debug!(target: SERVER_TARGET, service = %self.kind, "command server stopped");
    }
}

/// Suppresses repeats of the same accept error until a quiet period.
#[derive(Debug, Default)]
struct RepeatedErrorFilter {
    last: Option<io::ErrorKind>,
}

impl RepeatedErrorFilter {
    /// Records `kind`; returns `true` unless it repeats the previous error.
    fn first_occurrence(&mut self, kind: io::ErrorKind) -> bool {
        self.last.replace(kind) != Some(kind)
    }

    fn reset(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Debug for CommandServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandServer")
            .field("kind", &self.kind)
            .field("listener", &self.listener)
            .field("options", &self.options)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}
