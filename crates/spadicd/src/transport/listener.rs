//! Listener implementation for the service sockets.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

use spadic_config::ServiceEndpoint;

use super::{LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Pending connections the kernel may queue for one service.
const BACKLOG: i32 = 1;

/// Non-blocking TCP listener for a single service.
#[derive(Debug)]
pub(crate) struct ServiceListener {
    endpoint: ServiceEndpoint,
    listener: TcpListener,
}

impl ServiceListener {
    pub(crate) fn bind(endpoint: &ServiceEndpoint) -> Result<Self, ListenerError> {
        let addr = resolve(&endpoint.host, endpoint.port)?;
        let listener = bind_tcp(addr)?;
        debug!(
            target: LISTENER_TARGET,
            endpoint = %endpoint,
            "service listener bound"
        );
        Ok(Self {
            endpoint: endpoint.clone(),
            listener,
        })
    }

    pub(crate) fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    pub(crate) fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Waits up to `timeout` for a client.
    ///
    /// Returns `Ok(None)` when the timeout elapses without a connection. The
    /// accepted stream is switched back to blocking mode.
    pub(crate) fn accept_within(
        &self,
        timeout: Duration,
    ) -> io::Result<Option<(TcpStream, SocketAddr)>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    return Ok(Some((stream, peer)));
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    thread::sleep(ACCEPT_BACKOFF.min(deadline - now));
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
                Err(error) => return Err(error),
            }
        }
    }
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_string(),
            port,
        })
}

fn bind_tcp(addr: SocketAddr) -> Result<TcpListener, ListenerError> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))
        .map_err(|source| ListenerError::Socket { addr, source })?;
    socket
        .set_reuse_address(true)
        .map_err(|source| ListenerError::ReuseAddress { addr, source })?;
    socket
        .bind(&addr.into())
        .map_err(|source| ListenerError::Bind { addr, source })?;
    socket
        .listen(BACKLOG)
        .map_err(|source| ListenerError::Listen { addr, source })?;
    socket
        .set_nonblocking(true)
        .map_err(|source| ListenerError::NonBlocking { source })?;
    Ok(socket.into())
}
