//! Lifecycle owner for the command servers.
//!
//! The supervisor binds every served port before starting any thread, so a
//! port conflict leaves nothing running. Each server then runs on its own
//! named thread and all of them observe one [`ShutdownFlag`].

use std::collections::BTreeMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::debug;

use spadic_config::{Config, PortError, ServiceEndpoint, ServiceKind};

use crate::device::DeviceControl;
use crate::health::HealthReporter;
use crate::server::{CommandServer, ServerOptions};
use crate::service::{MessageHandler, RegisterHandler, SignalHandler};
use crate::shutdown::ShutdownFlag;
use crate::transport::ListenerError;

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Errors raised while starting or stopping the command servers.
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("no valid port for {kind}: {source}")]
    Endpoint {
        kind: ServiceKind,
        #[source]
        source: PortError,
    },
    #[error("{kind} has no command server")]
    Unserved { kind: ServiceKind },
    #[error("failed to bind {kind} server: {source}")]
    Bind {
        kind: ServiceKind,
        #[source]
        source: ListenerError,
    },
    #[error("failed to read bound address of {kind} server: {source}")]
    LocalAddr {
        kind: ServiceKind,
        #[source]
        source: io::Error,
    },
    #[error("failed to spawn {kind} server thread: {source}")]
    Spawn {
        kind: ServiceKind,
        #[source]
        source: io::Error,
    },
    #[error("{kind} server thread panicked")]
    ThreadPanic { kind: ServiceKind },
}

struct Worker {
    kind: ServiceKind,
    handle: JoinHandle<()>,
}

/// Running set of command servers.
pub struct Supervisor {
    device: Option<Arc<dyn DeviceControl>>,
    reporter: Arc<dyn HealthReporter>,
    shutdown: ShutdownFlag,
    workers: Vec<Worker>,
    addrs: BTreeMap<ServiceKind, SocketAddr>,
}

impl Supervisor {
    /// Starts every served service on the ports derived from `config`.
    pub fn start(
        config: &Config,
        device: Arc<dyn DeviceControl>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, SupervisorError> {
        let endpoints = ServiceKind::SERVED
            .into_iter()
            .map(|kind| {
                config
                    .endpoint(kind)
                    .map(|endpoint| (kind, endpoint))
                    .map_err(|source| SupervisorError::Endpoint { kind, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::start_with_endpoints(
            &endpoints,
            ServerOptions::from_config(config),
            device,
            reporter,
        )
    }

    /// Starts one server per entry of `endpoints`.
    ///
    /// All listeners are bound before any thread starts; the first failure
    /// releases every socket bound so far.
    pub fn start_with_endpoints(
        endpoints: &[(ServiceKind, ServiceEndpoint)],
        options: ServerOptions,
        device: Arc<dyn DeviceControl>,
        reporter: Arc<dyn HealthReporter>,
    ) -> Result<Self, SupervisorError> {
        reporter.supervisor_starting();
        let shutdown = ShutdownFlag::new();

        let servers = match bind_all(endpoints, options, device.as_ref(), &shutdown) {
            Ok(servers) => servers,
            Err(error) => {
                if let SupervisorError::Bind { kind, .. } | SupervisorError::Unserved { kind } =
                    &error
                {
                    reporter.service_failed(*kind, &error);
                }
                return Err(error);
            }
        };

        let mut supervisor = Self {
            device: Some(device),
            reporter,
            shutdown,
            workers: Vec::with_capacity(servers.len()),
            addrs: BTreeMap::new(),
        };
        for (mut server, addr) in servers {
            let kind = server.kind();
            let handle = thread::Builder::new()
                .name(kind.thread_name().to_owned())
                .spawn(move || server.run())
                .map_err(|source| SupervisorError::Spawn { kind, source })?;
            supervisor.workers.push(Worker { kind, handle });
            supervisor.addrs.insert(kind, addr);
            supervisor.reporter.service_listening(kind, addr);
        }
        Ok(supervisor)
    }

    /// Address bound for `kind`, if that service is running.
    #[must_use]
    pub fn local_addr(&self, kind: ServiceKind) -> Option<SocketAddr> {
        self.addrs.get(&kind).copied()
    }

    /// Services currently running, in port order.
    pub fn services(&self) -> impl Iterator<Item = ServiceKind> + '_ {
        self.addrs.keys().copied()
    }

    /// Stops every server and waits for its thread.
    ///
    /// Every thread is joined even if an earlier one panicked; the first
    /// panic is returned.
    pub fn stop(mut self) -> Result<(), SupervisorError> {
        self.shutdown_workers()
    }

    fn shutdown_workers(&mut self) -> Result<(), SupervisorError> {
        if self.shutdown.request() {
            debug!(target: SUPERVISOR_TARGET, "shutdown requested");
        }
        let mut first_error = None;
        for Worker { kind, handle } in self.workers.drain(..) {
            match handle.join() {
                Ok(()) => self.reporter.service_stopped(kind),
                Err(_) => {
                    let error = SupervisorError::ThreadPanic { kind };
                    self.reporter.service_failed(kind, &error);
                    first_error.get_or_insert(error);
                }
            }
        }
        if self.device.take().is_some() {
            self.addrs.clear();
            self.reporter.supervisor_stopped();
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        // Errors were already reported to the health reporter.
        let _ = self.shutdown_workers();
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("services", &self.addrs)
            .field("stopping", &self.shutdown.is_requested())
            .finish_non_exhaustive()
    }
}

fn bind_all(
    endpoints: &[(ServiceKind, ServiceEndpoint)],
    options: ServerOptions,
    device: &dyn DeviceControl,
    shutdown: &ShutdownFlag,
) -> Result<Vec<(CommandServer, SocketAddr)>, SupervisorError> {
    endpoints
        .iter()
        .map(|(kind, endpoint)| {
            let kind = *kind;
            let handler = handler_for(kind, device)?;
            let server = CommandServer::bind(kind, endpoint, handler, options, shutdown.clone())
                .map_err(|source| SupervisorError::Bind { kind, source })?;
            let addr = server
                .local_addr()
                .map_err(|source| SupervisorError::LocalAddr { kind, source })?;
            Ok((server, addr))
        })
        .collect()
}

fn handler_for(
    kind: ServiceKind,
    device: &dyn DeviceControl,
) -> Result<Box<dyn MessageHandler>, SupervisorError> {
    match kind {
        ServiceKind::RegisterFile => Ok(Box::new(RegisterHandler::new(device.register_file()))),
        ServiceKind::ShiftRegister => Ok(Box::new(RegisterHandler::new(device.shift_register()))),
        ServiceKind::Signal => Ok(Box::new(SignalHandler::new(device.dlm_sender()))),
        ServiceKind::Data => Err(SupervisorError::Unserved { kind }),
    }
}
