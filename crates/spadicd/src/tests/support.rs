//! Shared helpers for the daemon test suites.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use spadic_config::{ServiceEndpoint, ServiceKind};

use crate::device::SimulatedDevice;
use crate::health::HealthReporter;
use crate::server::ServerOptions;
use crate::supervisor::{Supervisor, SupervisorError};

pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Structured health events tracked during tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    SupervisorStarting,
    Listening(ServiceKind),
    Stopped(ServiceKind),
    Failed { kind: ServiceKind, message: String },
    SupervisorStopped,
}

/// Records health events for assertions.
#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn supervisor_starting(&self) {
        self.record(HealthEvent::SupervisorStarting);
    }

    fn service_listening(&self, kind: ServiceKind, _addr: SocketAddr) {
        self.record(HealthEvent::Listening(kind));
    }

    fn service_stopped(&self, kind: ServiceKind) {
        self.record(HealthEvent::Stopped(kind));
    }

    fn service_failed(&self, kind: ServiceKind, error: &SupervisorError) {
        self.record(HealthEvent::Failed {
            kind,
            message: error.to_string(),
        });
    }

    fn supervisor_stopped(&self) {
        self.record(HealthEvent::SupervisorStopped);
    }
}

/// Server options with a short accept timeout to keep tests quick.
#[must_use]
pub fn fast_options() -> ServerOptions {
    ServerOptions {
        accept_timeout: Duration::from_millis(200),
        ..ServerOptions::default()
    }
}

/// Endpoints for every served service on ephemeral loopback ports.
#[must_use]
pub fn loopback_endpoints() -> Vec<(ServiceKind, ServiceEndpoint)> {
    ServiceKind::SERVED
        .into_iter()
        .map(|kind| (kind, ServiceEndpoint::new("127.0.0.1", 0)))
        .collect()
}

/// Supervisor bound to ephemeral ports, plus its device and reporter.
pub struct SupervisorFixture {
    pub supervisor: Supervisor,
    pub device: Arc<SimulatedDevice>,
    pub reporter: Arc<RecordingHealthReporter>,
}

impl SupervisorFixture {
    pub fn start() -> Self {
        let device = Arc::new(SimulatedDevice::new());
        let reporter = Arc::new(RecordingHealthReporter::default());
        let supervisor = Supervisor::start_with_endpoints(
            &loopback_endpoints(),
            fast_options(),
            device.clone(),
            reporter.clone(),
        )
        .expect("start supervisor");
        Self {
            supervisor,
            device,
            reporter,
        }
    }

    pub fn addr(&self, kind: ServiceKind) -> SocketAddr {
        self.supervisor
            .local_addr(kind)
            .expect("service should be running")
    }
}

/// Opens a connection with a bounded read timeout.
pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect to service");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("set client read timeout");
    stream
}

/// Sends `lines` on a fresh connection and closes it.
pub fn send(addr: SocketAddr, lines: &str) {
    let mut stream = connect(addr);
    stream.write_all(lines.as_bytes()).expect("send request");
}

/// Sends one request on a fresh connection and returns the response line.
pub fn request(addr: SocketAddr, line: &str) -> String {
    let mut stream = connect(addr);
    stream.write_all(line.as_bytes()).expect("send request");
    let mut reader = BufReader::new(stream);
    let mut response = String::new();
    reader.read_line(&mut response).expect("read response");
    response
}

/// Polls `condition` until it holds or the wait budget runs out.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}

/// Finds a base port whose four service ports are currently free.
pub fn free_port_base() -> u16 {
    for _ in 0..32 {
        let probe = TcpListener::bind(("127.0.0.1", 0)).expect("bind probe");
        let base = probe.local_addr().expect("probe address").port();
        drop(probe);
        let Some(last) = base.checked_add(3) else {
            continue;
        };
        let held: Vec<_> = (base..=last)
            .map_while(|port| TcpListener::bind(("127.0.0.1", port)).ok())
            .collect();
        if held.len() == 4 {
            return base;
        }
    }
    panic!("no free block of four consecutive ports found");
}
