//! Supervisor tests over real loopback sockets.

use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};
use serde_json::Number;

use spadic_config::{Config, ServiceEndpoint, ServiceKind};

use crate::device::SimulatedDevice;
use crate::supervisor::{Supervisor, SupervisorError};

use super::support::{
    HealthEvent, RecordingHealthReporter, SupervisorFixture, fast_options, free_port_base,
    loopback_endpoints, request, send, wait_until,
};

#[fixture]
fn running() -> SupervisorFixture {
    SupervisorFixture::start()
}

#[rstest]
fn every_served_service_gets_a_listener(running: SupervisorFixture) {
    let kinds: Vec<_> = running.supervisor.services().collect();
    assert_eq!(kinds, ServiceKind::SERVED.to_vec());
    assert!(running.supervisor.local_addr(ServiceKind::Data).is_none());
    running.supervisor.stop().expect("stop supervisor");
}

#[rstest]
fn register_services_keep_separate_state(running: SupervisorFixture) {
    let rf = running.addr(ServiceKind::RegisterFile);
    let sr = running.addr(ServiceKind::ShiftRegister);

    assert_eq!(
        request(rf, "[\"w\",{\"x\":5,\"y\":7}]\n[\"r\",\"all\"]\n"),
        "{\"x\":5,\"y\":7}\n"
    );
    assert_eq!(request(sr, "[\"r\",\"all\"]\n"), "{}\n");

    running.supervisor.stop().expect("stop supervisor");
}

#[rstest]
fn signal_service_sends_each_value_once(running: SupervisorFixture) {
    send(running.addr(ServiceKind::Signal), "42\n");

    let device = Arc::clone(&running.device);
    assert!(wait_until(|| !device.sent_signals().is_empty()));
    running.supervisor.stop().expect("stop supervisor");
    assert_eq!(running.device.sent_signals(), vec![Number::from(42)]);
}

#[rstest]
fn stop_reports_every_service(running: SupervisorFixture) {
    let reporter = Arc::clone(&running.reporter);
    running.supervisor.stop().expect("stop supervisor");

    let events = reporter.events();
    for kind in ServiceKind::SERVED {
        assert!(events.contains(&HealthEvent::Listening(kind)), "{events:?}");
        assert!(events.contains(&HealthEvent::Stopped(kind)), "{events:?}");
    }
    assert_eq!(events.first(), Some(&HealthEvent::SupervisorStarting));
    assert_eq!(events.last(), Some(&HealthEvent::SupervisorStopped));
}

#[rstest]
fn idle_clients_do_not_delay_stop(running: SupervisorFixture) {
    let _rf = TcpStream::connect(running.addr(ServiceKind::RegisterFile)).expect("connect");
    let _dlm = TcpStream::connect(running.addr(ServiceKind::Signal)).expect("connect");
    std::thread::sleep(Duration::from_millis(300));

    let started = Instant::now();
    running.supervisor.stop().expect("stop supervisor");
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[rstest]
fn dropping_the_supervisor_stops_it(running: SupervisorFixture) {
    let reporter = Arc::clone(&running.reporter);
    drop(running);
    assert_eq!(
        reporter.events().last(),
        Some(&HealthEvent::SupervisorStopped)
    );
}

#[rstest]
fn bind_conflict_aborts_startup() {
    let occupied = TcpListener::bind(("127.0.0.1", 0)).expect("occupy port");
    let port = occupied.local_addr().expect("occupied address").port();
    let mut endpoints = loopback_endpoints();
    endpoints[1] = (
        ServiceKind::ShiftRegister,
        ServiceEndpoint::new("127.0.0.1", port),
    );
    let reporter = Arc::new(RecordingHealthReporter::default());

    let error = Supervisor::start_with_endpoints(
        &endpoints,
        fast_options(),
        Arc::new(SimulatedDevice::new()),
        reporter.clone(),
    )
    .expect_err("startup must fail");

    assert!(matches!(
        error,
        SupervisorError::Bind {
            kind: ServiceKind::ShiftRegister,
            ..
        }
    ));
    let events = reporter.events();
    assert!(
        !events
            .iter()
            .any(|event| matches!(event, HealthEvent::Listening(_))),
        "no service may start: {events:?}"
    );
}

#[rstest]
fn data_service_cannot_be_served() {
    let endpoints = vec![(ServiceKind::Data, ServiceEndpoint::new("127.0.0.1", 0))];
    let error = Supervisor::start_with_endpoints(
        &endpoints,
        fast_options(),
        Arc::new(SimulatedDevice::new()),
        Arc::new(RecordingHealthReporter::default()),
    )
    .expect_err("data service has no server");
    assert!(matches!(error, SupervisorError::Unserved { .. }));
}

#[rstest]
fn config_ports_follow_service_offsets() {
    let base = free_port_base();
    let config = Config {
        port_base: base,
        accept_timeout_ms: 200,
        ..Config::default()
    };

    let supervisor = Supervisor::start(
        &config,
        Arc::new(SimulatedDevice::new()),
        Arc::new(RecordingHealthReporter::default()),
    )
    .expect("start supervisor");

    for kind in ServiceKind::SERVED {
        let addr = supervisor.local_addr(kind).expect("bound address");
        assert_eq!(addr.port(), base + kind.port_offset());
    }
    supervisor.stop().expect("stop supervisor");
}
