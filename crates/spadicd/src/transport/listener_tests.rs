//! Tests for the service listener.

use std::net::TcpStream;
use std::time::{Duration, Instant};

use rstest::{fixture, rstest};

use spadic_config::ServiceEndpoint;

use super::ListenerError;
use super::listener::ServiceListener;

#[fixture]
fn tcp_endpoint() -> ServiceEndpoint {
    ServiceEndpoint::new("127.0.0.1", 0)
}

#[rstest]
fn accepts_a_waiting_client(tcp_endpoint: ServiceEndpoint) {
    let listener = ServiceListener::bind(&tcp_endpoint).expect("bind listener");
    let addr = listener.local_addr().expect("local address");

    let _client = TcpStream::connect(addr).expect("connect client");
    let accepted = listener
        .accept_within(Duration::from_secs(2))
        .expect("accept");
    assert!(accepted.is_some(), "expected a connection");
}

#[rstest]
fn accept_times_out_without_clients(tcp_endpoint: ServiceEndpoint) {
    let listener = ServiceListener::bind(&tcp_endpoint).expect("bind listener");

    let started = Instant::now();
    let accepted = listener
        .accept_within(Duration::from_millis(100))
        .expect("accept");
    let elapsed = started.elapsed();

    assert!(accepted.is_none());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
}

#[rstest]
fn bind_reports_port_conflicts(tcp_endpoint: ServiceEndpoint) {
    let first = ServiceListener::bind(&tcp_endpoint).expect("bind first listener");
    let port = first.local_addr().expect("local address").port();

    let error = ServiceListener::bind(&ServiceEndpoint::new("127.0.0.1", port))
        .expect_err("second bind must fail");
    assert!(matches!(error, ListenerError::Bind { .. }), "got {error:?}");
}
