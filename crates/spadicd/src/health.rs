//! Structured health reporting for supervisor lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use spadic_config::ServiceKind;

use crate::supervisor::SupervisorError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before any service is bound.
    fn supervisor_starting(&self);

    /// Invoked once a service listener is bound.
    fn service_listening(&self, kind: ServiceKind, addr: SocketAddr);

    /// Invoked after a service thread has been joined.
    fn service_stopped(&self, kind: ServiceKind);

    /// Invoked when a service fails to start or terminates abnormally.
    fn service_failed(&self, kind: ServiceKind, error: &SupervisorError);

    /// Invoked after every service thread has been joined.
    fn supervisor_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn supervisor_starting(&self) {
        (**self).supervisor_starting();
    }

    fn service_listening(&self, kind: ServiceKind, addr: SocketAddr) {
        (**self).service_listening(kind, addr);
    }

    fn service_stopped(&self, kind: ServiceKind) {
        (**self).service_stopped(kind);
    }

    fn service_failed(&self, kind: ServiceKind, error: &SupervisorError) {
        (**self).service_failed(kind, error);
    }

    fn supervisor_stopped(&self) {
        (**self).supervisor_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn supervisor_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "supervisor_starting",
            "starting command servers"
        );
    }

    fn service_listening(&self, kind: ServiceKind, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_listening",
            service = %kind,
            thread = kind.thread_name(),
            addr = %addr,
            "service listening"
        );
    }

    fn service_stopped(&self, kind: ServiceKind) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "service_stopped",
            service = %kind,
            thread = kind.thread_name(),
            "service stopped"
        );
    }

    fn service_failed(&self, kind: ServiceKind, error: &SupervisorError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "service_failed",
            service = %kind,
            error = %error,
            "service failed"
        );
    }

    fn supervisor_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "supervisor_stopped",
            "all command servers stopped"
        );
    }
}
