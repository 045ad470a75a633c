use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Services exposed by the control server, one TCP port each.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum ServiceKind {
    /// Register file read/write service.
    RegisterFile,
    /// Shift register read/write service.
    ShiftRegister,
    /// Data channel. The port is reserved; no server binds it.
    Data,
    /// Debug-link-module signal service.
    Signal,
}

impl ServiceKind {
    /// Every service in port order.
    pub const ALL: [Self; 4] = [
        Self::RegisterFile,
        Self::ShiftRegister,
        Self::Data,
        Self::Signal,
    ];

    /// Services that the supervisor runs a command server for.
    pub const SERVED: [Self; 3] = [Self::RegisterFile, Self::ShiftRegister, Self::Signal];

    /// Offset added to the configured base port.
    #[must_use]
    pub const fn port_offset(self) -> u16 {
        match self {
            Self::RegisterFile => 0,
            Self::ShiftRegister => 1,
            Self::Data => 2,
            Self::Signal => 3,
        }
    }

    /// Name given to the thread serving this service.
    #[must_use]
    pub const fn thread_name(self) -> &'static str {
        match self {
            Self::RegisterFile => "RF server",
            Self::ShiftRegister => "SR server",
            Self::Data => "DATA server",
            Self::Signal => "DLM server",
        }
    }

    /// Computes this service's port for the given base.
    pub fn port(self, base: u16) -> Result<u16, PortError> {
        base.checked_add(self.port_offset())
            .ok_or(PortError::Overflow { base, service: self })
    }
}

/// TCP address a single service listens on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceEndpoint {
    /// Host name or address to bind.
    pub host: String,
    /// TCP port to bind.
    pub port: u16,
}

impl ServiceEndpoint {
    /// Builds an endpoint from a host and port.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

/// Errors raised while deriving service ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// Base port plus offset does not fit in a TCP port number.
    #[error("base port {base} leaves no room for the {service} service")]
    Overflow { base: u16, service: ServiceKind },
}
