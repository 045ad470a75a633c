//! Shared configuration for the SPADIC control server.
//!
//! [`Config`] is layered with `ortho_config`: built-in defaults, an optional
//! configuration file, `SPADIC_*` environment variables and command-line
//! flags, in increasing order of precedence. The crate also owns the fixed
//! service-to-port assignment so every consumer derives the same ports from
//! one base value.

mod defaults;
mod logging;
mod service;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_ACCEPT_TIMEOUT_MS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_MAX_LINE_BYTES,
    DEFAULT_PORT_BASE, DEFAULT_READ_CHUNK_BYTES, default_accept_timeout_ms, default_host,
    default_log_filter, default_log_filter_string, default_log_format, default_max_line_bytes,
    default_port_base, default_read_chunk_bytes,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use service::{PortError, ServiceEndpoint, ServiceKind};

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "SPADIC")]
pub struct Config {
    /// Host the service listeners bind to.
    #[serde(default = "defaults::default_host")]
    pub host: String,
    /// Base port; see [`ServiceKind::port_offset`].
    #[serde(default = "defaults::default_port_base")]
    pub port_base: u16,
    /// Accept timeout in milliseconds. Also bounds idle reads.
    #[serde(default = "defaults::default_accept_timeout_ms")]
    pub accept_timeout_ms: u64,
    /// Bytes requested per read on an accepted connection.
    #[serde(default = "defaults::default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Longest request line kept before it is discarded.
    #[serde(default = "defaults::default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
    /// JSON snapshot used to preload the simulated device registers.
    #[serde(default)]
    pub preload_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port_base: DEFAULT_PORT_BASE,
            accept_timeout_ms: DEFAULT_ACCEPT_TIMEOUT_MS,
            read_chunk_bytes: DEFAULT_READ_CHUNK_BYTES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            preload_path: None,
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Accept timeout as a [`Duration`].
    #[must_use]
    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }

    /// Endpoint for the given service.
    pub fn endpoint(&self, service: ServiceKind) -> Result<ServiceEndpoint, PortError> {
        Ok(ServiceEndpoint::new(
            self.host.clone(),
            service.port(self.port_base)?,
        ))
    }

    /// Rejects values the daemon cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accept_timeout_ms == 0 {
            return Err(ConfigError::ZeroAcceptTimeout);
        }
        if self.read_chunk_bytes == 0 {
            return Err(ConfigError::ZeroReadChunk);
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::ZeroLineBound);
        }
        for service in ServiceKind::ALL {
            service.port(self.port_base)?;
        }
        Ok(())
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The accept timeout must be positive.
    #[error("accept_timeout_ms must be greater than zero")]
    ZeroAcceptTimeout,
    /// The read chunk size must be positive.
    #[error("read_chunk_bytes must be greater than zero")]
    ZeroReadChunk,
    /// The line bound must be positive.
    #[error("max_line_bytes must be greater than zero")]
    ZeroLineBound,
    /// A service port falls outside the TCP range.
    #[error(transparent)]
    Port(#[from] PortError),
}
