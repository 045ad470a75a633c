//! Process entry point: configuration, telemetry and supervisor lifecycle.

use std::path::Path;
use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::info;

use spadic_config::{Config, ConfigError};

use crate::device::{DeviceControl, DeviceError, SimulatedDevice};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};
use crate::supervisor::{Supervisor, SupervisorError};
use crate::telemetry::{self, TelemetryError};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the daemon configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that hands out a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced while launching or running the daemon.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfig {
        /// Validation failure.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The device could not be prepared.
    #[error("failed to prepare device: {source}")]
    Device {
        /// Underlying device error.
        #[source]
        source: DeviceError,
    },
    /// Starting or stopping the command servers failed.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    /// Waiting for a shutdown signal failed.
    #[error("failed to await shutdown: {source}")]
    Shutdown {
        /// Underlying signal error.
        #[source]
        source: ShutdownError,
    },
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<ConfigError> for LaunchError {
    fn from(source: ConfigError) -> Self {
        Self::InvalidConfig { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<DeviceError> for LaunchError {
    fn from(source: DeviceError) -> Self {
        Self::Device { source }
    }
}

impl From<ShutdownError> for LaunchError {
    fn from(source: ShutdownError) -> Self {
        Self::Shutdown { source }
    }
}

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_with(
        &SystemConfigLoader,
        &SystemShutdownSignal,
        Arc::new(StructuredHealthReporter::new()),
    )
}

/// Runs the daemon with injected collaborators.
///
/// Returns once `shutdown` fires and every command server has stopped.
pub fn run_with<L, S>(
    loader: &L,
    shutdown: &S,
    reporter: Arc<dyn HealthReporter>,
) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
{
    let config = loader.load()?;
    config.validate()?;
    telemetry::initialise(&config)?;
    info!(
        target: PROCESS_TARGET,
        host = %config.host,
        port_base = config.port_base,
        "starting daemon runtime"
    );

    let device = prepare_device(&config)?;
    let supervisor = Supervisor::start(&config, device, reporter)?;
    shutdown.wait()?;
    supervisor.stop()?;
    info!(target: PROCESS_TARGET, "daemon runtime stopped");
    Ok(())
}

fn prepare_device(config: &Config) -> Result<Arc<dyn DeviceControl>, DeviceError> {
    let device = match config.preload_path.as_deref() {
        Some(path) => SimulatedDevice::load(Path::new(path))?,
        None => SimulatedDevice::new(),
    };
    Ok(Arc::new(device))
}
