//! Narrow interface to the device-control object.
//!
//! The command servers never talk to hardware directly. They hold the
//! register stores and the signal sender handed out by a [`DeviceControl`]
//! implementation, and every implementation must tolerate calls from all
//! three service threads at once.

mod simulated;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Number;
use thiserror::Error;

use spadic_protocol::RegisterMap;

pub use simulated::{DeviceSnapshot, MemoryRegisterStore, RecordingSignalSender, SimulatedDevice};

pub(crate) const DEVICE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");

/// Named register values held by the device.
pub trait RegisterStore: Send + Sync {
    /// Writes every entry of `values`.
    fn write(&self, values: &RegisterMap) -> Result<(), DeviceError>;

    /// Reads the full register set.
    fn read(&self) -> Result<RegisterMap, DeviceError>;
}

/// Transmits debug-link-module signals.
pub trait SignalSender: Send + Sync {
    /// Sends one signal value.
    fn send(&self, value: &Number) -> Result<(), DeviceError>;
}

/// Device-control object owned by the supervisor.
pub trait DeviceControl: Send + Sync + 'static {
    /// Register file store.
    fn register_file(&self) -> Arc<dyn RegisterStore>;

    /// Shift register store.
    fn shift_register(&self) -> Arc<dyn RegisterStore>;

    /// DLM signal sender.
    fn dlm_sender(&self) -> Arc<dyn SignalSender>;
}

/// Failures reported by device collaborators.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// A lock guarding device state was poisoned by a panicking thread.
    #[error("device state lock poisoned: {resource}")]
    Poisoned {
        /// Resource whose lock was poisoned.
        resource: &'static str,
    },
    /// A register snapshot file could not be read.
    #[error("failed to read register snapshot '{path}': {source}")]
    SnapshotRead {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A register snapshot file did not contain valid JSON.
    #[error("failed to parse register snapshot '{path}': {source}")]
    SnapshotParse {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}
