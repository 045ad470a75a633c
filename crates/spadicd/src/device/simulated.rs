//! In-memory device used when no hardware is attached.

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde::Deserialize;
use serde_json::Number;
use tracing::{debug, info};

use spadic_protocol::RegisterMap;

use super::{DEVICE_TARGET, DeviceControl, DeviceError, RegisterStore, SignalSender};

/// Register store backed by a mutex-guarded map.
#[derive(Debug)]
pub struct MemoryRegisterStore {
    name: &'static str,
    registers: Mutex<RegisterMap>,
}

impl MemoryRegisterStore {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(name: &'static str, initial: RegisterMap) -> Self {
        Self {
            name,
            registers: Mutex::new(initial),
        }
    }
}

impl RegisterStore for MemoryRegisterStore {
    fn write(&self, values: &RegisterMap) -> Result<(), DeviceError> {
        let mut registers = self
            .registers
            .lock()
            .map_err(|_| DeviceError::Poisoned { resource: self.name })?;
        registers.extend(values.iter().map(|(name, value)| (name.clone(), *value)));
        debug!(
            target: DEVICE_TARGET,
            store = self.name,
            count = values.len(),
            "registers written"
        );
        Ok(())
    }

    fn read(&self) -> Result<RegisterMap, DeviceError> {
        self.registers
            .lock()
            .map(|registers| registers.clone())
            .map_err(|_| DeviceError::Poisoned { resource: self.name })
    }
}

/// Signal sender that records every value it transmits.
#[derive(Debug, Default)]
pub struct RecordingSignalSender {
    sent: Mutex<Vec<Number>>,
}

impl RecordingSignalSender {
    /// Values sent so far, oldest first.
    #[must_use]
    pub fn sent(&self) -> Vec<Number> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

impl SignalSender for RecordingSignalSender {
    fn send(&self, value: &Number) -> Result<(), DeviceError> {
        self.sent
            .lock()
            .map_err(|_| DeviceError::Poisoned { resource: "dlm" })?
            .push(value.clone());
        info!(target: DEVICE_TARGET, dlm = %value, "DLM sent");
        Ok(())
    }
}

/// Initial register contents for a [`SimulatedDevice`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceSnapshot {
    /// Register file contents.
    #[serde(default)]
    pub register_file: RegisterMap,
    /// Shift register contents.
    #[serde(default)]
    pub shift_register: RegisterMap,
}

/// Device-control object that keeps all state in memory.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    register_file: Arc<MemoryRegisterStore>,
    shift_register: Arc<MemoryRegisterStore>,
    dlm: Arc<RecordingSignalSender>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::from_snapshot(DeviceSnapshot::default())
    }
}

impl SimulatedDevice {
    /// Creates a device with empty registers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device preloaded with `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: DeviceSnapshot) -> Self {
        Self {
            register_file: Arc::new(MemoryRegisterStore::new(
                "register_file",
                snapshot.register_file,
            )),
            shift_register: Arc::new(MemoryRegisterStore::new(
                "shift_register",
                snapshot.shift_register,
            )),
            dlm: Arc::new(RecordingSignalSender::default()),
        }
    }

    /// Loads a JSON snapshot file and builds a device from it.
    pub fn load(path: &Path) -> Result<Self, DeviceError> {
        let contents = fs::read_to_string(path).map_err(|source| DeviceError::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: DeviceSnapshot =
            serde_json::from_str(&contents).map_err(|source| DeviceError::SnapshotParse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            target: DEVICE_TARGET,
            path = %path.display(),
            register_file = snapshot.register_file.len(),
            shift_register = snapshot.shift_register.len(),
            "register snapshot loaded"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// DLM values transmitted so far.
    #[must_use]
    pub fn sent_signals(&self) -> Vec<Number> {
        self.dlm.sent()
    }
}

impl DeviceControl for SimulatedDevice {
    fn register_file(&self) -> Arc<dyn RegisterStore> {
        self.register_file.clone()
    }

    fn shift_register(&self) -> Arc<dyn RegisterStore> {
        self.shift_register.clone()
    }

    fn dlm_sender(&self) -> Arc<dyn SignalSender> {
        self.dlm.clone()
    }
}
