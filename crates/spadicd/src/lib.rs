//! Control server for a SPADIC readout chip.
//!
//! The daemon exposes three TCP services on consecutive ports above a
//! configurable base: the register file, the shift register and the DLM
//! signal channel. Each service speaks line-delimited JSON (see
//! [`spadic_protocol`]) and runs on its own named thread. The [`Supervisor`]
//! binds every service up front, shares a single shutdown flag between the
//! threads and joins them on stop.
//!
//! Device access sits behind the [`DeviceControl`] trait. The bundled
//! [`SimulatedDevice`] keeps registers in memory and can be preloaded from a
//! JSON snapshot.

mod device;
mod health;
mod process;
mod server;
mod service;
mod shutdown;
mod supervisor;
pub mod telemetry;
mod transport;

pub use device::{
    DeviceControl, DeviceError, DeviceSnapshot, MemoryRegisterStore, RecordingSignalSender,
    RegisterStore, SignalSender, SimulatedDevice,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use process::{
    ConfigLoader, LaunchError, StaticConfigLoader, SystemConfigLoader, run_daemon, run_with,
};
pub use server::{AcceptOutcome, CommandServer, ServeOutcome, ServerOptions};
pub use service::{HandlerError, MessageHandler, RegisterHandler, SignalHandler};
pub use shutdown::{ShutdownError, ShutdownFlag, ShutdownSignal, SystemShutdownSignal};
pub use supervisor::{Supervisor, SupervisorError};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
