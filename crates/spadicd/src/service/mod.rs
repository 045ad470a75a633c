//! Per-service message handlers.
//!
//! A command server decodes its stream into JSON values and hands each one to
//! a [`MessageHandler`]. Handlers interpret the value, act on the device and
//! optionally answer on the connection. A handler error never closes the
//! connection; the server logs it and moves on to the next message.

mod register;
mod signal;

use std::io::Write;

use serde_json::Value;
use thiserror::Error;

use spadic_protocol::ProtocolError;

use crate::device::DeviceError;

pub use self::register::RegisterHandler;
pub use self::signal::SignalHandler;

/// Interprets decoded messages for one service.
pub trait MessageHandler: Send + Sync {
    /// Handles one decoded message, writing any response to `output`.
    fn process(&self, message: Value, output: &mut dyn Write) -> Result<(), HandlerError>;
}

/// Failures raised while handling a single message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl HandlerError {
    /// Whether the reply could not be written to the connection.
    #[must_use]
    pub fn is_transport_failure(&self) -> bool {
        matches!(self, Self::Protocol(ProtocolError::Io(_)))
    }
}
