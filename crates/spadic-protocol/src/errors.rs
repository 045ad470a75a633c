//! Errors raised while interpreting decoded messages.

use std::io;

use thiserror::Error;

/// Reasons a decoded message cannot be acted on.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A register request was not a two-element array.
    #[error("expected a [command, payload] pair, got {found}")]
    NotAPair {
        /// Short description of the received value.
        found: String,
    },

    /// The command element was not a string.
    #[error("command must be a string, got {found}")]
    CommandNotString {
        /// Short description of the received value.
        found: String,
    },

    /// The command tag is neither `r` nor `w`.
    #[error("unknown command '{command}'")]
    UnknownCommand {
        /// Tag as received.
        command: String,
    },

    /// A write payload was not an object.
    #[error("write payload must map register names to values, got {found}")]
    InvalidWritePayload {
        /// Short description of the received value.
        found: String,
    },

    /// A register value was not an unsigned integer.
    #[error("register '{name}' must be an unsigned integer")]
    InvalidRegisterValue {
        /// Register whose value was rejected.
        name: String,
    },

    /// A read payload was neither `"all"` nor a list of names.
    #[error("read payload must be \"all\" or a list of register names, got {found}")]
    InvalidReadPayload {
        /// Short description of the received value.
        found: String,
    },

    /// A selective read named a register the store does not hold.
    #[error("unknown register '{name}'")]
    UnknownRegister {
        /// Requested register name.
        name: String,
    },

    /// A signal message was not a number.
    #[error("signal must be a number, got {found}")]
    NotANumber {
        /// Short description of the received value.
        found: String,
    },

    /// Response serialisation failed.
    #[error("failed to serialise response: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Writing the response failed.
    #[error("failed to write response: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// Creates an unknown register error.
    pub fn unknown_register(name: impl Into<String>) -> Self {
        Self::UnknownRegister { name: name.into() }
    }
}
