//! Handler shared by the register file and shift register services.

use std::io::Write;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use spadic_protocol::{RegisterCommand, ResponseWriter};

use super::{HandlerError, MessageHandler};
use crate::device::RegisterStore;

const REGISTER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::service::register");

/// Applies `["w", {...}]` and `["r", ...]` commands to one register store.
pub struct RegisterHandler {
    store: Arc<dyn RegisterStore>,
}

impl RegisterHandler {
    /// Creates a handler backed by `store`.
    pub fn new(store: Arc<dyn RegisterStore>) -> Self {
        Self { store }
    }
}

impl MessageHandler for RegisterHandler {
    fn process(&self, message: Value, output: &mut dyn Write) -> Result<(), HandlerError> {
        match RegisterCommand::from_value(message)? {
            RegisterCommand::Write(values) => {
                debug!(target: REGISTER_TARGET, count = values.len(), "write");
                self.store.write(&values)?;
            }
            RegisterCommand::Read(selection) => {
                let selected = selection.apply(self.store.read()?)?;
                debug!(target: REGISTER_TARGET, count = selected.len(), "read");
                ResponseWriter::new(output).write_registers(&selected)?;
            }
        }
        Ok(())
    }
}
