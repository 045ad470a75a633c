//! Handler for the DLM signal service.

use std::io::Write;
use std::sync::Arc;

use serde_json::Value;

use spadic_protocol::parse_signal;

use super::{HandlerError, MessageHandler};
use crate::device::SignalSender;

/// Forwards every numeric message to the DLM sender. Never answers.
pub struct SignalHandler {
    sender: Arc<dyn SignalSender>,
}

impl SignalHandler {
    pub fn new(sender: Arc<dyn SignalSender>) -> Self {
        Self { sender }
    }
}

impl MessageHandler for SignalHandler {
    fn process(&self, message: Value, _output: &mut dyn Write) -> Result<(), HandlerError> {
        let value = parse_signal(message)?;
        self.sender.send(&value)?;
        Ok(())
    }
}
