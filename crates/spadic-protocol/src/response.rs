//! Response serialisation for register reads.

use std::io::Write;

use crate::errors::ProtocolError;
use crate::request::RegisterMap;

/// Writer that frames register snapshots as JSON lines.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes `registers` as one JSON object followed by a newline, then
    /// flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation, writing or flushing fails.
    pub fn write_registers(&mut self, registers: &RegisterMap) -> Result<(), ProtocolError> {
        let mut line = serde_json::to_vec(registers)?;
        line.push(b'\n');
        self.writer.write_all(&line)?;
        self.writer.flush()?;
        Ok(())
    }
}
