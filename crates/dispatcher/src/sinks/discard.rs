//! DiscardSink - accepts and drops everything

use contracts::{ContractError, RecordSink};

/// Sink whose writes always succeed and produce nothing
#[derive(Debug, Default)]
pub struct DiscardSink {
    name: String,
    discarded: u64,
}

impl DiscardSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discarded: 0,
        }
    }

    /// Records dropped so far
    pub fn discarded(&self) -> u64 {
        self.discarded
    }
}

impl RecordSink for DiscardSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError> {
        self.discarded += 1;
        Ok(payload.len())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        Ok(())
    }
}
