//! StdoutSink - newline-terminated records on standard output

use contracts::{ContractError, RecordSink};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

type Output = Box<dyn AsyncWrite + Send + Unpin>;

/// Sink that writes each record followed by a newline
pub struct StdoutSink {
    name: String,
    out: Output,
}

impl StdoutSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_writer(name, tokio::io::stdout())
    }

    /// Write to `out` instead of the process stdout
    pub fn with_writer(name: impl Into<String>, out: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            name: name.into(),
            out: Box::new(out),
        }
    }

    fn write_error(&self, e: std::io::Error) -> ContractError {
        ContractError::sink_write(&self.name, e.to_string())
    }
}

impl RecordSink for StdoutSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "stdout_sink_write",
        skip(self, payload),
        fields(sink = %self.name, bytes = payload.len())
    )]
    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError> {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');
        self.out.write_all(&line).await.map_err(|e| self.write_error(e))?;
        Ok(line.len())
    }

    #[instrument(name = "stdout_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.out.flush().await.map_err(|e| self.write_error(e))
    }

    #[instrument(name = "stdout_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, "StdoutSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_records_are_newline_terminated() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        let mut sink = StdoutSink::with_writer("stdout", writer);

        assert_eq!(sink.write(b"first").await.unwrap(), 6);
        sink.write(b"second").await.unwrap();
        sink.close().await.unwrap();
        drop(sink);

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "first\nsecond\n");
    }
}
