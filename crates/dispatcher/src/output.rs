//! OutputSink - the configured sink as a closed set of variants

use contracts::{ContractError, OutputConfig, OutputFormat, RecordSink, DISCARD_FILENAME};
use tracing::info;

use crate::error::DispatcherError;
use crate::hook::RotationHook;
use crate::sinks::{DiscardSink, DnsForwardSink, RotatingFileSink, StdoutSink};

/// Output sink selected from configuration
pub enum OutputSink {
    Stdout(StdoutSink),
    File(RotatingFileSink),
    DnsForward(DnsForwardSink),
    Discard(DiscardSink),
}

/// Build the sink for `config`
///
/// - `output = dns` forwards to `servers`
/// - empty `filename` writes to stdout
/// - `filename = "-"` discards
/// - any other `filename` is a rotating path template
pub fn create_sink(config: &OutputConfig) -> Result<OutputSink, DispatcherError> {
    let sink = if config.format == OutputFormat::Dns {
        OutputSink::DnsForward(
            DnsForwardSink::new("dns", &config.servers)
                .map_err(|e| DispatcherError::sink_creation("dns", e.to_string()))?,
        )
    } else if config.filename.is_empty() {
        OutputSink::Stdout(StdoutSink::new("stdout"))
    } else if config.filename == DISCARD_FILENAME {
        OutputSink::Discard(DiscardSink::new("discard"))
    } else {
        let hook = RotationHook::parse(&config.rotate_exec);
        OutputSink::File(
            RotatingFileSink::new("file", config.filename.as_str(), hook)
                .map_err(|e| DispatcherError::sink_creation("file", e.to_string()))?,
        )
    };

    info!(sink = sink.name(), output = %config.format, "output sink created");
    Ok(sink)
}

impl RecordSink for OutputSink {
    fn name(&self) -> &str {
        match self {
            Self::Stdout(s) => s.name(),
            Self::File(s) => s.name(),
            Self::DnsForward(s) => s.name(),
            Self::Discard(s) => s.name(),
        }
    }

    async fn write(&mut self, payload: &[u8]) -> Result<usize, ContractError> {
        match self {
            Self::Stdout(s) => s.write(payload).await,
            Self::File(s) => s.write(payload).await,
            Self::DnsForward(s) => s.write(payload).await,
            Self::Discard(s) => s.write(payload).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Stdout(s) => s.flush().await,
            Self::File(s) => s.flush().await,
            Self::DnsForward(s) => s.flush().await,
            Self::Discard(s) => s.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Stdout(s) => s.close().await,
            Self::File(s) => s.close().await,
            Self::DnsForward(s) => s.close().await,
            Self::Discard(s) => s.close().await,
        }
    }
}
