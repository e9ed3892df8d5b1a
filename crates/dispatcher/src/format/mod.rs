//! Record formatters
//!
//! A [`Formatter`] turns one decoded [`TelemetryRecord`] into the bytes handed
//! to the output sink. It is built once at startup from [`OutputConfig`].

mod dns;
mod json;
mod line;

pub use self::dns::DnsFormatter;
pub use self::json::JsonFormatter;
pub use self::line::LineFormatter;

use contracts::{ContractError, OutputConfig, OutputFormat, TelemetryRecord};

use crate::error::DispatcherError;

/// Formatter selected by the `output` setting
pub enum Formatter {
    Line(LineFormatter),
    Json(JsonFormatter),
    Dns(DnsFormatter),
}

impl Formatter {
    /// Build the formatter, compiling the line template if selected
    ///
    /// # Errors
    /// A template that fails to compile.
    pub fn from_config(config: &OutputConfig) -> Result<Self, DispatcherError> {
        let formatter = match config.format {
            OutputFormat::Line => Self::Line(LineFormatter::new(&config.template)?),
            OutputFormat::Json => Self::Json(JsonFormatter),
            OutputFormat::Dns => Self::Dns(DnsFormatter::new(config.dns_rd)),
        };
        Ok(formatter)
    }

    pub fn kind(&self) -> OutputFormat {
        match self {
            Self::Line(_) => OutputFormat::Line,
            Self::Json(_) => OutputFormat::Json,
            Self::Dns(_) => OutputFormat::Dns,
        }
    }

    /// Render one record
    pub fn format(&self, record: &TelemetryRecord) -> Result<Vec<u8>, ContractError> {
        match self {
            Self::Line(f) => f.format(record),
            Self::Json(f) => f.format(record),
            Self::Dns(f) => f.format(record),
        }
    }
}
