//! Layered error definitions
//!
//! Categorized by source: config / bus / decode / format / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Bus Errors =====
    /// Bus connection error
    #[error("can't connect to bus at '{endpoint}': {message}")]
    BusConnection { endpoint: String, message: String },

    /// Bus subscription error
    #[error("can't subscribe to '{subject}': {message}")]
    BusSubscribe { subject: String, message: String },

    // ===== Record Errors =====
    /// Batch payload is not a JSON array of records
    #[error("can't parse batch payload: {message}")]
    PayloadDecode { message: String },

    /// Formatter rejected a record
    #[error("{formatter} formatter failed: {message}")]
    Format {
        formatter: &'static str,
        message: String,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// One or more forward destinations rejected a write
    #[error("sink '{sink_name}' failed for {} of {total} destinations: {}", failures.len(), failures.join("; "))]
    ForwardFailed {
        sink_name: String,
        total: usize,
        failures: Vec<String>,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create bus connection error
    pub fn bus_connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BusConnection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create payload decode error
    pub fn payload_decode(message: impl Into<String>) -> Self {
        Self::PayloadDecode {
            message: message.into(),
        }
    }

    /// Create formatter error
    pub fn format(formatter: &'static str, message: impl Into<String>) -> Self {
        Self::Format {
            formatter,
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_failed_lists_destinations() {
        let err = ContractError::ForwardFailed {
            sink_name: "dns".into(),
            total: 3,
            failures: vec![
                "10.0.0.1:53: refused".into(),
                "10.0.0.2:53: timeout".into(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 of 3"), "got: {msg}");
        assert!(msg.contains("10.0.0.2:53: timeout"), "got: {msg}");
    }
}
