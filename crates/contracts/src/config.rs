//! RelayConfig - Config Loader output
//!
//! Describes the whole relay: activation window, buffer size, output
//! formatting/routing and the bus connection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::ContractError;

/// Default Bounded Drop Buffer capacity
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;

/// Default line template
pub const DEFAULT_TEMPLATE: &str = "{{.Type }} {{ .Timestamp }} {{ .Qclass }} {{ .Qtype }} {{ .Qname }}";

/// Default statistics interval in seconds
pub const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;

/// Filename selecting the discard sink
pub const DISCARD_FILENAME: &str = "-";

/// Complete relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelayConfig {
    /// Log level
    #[serde(default)]
    pub loglevel: LogLevel,

    /// Validate and exit without subscribing
    #[serde(default)]
    pub dry_run: bool,

    /// Activation start (RFC 3339), None = now
    #[serde(default)]
    pub start: Option<String>,

    /// Activation end (RFC 3339), None = never
    #[serde(default)]
    pub end: Option<String>,

    /// Buffer capacity override, <= 0 = default
    #[serde(default)]
    pub queue_size: i64,

    /// Statistics interval in seconds
    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,

    /// Formatter and sink selection
    #[serde(flatten)]
    pub output: OutputConfig,

    /// Bus connection
    #[serde(default)]
    pub nats: NatsConfig,
}

fn default_stats_interval() -> u64 {
    DEFAULT_STATS_INTERVAL_SECS
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            loglevel: LogLevel::default(),
            dry_run: false,
            start: None,
            end: None,
            queue_size: 0,
            stats_interval: DEFAULT_STATS_INTERVAL_SECS,
            output: OutputConfig::default(),
            nats: NatsConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Effective buffer capacity
    pub fn queue_capacity(&self) -> usize {
        if self.queue_size <= 0 {
            DEFAULT_QUEUE_SIZE
        } else {
            self.queue_size as usize
        }
    }
}

/// Formatter and sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Output format
    #[serde(rename = "output", default)]
    pub format: OutputFormat,

    /// Line formatter template
    #[serde(default = "default_template")]
    pub template: String,

    /// Path template, "" = stdout, "-" = discard
    #[serde(default)]
    pub filename: String,

    /// Command run after rotation, receives the rotated-out path
    #[serde(default)]
    pub rotate_exec: String,

    /// DNS replay destinations
    #[serde(default, deserialize_with = "deserialize_servers")]
    pub servers: Vec<String>,

    /// Recursion Desired bit for replayed queries
    #[serde(default)]
    pub dns_rd: bool,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            template: default_template(),
            filename: String::new(),
            rotate_exec: String::new(),
            servers: Vec::new(),
            dns_rd: false,
        }
    }
}

/// Accepts either a list or a comma-separated string
fn deserialize_servers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Servers {
        Joined(String),
        List(Vec<String>),
    }

    let servers = match Servers::deserialize(deserializer)? {
        Servers::Joined(joined) => split_servers(&joined),
        Servers::List(list) => list,
    };
    Ok(servers)
}

/// Split a comma-separated destination list, dropping empty items
pub fn split_servers(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered text template
    #[default]
    Line,
    /// One JSON object per record
    Json,
    /// DNS query wire format, for replay
    Dns,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Line => "line",
            Self::Json => "json",
            Self::Dns => "dns",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "line" => Ok(Self::Line),
            "json" => Ok(Self::Json),
            "dns" => Ok(Self::Dns),
            other => Err(ContractError::config_validation(
                "output",
                format!("not support output `{other}`"),
            )),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Directive understood by tracing's EnvFilter
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Fatal => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(ContractError::config_validation(
                "loglevel",
                format!("not support loglevel `{other}`"),
            )),
        }
    }
}

/// NATS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NatsConfig {
    /// Server URL
    #[serde(default = "default_nats_host")]
    pub host: String,

    /// Subject carrying batch payloads
    #[serde(default = "default_nats_subject")]
    pub subject: String,

    /// Queue group, None = plain subscription
    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub token: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,
}

fn default_nats_host() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_nats_subject() -> String {
    "dnstap".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            host: default_nats_host(),
            subject: default_nats_subject(),
            group: None,
            token: String::new(),
            user: String::new(),
            password: String::new(),
        }
    }
}

impl NatsConfig {
    /// Credential policy: token, then user/password, then none
    pub fn credentials(&self) -> BusCredentials {
        if !self.token.is_empty() {
            BusCredentials::Token(self.token.clone())
        } else if !self.user.is_empty() {
            BusCredentials::UserPassword {
                user: self.user.clone(),
                password: self.password.clone(),
            }
        } else {
            BusCredentials::Anonymous
        }
    }
}

/// Bus authentication, mutually exclusive
#[derive(Clone, PartialEq, Eq)]
pub enum BusCredentials {
    Token(String),
    UserPassword { user: String, password: String },
    Anonymous,
}

impl BusCredentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Token(_) => "token",
            Self::UserPassword { .. } => "user",
            Self::Anonymous => "none",
        }
    }
}

impl fmt::Debug for BusCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::UserPassword { user, .. } => write!(f, "UserPassword({user}, ***)"),
            Self::Anonymous => f.write_str("Anonymous"),
        }
    }
}
