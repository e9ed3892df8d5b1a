//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use contracts::{split_servers, LogLevel, OutputFormat, RelayConfig};
use std::path::PathBuf;

/// taprelay - relay DNS query telemetry from a message bus to a sink
#[derive(Parser, Debug)]
#[command(
    name = "taprelay",
    author,
    version,
    about = "Relay DNS query telemetry from NATS to stdout, rotating files or DNS servers",
    long_about = "Subscribes to a NATS subject carrying batches of DNS query telemetry,\n\
                  buffers them against slow output, and re-emits every record as a\n\
                  template line, a JSON object, or a replayed DNS query."
)]
pub struct Cli {
    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "TAPRELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay
    Run(RunArgs),

    /// Validate configuration without subscribing
    Validate(ValidateArgs),
}

impl Commands {
    pub fn config_args(&self) -> &ConfigArgs {
        match self {
            Self::Run(args) => &args.config,
            Self::Validate(args) => &args.config,
        }
    }
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "TAPRELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Configuration file plus per-key overrides
///
/// Every override is optional; a value given here wins over the file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, env = "TAPRELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (debug, info, warn, error, fatal)
    #[arg(long, env = "TAPRELAY_LOGLEVEL")]
    pub loglevel: Option<LogLevel>,

    /// Validate and exit without subscribing
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "TAPRELAY_DRY_RUN")]
    pub dry_run: Option<bool>,

    /// Activation start, RFC 3339 (default now)
    #[arg(long, env = "TAPRELAY_START")]
    pub start: Option<String>,

    /// Activation end, RFC 3339 (default never)
    #[arg(long, env = "TAPRELAY_END")]
    pub end: Option<String>,

    /// Buffer capacity in payloads (<= 0 = default)
    #[arg(long, allow_negative_numbers = true, env = "TAPRELAY_QUEUE_SIZE")]
    pub queue_size: Option<i64>,

    /// Statistics interval in seconds
    #[arg(long, env = "TAPRELAY_STATS_INTERVAL")]
    pub stats_interval: Option<u64>,

    /// Output format (line, json, dns)
    #[arg(long, env = "TAPRELAY_OUTPUT")]
    pub output: Option<OutputFormat>,

    /// Line template
    #[arg(long, env = "TAPRELAY_TEMPLATE")]
    pub template: Option<String>,

    /// Output path template ("" = stdout, "-" = discard)
    #[arg(long, env = "TAPRELAY_FILENAME")]
    pub filename: Option<String>,

    /// Command run with the rotated-out file as last argument
    #[arg(long, env = "TAPRELAY_ROTATE_EXEC")]
    pub rotate_exec: Option<String>,

    /// Comma-separated DNS replay destinations
    #[arg(long, env = "TAPRELAY_SERVERS")]
    pub servers: Option<String>,

    /// Set Recursion Desired on replayed queries
    #[arg(long, num_args = 0..=1, default_missing_value = "true", env = "TAPRELAY_DNS_RD")]
    pub dns_rd: Option<bool>,

    /// NATS server URL
    #[arg(long = "host", env = "TAPRELAY_NATS_HOST")]
    pub nats_host: Option<String>,

    /// NATS subject
    #[arg(long = "subject", env = "TAPRELAY_NATS_SUBJECT")]
    pub nats_subject: Option<String>,

    /// NATS queue group
    #[arg(long = "group", env = "TAPRELAY_NATS_GROUP")]
    pub nats_group: Option<String>,

    /// NATS token
    #[arg(long = "token", env = "TAPRELAY_NATS_TOKEN", hide_env_values = true)]
    pub nats_token: Option<String>,

    /// NATS user
    #[arg(long = "user", env = "TAPRELAY_NATS_USER")]
    pub nats_user: Option<String>,

    /// NATS password
    #[arg(long = "password", env = "TAPRELAY_NATS_PASSWORD", hide_env_values = true)]
    pub nats_password: Option<String>,
}

impl ConfigArgs {
    /// Overlay the given overrides onto `config`
    pub fn apply(&self, config: &mut RelayConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.loglevel, &self.loglevel);
        set(&mut config.dry_run, &self.dry_run);
        set(&mut config.queue_size, &self.queue_size);
        set(&mut config.stats_interval, &self.stats_interval);
        if self.start.is_some() {
            config.start = self.start.clone();
        }
        if self.end.is_some() {
            config.end = self.end.clone();
        }

        let output = &mut config.output;
        set(&mut output.format, &self.output);
        set(&mut output.template, &self.template);
        set(&mut output.filename, &self.filename);
        set(&mut output.rotate_exec, &self.rotate_exec);
        set(&mut output.dns_rd, &self.dns_rd);
        if let Some(servers) = &self.servers {
            output.servers = split_servers(servers);
        }

        let nats = &mut config.nats;
        set(&mut nats.host, &self.nats_host);
        set(&mut nats.subject, &self.nats_subject);
        set(&mut nats.token, &self.nats_token);
        set(&mut nats.user, &self.nats_user);
        set(&mut nats.password, &self.nats_password);
        if self.nats_group.is_some() {
            nats.group = self.nats_group.clone();
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_win() {
        let cli = Cli::try_parse_from([
            "taprelay",
            "run",
            "--output",
            "dns",
            "--servers",
            "127.0.0.1, tcp://10.0.0.1:5353",
            "--dns-rd",
            "--queue-size",
            "-1",
            "--subject",
            "tap.edge",
            "--group",
            "relays",
        ])
        .unwrap();

        let mut config = RelayConfig::default();
        config.output.dns_rd = false;
        cli.command.config_args().apply(&mut config);

        assert_eq!(config.output.format, OutputFormat::Dns);
        assert_eq!(config.output.servers, vec!["127.0.0.1", "tcp://10.0.0.1:5353"]);
        assert!(config.output.dns_rd);
        assert_eq!(config.queue_size, -1);
        assert_eq!(config.nats.subject, "tap.edge");
        assert_eq!(config.nats.group.as_deref(), Some("relays"));
    }

    #[test]
    fn test_absent_overrides_keep_file_values() {
        let cli = Cli::try_parse_from(["taprelay", "validate", "--json"]).unwrap();

        let mut config = RelayConfig::default();
        config.output.filename = "/var/log/tap/%Y%m%d.log".to_string();
        config.nats.token = "secret".to_string();
        cli.command.config_args().apply(&mut config);

        assert_eq!(config.output.filename, "/var/log/tap/%Y%m%d.log");
        assert_eq!(config.nats.token, "secret");
    }

    #[test]
    fn test_bool_override_can_clear() {
        let cli = Cli::try_parse_from(["taprelay", "run", "--dns-rd=false"]).unwrap();
        let mut config = RelayConfig::default();
        config.output.dns_rd = true;
        cli.command.config_args().apply(&mut config);
        assert!(!config.output.dns_rd);
    }

    #[test]
    fn test_unknown_output_rejected() {
        assert!(Cli::try_parse_from(["taprelay", "run", "--output", "xml"]).is_err());
    }
}
