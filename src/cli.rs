//! Command-line interface definitions using clap derive macros.
//!
//! Contains the top-level [`Cli`] parser, the [`Commands`] enum for
//! subcommands (run, init, validate), and their associated argument
//! structs. Every flag has an environment variable equivalent for
//! container deployments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "junction",
    version,
    about = "Weighted load-balancing HTTP reverse proxy",
    propagate_version = true,
    after_help = "\x1b[1mQuick start:\x1b[0m\n  \
        junction init                      Create a starter config\n  \
        junction run                       Start with ./junction.json\n  \
        junction run -c proxy.json         Start with a specific config"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Run(RunArgs),

    /// Generate a starter config file
    Init(InitArgs),

    /// Validate a config file without starting
    Validate(ValidateArgs),
}

#[derive(Args)]
#[command(after_help = "\x1b[1mExamples:\x1b[0m\n  \
        junction run                               Auto-detect ./junction.json\n  \
        junction run -c proxy.json -p 8080         Specific config and port\n  \
        junction run --pretty --log-level debug    Local dev mode")]
pub struct RunArgs {
    /// Config file path (JSON)
    #[arg(short, long, env = "CONFIG_FILE", default_value = "junction.json")]
    pub config: PathBuf,

    /// Listen address
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listen port (overrides server.http_port from the config)
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    // -- Logging --
    /// Log level
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Force pretty (human-readable) log output
    #[arg(long)]
    pub pretty: bool,

    /// Force JSON log output (overrides TTY detection)
    #[arg(long, conflicts_with = "pretty")]
    pub json: bool,

    // -- Tuning --
    /// Backend health probe interval in seconds
    #[arg(
        long,
        env = "PROBE_INTERVAL_SECS",
        default_value_t = 30,
        help_heading = "Tuning"
    )]
    pub probe_interval: u64,

    /// Max request body size in bytes
    #[arg(
        long,
        env = "MAX_BODY_SIZE",
        default_value_t = 1_048_576,
        help_heading = "Tuning"
    )]
    pub max_body: usize,
}

#[derive(Args)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "junction.json")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Config file to validate
    #[arg(default_value = "junction.json")]
    pub config: PathBuf,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn to_tracing_level(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}
