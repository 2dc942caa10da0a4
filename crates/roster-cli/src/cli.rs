use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

/// Log level for tracing output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    Off,
    /// Error messages only
    Error,
    /// Warnings and errors (default)
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
    /// Trace-level messages (most verbose)
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::OFF,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "roster - reconcile user identities across external systems into a CSV ledger")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Set log level (off, error, warn, info, debug, trace).
    /// If not specified, RUST_LOG is honoured, else 'warn'
    #[arg(short = 'l', long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Enable verbose logging (shortcut for --log-level=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (defaults to ~/.config/roster/config.toml)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds (overrides config file)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

impl Cli {
    /// Explicit level from flags; `None` defers to `RUST_LOG`
    pub fn level_filter(&self) -> Option<LevelFilter> {
        if self.verbose {
            Some(LevelFilter::DEBUG)
        } else {
            self.log_level.map(LevelFilter::from)
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill blank identity columns in a CSV ledger from external systems
    Populate {
        /// Ledger CSV file (rewritten in place)
        csv_path: PathBuf,

        /// Column to reconcile, e.g. `pagerduty` or `aws_sso:arn:...` (repeatable).
        /// Defaults to every non-identity column in the ledger
        #[arg(short = 'i', long = "integration", value_name = "KEY")]
        integrations: Vec<String>,

        /// Pull every identity from connectors that can list them, not only blanks
        #[arg(long, overrides_with = "no_import_new")]
        import_new: bool,

        /// Only fill blanks (default)
        #[arg(long, overrides_with = "import_new", hide = true)]
        no_import_new: bool,
    },

    /// List PagerDuty users as `email,name`
    PagerdutyUsers {
        /// PagerDuty API token
        #[arg(long, env = "PD_API_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Show users that match the specified string
        #[arg(long = "match", value_name = "TEXT")]
        query: Option<String>,

        /// Show only the email addresses
        #[arg(long)]
        email_only: bool,
    },

    /// Look up AWS Identity Store user ids for usernames
    IdentitystoreUserids {
        /// Usernames to look up
        usernames: Vec<String>,

        /// Identity store to search (required when more than one SSO instance exists)
        #[arg(long)]
        identitystore_id: Option<String>,

        /// Read usernames from the first column of a CSV (header row skipped)
        #[arg(long)]
        infile: Option<PathBuf>,

        /// Also write the results to a CSV file
        #[arg(long)]
        outfile: Option<PathBuf>,
    },

    /// List the registered integrations
    Integrations,

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize a new config file
    Init {
        /// Path for config file (defaults to ~/.config/roster/config.toml)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,
}
