use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "hbl",
    about = "Block-list enforcement across edge ACLs and RBL zones",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Log level
    #[arg(long, env = "HBL_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a block and push it to every endpoint
    Block {
        ip: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        comment: String,
    },

    /// Record an allow (endpoints are not touched)
    Allow {
        ip: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        comment: String,
    },

    /// Remove a record, unblocking it on every endpoint first
    Delete { ip: String },

    /// Show one record, or all of them
    List { ip: Option<String> },

    /// Re-push blocked records to every endpoint
    Sync { ip: Option<String> },

    /// Look up an address with a reputation checker
    Check { checker: String, ip: String },

    /// List registered endpoints, checkers and alerters
    Backends,
}
