//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ratelimiter - paced task admission demo
#[derive(Parser)]
#[command(
    name = "ratelimiter",
    about = "Run tasks through a rate limiter with priority and preemptible queues",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submit synthetic tasks and print when each one is dispatched
    Demo {
        /// Number of priority tasks
        #[arg(short, long, default_value = "6")]
        priority: usize,

        /// Number of preemptible tasks
        #[arg(short = 'e', long, default_value = "2")]
        preemptible: usize,

        /// Minimum interval between dispatches (overrides config)
        #[arg(short, long)]
        interval_ms: Option<u64>,

        /// Priority dispatches per preemptible dispatch (overrides config)
        #[arg(short, long)]
        ratio: Option<u32>,
    },

    /// Print the effective configuration
    Config,
}

/// Get the path to the log file
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ratelimiter")
        .join("logs")
        .join("ratelimiter.log")
}
