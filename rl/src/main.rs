//! ratelimiter - paced task admission demo
//!
//! CLI entry point for exercising the rate limiter with synthetic tasks.

use std::fs;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tokio::time::Instant;
use tracing::{debug, info};

use ratelimiter::cli::{Cli, Command, get_log_path};
use ratelimiter::config::Config;
use ratelimiter::limiter::{Lane, RateLimiter};

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Demo {
            priority,
            preemptible,
            interval_ms,
            ratio,
        } => {
            if let Some(interval_ms) = interval_ms {
                config.limiter.min_interval_ms = interval_ms;
            }
            if let Some(ratio) = ratio {
                config.limiter.ratio = ratio;
            }
            config.validate()?;
            cmd_demo(&config, priority, preemptible).await
        }
        Command::Config => cmd_config(&config),
    }
}

async fn cmd_demo(config: &Config, priority: usize, preemptible: usize) -> Result<()> {
    debug!(priority, preemptible, "cmd_demo: called");
    let limiter = RateLimiter::new(config.limiter.clone())?;
    let start = Instant::now();

    println!(
        "{} {} priority + {} preemptible tasks, {}ms apart, ratio {}",
        "Submitting".bold(),
        priority,
        preemptible,
        config.limiter.min_interval_ms,
        config.limiter.ratio
    );

    let lanes = std::iter::repeat_n(Lane::Priority, priority).chain(std::iter::repeat_n(Lane::Preemptible, preemptible));
    let submissions: Vec<_> = lanes
        .enumerate()
        .map(|(i, lane)| {
            let submission = limiter.submit_sync(
                move || Ok::<_, std::convert::Infallible>(start.elapsed()),
                lane == Lane::Preemptible,
            );
            (i, lane, submission)
        })
        .collect();

    let mut dispatched = Vec::with_capacity(submissions.len());
    for (i, lane, submission) in submissions {
        dispatched.push((submission.await?, i, lane));
    }
    dispatched.sort_by_key(|(at, _, _)| *at);

    for (dispatched_at, i, lane) in dispatched {
        let label = match lane {
            Lane::Priority => format!("{:<11}", lane).green(),
            Lane::Preemptible => format!("{:<11}", lane).yellow(),
        };
        println!("  task {:>3}  {}  +{:>6}ms", i, label, dispatched_at.as_millis());
    }

    let stats = limiter.stats().await?;
    println!(
        "{} {} dispatched ({} priority, {} preemptible)",
        "Done:".bold(),
        stats.total_dispatched(),
        stats.priority_dispatched,
        stats.preemptible_dispatched
    );
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}
