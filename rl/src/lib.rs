//! ratelimiter - Paced task admission
//!
//! Throttles units of work, synchronous or asynchronous, so that no two start
//! closer together than a configured minimum interval. Used to keep bursts of
//! calls from saturating a downstream resource such as an external API.
//!
//! # Core Concepts
//!
//! - **Time-based pacing**: one dispatch per interval, regardless of how long tasks take
//! - **Two queues**: priority work first, preemptible work when there is room
//! - **Starvation avoidance**: one preemptible dispatch after every `ratio` priority ones
//! - **Exactly-once settlement**: every submission resolves or rejects once
//!
//! # Modules
//!
//! - [`limiter`] - The rate limiter, its queues and task results
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface for the demo binary

pub mod cli;
pub mod config;
pub mod limiter;

// Re-export commonly used types
pub use config::Config;
pub use limiter::{
    AdmissionQueues, Completion, ConfigError, Lane, LimiterStats, QueueState, RateLimiter, RateLimiterConfig,
    Submission, TaskError, TaskOutput,
};
