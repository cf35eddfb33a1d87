//! Rate limiter for task dispatch
//!
//! Paces tasks with a minimum delay between starts, using a priority queue
//! and a preemptible queue with starvation avoidance between them.

mod config;
mod core;
mod error;
mod queue;
mod task;

pub use config::RateLimiterConfig;
pub use core::RateLimiter;
pub use error::{ConfigError, TaskError};
pub use queue::{AdmissionQueues, Lane, LimiterStats, QueueState};
pub use task::{Completion, Submission, TaskOutput};
