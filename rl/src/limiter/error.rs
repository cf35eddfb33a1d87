//! Rate limiter error types

use thiserror::Error;

/// Why a submitted task did not produce a value
#[derive(Debug, Error)]
pub enum TaskError<E> {
    /// The task itself failed, either when called or through its deferred result
    #[error("Task failed: {0}")]
    Failed(E),

    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The scheduling task stopped before this entry settled
    #[error("Rate limiter closed before the task settled")]
    Closed,
}

impl<E> TaskError<E> {
    /// Check if the task's own error was relayed
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskError::Failed(_))
    }

    /// Take the task's own error, if that is what this is
    pub fn into_failed(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid rate limiter construction arguments
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Minimum interval must be greater than zero")]
    ZeroInterval,
}
