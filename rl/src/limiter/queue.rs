//! Queue types for the rate limiter
//!
//! [`AdmissionQueues`] holds the priority and preemptible queues together with
//! the starvation-avoidance counter. It knows nothing about time: the driver
//! calls [`AdmissionQueues::select`] once per interval.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which queue an entry waits in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Priority,
    Preemptible,
}

impl Lane {
    /// Lane for a submission with the given preemptible flag
    pub fn from_preemptible(preemptible: bool) -> Self {
        if preemptible { Lane::Preemptible } else { Lane::Priority }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Priority => "priority",
            Self::Preemptible => "preemptible",
        };
        f.pad(name)
    }
}

/// Two FIFO queues and the counter deciding which one to drain next
///
/// The counter starts at 1 and advances modulo `ratio + 1` on every dispatch.
/// When it reads 0 the preemptible queue is preferred, otherwise the priority
/// queue is. Either way the other queue is used as a fallback, and the counter
/// returns to 1 once both are empty. With a ratio of 0 the first dispatch after
/// idle still prefers priority work; every later one prefers preemptible work.
#[derive(Debug)]
pub struct AdmissionQueues<J> {
    priority: VecDeque<J>,
    preemptible: VecDeque<J>,
    ratio: u32,
    counter: u32,
}

impl<J> AdmissionQueues<J> {
    pub fn new(ratio: u32) -> Self {
        Self {
            priority: VecDeque::new(),
            preemptible: VecDeque::new(),
            ratio,
            counter: 1,
        }
    }

    /// Append a job to the back of its lane
    pub fn push(&mut self, lane: Lane, job: J) {
        match lane {
            Lane::Priority => self.priority.push_back(job),
            Lane::Preemptible => self.preemptible.push_back(job),
        }
    }

    /// Pick the next job to dispatch, advancing the counter
    ///
    /// Returns `None` and resets the counter when both queues are empty.
    pub fn select(&mut self) -> Option<(Lane, J)> {
        let drain_preemptible = self.counter == 0;

        let selected = if drain_preemptible {
            Self::pop(&mut self.preemptible, Lane::Preemptible).or_else(|| Self::pop(&mut self.priority, Lane::Priority))
        } else {
            Self::pop(&mut self.priority, Lane::Priority).or_else(|| Self::pop(&mut self.preemptible, Lane::Preemptible))
        };

        match selected {
            Some((lane, job)) => {
                self.counter = (self.counter + 1) % self.period();
                debug!(%lane, drain_preemptible, counter = self.counter, "AdmissionQueues::select: selected");
                Some((lane, job))
            }
            None => {
                debug!("AdmissionQueues::select: both queues empty, resetting counter");
                self.counter = 1;
                None
            }
        }
    }

    fn period(&self) -> u32 {
        self.ratio.saturating_add(1)
    }

    fn pop(queue: &mut VecDeque<J>, lane: Lane) -> Option<(Lane, J)> {
        queue.pop_front().map(|job| (lane, job))
    }

    /// Number of jobs waiting in a lane
    pub fn len(&self, lane: Lane) -> usize {
        match lane {
            Lane::Priority => self.priority.len(),
            Lane::Preemptible => self.preemptible.len(),
        }
    }

    pub fn total_len(&self) -> usize {
        self.priority.len() + self.preemptible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_empty() && self.preemptible.is_empty()
    }

    /// Current position in the ratio cycle
    pub fn counter(&self) -> u32 {
        self.counter
    }
}

/// Statistics for the rate limiter
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterStats {
    pub total_submitted: u64,
    pub priority_dispatched: u64,
    pub preemptible_dispatched: u64,
    pub peak_queue_depth: usize,
}

impl LimiterStats {
    pub fn total_dispatched(&self) -> u64 {
        self.priority_dispatched + self.preemptible_dispatched
    }

    pub(crate) fn record_dispatch(&mut self, lane: Lane) {
        match lane {
            Lane::Priority => self.priority_dispatched += 1,
            Lane::Preemptible => self.preemptible_dispatched += 1,
        }
    }
}

/// Snapshot of the rate limiter's queues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    pub priority_queued: usize,
    pub preemptible_queued: usize,
    /// A dispatch happened less than one interval ago
    pub cooling_down: bool,
    pub counter: u32,
    pub stats: LimiterStats,
}
