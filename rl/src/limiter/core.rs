//! Rate limiter implementation

use std::future::Future;

use eyre::{Result, eyre};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use super::config::RateLimiterConfig;
use super::error::ConfigError;
use super::queue::{AdmissionQueues, Lane, LimiterStats, QueueState};
use super::task::{Completion, Job, Submission, TaskOutput, into_job};

/// Requests from handles to the scheduling task
enum Command {
    Submit { lane: Lane, entry: QueuedEntry },
    State { reply_tx: oneshot::Sender<QueueState> },
}

/// A task waiting in one of the queues
struct QueuedEntry {
    job: Job,
    submitted_at: Instant,
}

/// Paces tasks so that no two start closer together than the minimum interval
///
/// Tasks go to the priority queue unless submitted as preemptible. Priority
/// tasks are dispatched first, but after every `ratio` priority dispatches one
/// preemptible task gets its turn, so a steady stream of priority work cannot
/// starve it.
///
/// The handle is cheap to clone; all clones feed the same queues. Once every
/// handle is dropped, tasks already queued are still dispatched at the same
/// pace before the scheduling task exits.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    tx: mpsc::UnboundedSender<Command>,
}

impl RateLimiter {
    /// Create a rate limiter and spawn its scheduling task
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: RateLimiterConfig) -> Result<Self, ConfigError> {
        debug!(?config, "RateLimiter::new: called");
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let driver = Driver::new(config.clone());
        tokio::spawn(driver.run(rx));

        Ok(Self { config, tx })
    }

    /// Create a rate limiter with the default priority:preemptible ratio of 3
    pub fn with_interval_ms(min_interval_ms: u64) -> Result<Self, ConfigError> {
        Self::new(RateLimiterConfig::with_interval_ms(min_interval_ms))
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Queue a task and return its pending result
    ///
    /// The task runs once its turn comes up. Returning `Err` from the call is a
    /// synchronous failure; a [`TaskOutput::Deferred`] result is forwarded when
    /// it settles, without holding back the next dispatch.
    pub fn submit<F, T, E>(&self, task: F, preemptible: bool) -> Submission<T, E>
    where
        F: FnOnce() -> Result<TaskOutput<T, E>, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        let lane = Lane::from_preemptible(preemptible);
        debug!(%lane, "RateLimiter::submit: called");

        let (completion, submission) = Completion::channel();
        let entry = QueuedEntry {
            job: into_job(task, completion),
            submitted_at: Instant::now(),
        };

        // On failure the entry is dropped with its completion, closing the submission
        if self.tx.send(Command::Submit { lane, entry }).is_err() {
            debug!("RateLimiter::submit: scheduling task gone, submission closed");
        }
        submission
    }

    /// Queue a task that computes its value synchronously
    pub fn submit_sync<F, T, E>(&self, task: F, preemptible: bool) -> Submission<T, E>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(move || task().map(TaskOutput::Immediate), preemptible)
    }

    /// Queue a task that starts asynchronous work when dispatched
    pub fn submit_async<F, Fut, T, E>(&self, task: F, preemptible: bool) -> Submission<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.submit(move || Ok(TaskOutput::deferred(task())), preemptible)
    }

    /// Get current queue state
    pub async fn queue_state(&self) -> Result<QueueState> {
        debug!("RateLimiter::queue_state: called");
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Command::State { reply_tx })
            .map_err(|_| eyre!("Rate limiter channel closed"))?;

        reply_rx.await.map_err(|_| eyre!("Rate limiter dropped state request"))
    }

    /// Get the rate limiter statistics
    pub async fn stats(&self) -> Result<LimiterStats> {
        debug!("RateLimiter::stats: called");
        Ok(self.queue_state().await?.stats)
    }
}

/// The scheduling task: sole owner of the queues, the counter and the cooldown
struct Driver {
    config: RateLimiterConfig,
    queues: AdmissionQueues<QueuedEntry>,
    stats: LimiterStats,
    cooling_down: bool,
    closed: bool,
}

impl Driver {
    fn new(config: RateLimiterConfig) -> Self {
        Self {
            queues: AdmissionQueues::new(config.ratio),
            config,
            stats: LimiterStats::default(),
            cooling_down: false,
            closed: false,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!(
            min_interval_ms = self.config.min_interval_ms,
            ratio = self.config.ratio,
            "Rate limiter started"
        );

        // Idle: nothing queued, no cooldown armed
        while let Some(command) = rx.recv().await {
            self.handle(command);

            while let Some((lane, entry)) = self.queues.select() {
                let deadline = Instant::now() + self.config.min_interval();
                self.dispatch(lane, entry);
                self.cool_down(&mut rx, deadline).await;
            }
            debug!("Driver::run: queues drained, going idle");

            if self.closed {
                break;
            }
        }

        info!(dispatched = self.stats.total_dispatched(), "Rate limiter stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { lane, entry } => {
                debug!(%lane, "Driver::handle: queuing entry");
                self.queues.push(lane, entry);
                self.stats.total_submitted += 1;
                self.stats.peak_queue_depth = self.stats.peak_queue_depth.max(self.queues.total_len());
            }
            Command::State { reply_tx } => {
                debug!("Driver::handle: state requested");
                let _ = reply_tx.send(self.snapshot());
            }
        }
    }

    fn dispatch(&mut self, lane: Lane, entry: QueuedEntry) {
        debug!(%lane, waited = ?entry.submitted_at.elapsed(), "Driver::dispatch: running task");
        self.stats.record_dispatch(lane);

        if let Some(follow_up) = (entry.job)() {
            debug!("Driver::dispatch: deferred result, settling in background");
            tokio::spawn(follow_up);
        }
    }

    /// Keep accepting commands until the deadline passes
    async fn cool_down(&mut self, rx: &mut mpsc::UnboundedReceiver<Command>, deadline: Instant) {
        self.cooling_down = true;
        let cooldown = sleep_until(deadline);
        tokio::pin!(cooldown);

        loop {
            tokio::select! {
                _ = &mut cooldown => break,
                command = rx.recv(), if !self.closed => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!(queued = self.queues.total_len(), "Driver::cool_down: all handles dropped, draining");
                        self.closed = true;
                    }
                },
            }
        }

        // Commands that raced the timer must be queued before the next empty check
        while !self.closed {
            match rx.try_recv() {
                Ok(command) => self.handle(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.closed = true,
            }
        }

        self.cooling_down = false;
    }

    fn snapshot(&self) -> QueueState {
        QueueState {
            priority_queued: self.queues.len(Lane::Priority),
            preemptible_queued: self.queues.len(Lane::Preemptible),
            cooling_down: self.cooling_down,
            counter: self.queues.counter(),
            stats: self.stats.clone(),
        }
    }
}
