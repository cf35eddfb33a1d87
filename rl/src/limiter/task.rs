//! Task results and the one-shot completion handle
//!
//! A submitted task is wrapped together with its [`Completion`] into a type-erased
//! job, so the scheduler can hold tasks of any output type in the same queues.
//! The caller keeps the matching [`Submission`], which settles exactly once.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::error::TaskError;

/// What a task hands back when it is called
pub enum TaskOutput<T, E> {
    /// The value is already computed
    Immediate(T),

    /// The value arrives later; the scheduler subscribes without waiting on it
    Deferred(BoxFuture<'static, Result<T, E>>),
}

impl<T, E> TaskOutput<T, E> {
    pub fn immediate(value: T) -> Self {
        Self::Immediate(value)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::Deferred(future.boxed())
    }
}

impl<T: fmt::Debug, E> fmt::Debug for TaskOutput<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate(value) => f.debug_tuple("Immediate").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Resolve/reject pair bound to one caller's [`Submission`]
///
/// Both operations consume the handle, so at most one of them runs.
pub struct Completion<T, E> {
    tx: oneshot::Sender<Result<T, TaskError<E>>>,
}

impl<T, E> Completion<T, E> {
    /// Create a completion handle and the submission it settles
    pub fn channel() -> (Self, Submission<T, E>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, Submission { rx })
    }

    pub fn resolve(self, value: T) {
        self.settle(Ok(value));
    }

    pub fn reject(self, error: E) {
        self.settle(Err(TaskError::Failed(error)));
    }

    fn panicked(self, message: String) {
        warn!(%message, "Completion::panicked: task panicked");
        self.settle(Err(TaskError::Panicked(message)));
    }

    fn settle(self, result: Result<T, TaskError<E>>) {
        if self.tx.send(result).is_err() {
            debug!("Completion::settle: submission dropped, result discarded");
        }
    }
}

/// Pending result of a submitted task
///
/// Resolves with the task's value, or with [`TaskError::Failed`] carrying
/// exactly the error the task produced.
#[must_use = "a submission does nothing to the task, but drops its result if ignored"]
pub struct Submission<T, E> {
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> Future for Submission<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Closed)))
    }
}

/// Type-erased task plus completion; returns the follow-up work for deferred tasks
pub(crate) type Job = Box<dyn FnOnce() -> Option<BoxFuture<'static, ()>> + Send>;

/// Bind a task to its completion handle
///
/// Calling the job runs the task. An immediate value or synchronous error settles
/// the completion on the spot; a deferred result comes back as a future the caller
/// must drive to settle it.
pub(crate) fn into_job<F, T, E>(task: F, completion: Completion<T, E>) -> Job
where
    F: FnOnce() -> Result<TaskOutput<T, E>, E> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    Box::new(move || match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(TaskOutput::Immediate(value))) => {
            completion.resolve(value);
            None
        }
        Ok(Ok(TaskOutput::Deferred(future))) => Some(
            async move {
                match AssertUnwindSafe(future).catch_unwind().await {
                    Ok(Ok(value)) => completion.resolve(value),
                    Ok(Err(error)) => completion.reject(error),
                    Err(payload) => completion.panicked(panic_message(payload.as_ref())),
                }
            }
            .boxed(),
        ),
        Ok(Err(error)) => {
            completion.reject(error);
            None
        }
        Err(payload) => {
            completion.panicked(panic_message(payload.as_ref()));
            None
        }
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_immediate_resolves() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(|| Ok(TaskOutput::immediate(7)), completion);

        assert!(job().is_none());
        assert_eq!(submission.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_sync_error_rejects() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(|| Err("bad input".to_string()), completion);

        assert!(job().is_none());
        let err = submission.await.unwrap_err();
        assert_eq!(err.into_failed(), Some("bad input".to_string()));
    }

    #[tokio::test]
    async fn test_deferred_settles_when_driven() {
        let (completion, mut submission) = Completion::<&str, String>::channel();
        let job = into_job(|| Ok(TaskOutput::deferred(async { Ok("later") })), completion);

        let follow_up = job().expect("deferred task should return follow-up work");
        // Nothing settles until the follow-up runs
        assert!(futures::poll!(&mut submission).is_pending());

        follow_up.await;
        assert_eq!(submission.await.unwrap(), "later");
    }

    #[tokio::test]
    async fn test_deferred_error_forwarded() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(
            || Ok(TaskOutput::deferred(async { Err("remote refused".to_string()) })),
            completion,
        );

        job().unwrap().await;
        assert_eq!(submission.await.unwrap_err().into_failed(), Some("remote refused".to_string()));
    }

    #[tokio::test]
    async fn test_panic_reported() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(
            || -> Result<TaskOutput<u32, String>, String> { panic!("task blew up") },
            completion,
        );

        assert!(job().is_none());
        match submission.await {
            Err(TaskError::Panicked(message)) => assert_eq!(message, "task blew up"),
            other => panic!("expected panic error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_deferred_panic_reported() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(
            || {
                Ok(TaskOutput::deferred(async {
                    let stage = "deferred";
                    if !stage.is_empty() {
                        panic!("{} went wrong", stage);
                    }
                    Ok(0)
                }))
            },
            completion,
        );

        job().unwrap().await;
        match submission.await {
            Err(TaskError::Panicked(message)) => assert_eq!(message, "deferred went wrong"),
            other => panic!("expected panic error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dropped_job_closes_submission() {
        let (completion, submission) = Completion::<u32, String>::channel();
        let job = into_job(|| Ok(TaskOutput::immediate(1)), completion);
        drop(job);

        assert!(matches!(submission.await, Err(TaskError::Closed)));
    }

    #[test]
    fn test_task_output_debug() {
        let output: TaskOutput<u32, String> = TaskOutput::immediate(3);
        assert_eq!(format!("{:?}", output), "Immediate(3)");

        let output: TaskOutput<u32, String> = TaskOutput::deferred(async { Ok(3) });
        assert_eq!(format!("{:?}", output), "Deferred(..)");
    }
}
