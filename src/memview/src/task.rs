//! Shared fetch tasks.
//!
//! A [`FetchTask`] is a cloneable handle on a result that is assigned once.
//! Every clone observes the same outcome; dropping a clone only detaches
//! that holder, the work keeps running for the others. The render path
//! polls with [`FetchTask::peek`] and never blocks. Work that never
//! produces a value completes as [`FetchError::Cancelled`].

use crate::error::{FetchError, FetchResult, FetchState};
use std::future::Future;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

#[derive(Debug, Clone)]
pub struct FetchTask<T> {
    rx: watch::Receiver<Option<FetchResult<T>>>,
}

impl<T> FetchTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// A task that is already complete
    pub fn ready(result: FetchResult<T>) -> Self {
        let (_, rx) = watch::channel(Some(result));
        Self { rx }
    }

    /// Run `work` on `runtime`, returning the shared task and the handle that
    /// aborts it. Only the creator holds the abort handle.
    pub fn spawn<F>(runtime: &Handle, work: F) -> (Self, AbortHandle)
    where
        F: Future<Output = FetchResult<T>> + Send + 'static,
    {
        let (tx, rx) = watch::channel(None);
        let completion = Completion { tx };
        let join = runtime.spawn(async move {
            let result = work.await;
            completion.complete(result);
        });
        (Self { rx }, join.abort_handle())
    }

    /// The result if the task has completed
    pub fn peek(&self) -> Option<FetchResult<T>> {
        self.rx.borrow().clone()
    }

    pub fn state(&self) -> FetchState<T> {
        FetchState::from_result(self.peek())
    }

    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait for the result. A task dropped before completing reports
    /// [`FetchError::Cancelled`].
    pub async fn wait(&self) -> FetchResult<T> {
        let mut rx = self.rx.clone();
        let result = rx.wait_for(Option::is_some).await.map(|value| value.clone());
        match result {
            Ok(Some(result)) => result,
            _ => Err(FetchError::Cancelled),
        }
    }

    /// Transform the value, resolving synchronously when already complete
    pub fn map<U, F>(&self, runtime: &Handle, f: F) -> FetchTask<U>
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        self.map_owned(runtime, f).0
    }

    /// Like [`map`](Self::map), also returning the abort handle of the
    /// continuation when one had to be spawned
    pub fn map_owned<U, F>(&self, runtime: &Handle, f: F) -> (FetchTask<U>, Option<AbortHandle>)
    where
        U: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        if let Some(result) = self.peek() {
            return (FetchTask::ready(result.map(f)), None);
        }
        let this = self.clone();
        let (task, abort) = FetchTask::spawn(runtime, async move { this.wait().await.map(f) });
        (task, Some(abort))
    }
}

/// Sender side of a spawned task. Work that is aborted, panics, or is
/// dropped with its runtime still completes the task, as cancelled.
struct Completion<T> {
    tx: watch::Sender<Option<FetchResult<T>>>,
}

impl<T> Completion<T> {
    fn complete(&self, result: FetchResult<T>) {
        self.tx.send_replace(Some(result));
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        self.tx.send_if_modified(|value| {
            if value.is_some() {
                return false;
            }
            *value = Some(Err(FetchError::Cancelled));
            true
        });
    }
}
