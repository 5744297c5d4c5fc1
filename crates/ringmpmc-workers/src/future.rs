use crossbeam_channel::{bounded, Receiver, Sender};
use thiserror::Error;

/// Error observed through a [`TaskFuture`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task was destroyed before it ran — the pool was stopped with the
    /// task still queued.
    #[error("task was abandoned before completion")]
    Abandoned,
}

/// Fulfilment side of a task's one-shot result channel.
///
/// Dropping a promise without setting it (the task never ran) disconnects the
/// channel; the paired future then observes [`TaskError::Abandoned`].
pub(crate) struct Promise<R> {
    tx: Sender<R>,
}

impl<R> Promise<R> {
    /// Fulfils the promise. The send cannot block: the channel holds one
    /// value and is fulfilled at most once.
    pub(crate) fn set(self, value: R) {
        let _ = self.tx.send(value);
    }
}

/// Creates a promise/future pair for one task result.
pub(crate) fn task_channel<R>(sync_on_drop: bool) -> (Promise<R>, TaskFuture<R>) {
    let (tx, rx) = bounded(1);
    (
        Promise { tx },
        TaskFuture {
            receiver: Some(rx),
            result: None,
            sync_on_drop,
        },
    )
}

/// Single-shot handle to a task's result.
///
/// Futures returned by `push` carry the sync-on-drop policy: dropping the
/// future blocks until the task has completed, replacing ad-hoc join calls.
/// Futures returned by `push_async` do not wait. Both expose [`wait`] and
/// [`get`] explicitly, and the policy can be changed with
/// [`set_sync_on_drop`].
///
/// [`wait`]: TaskFuture::wait
/// [`get`]: TaskFuture::get
/// [`set_sync_on_drop`]: TaskFuture::set_sync_on_drop
pub struct TaskFuture<R> {
    receiver: Option<Receiver<R>>,
    result: Option<Result<R, TaskError>>,
    sync_on_drop: bool,
}

impl<R> TaskFuture<R> {
    /// Blocks until the task has completed (or was abandoned) and caches the
    /// outcome. Idempotent.
    pub fn wait(&mut self) {
        if self.result.is_none() {
            if let Some(rx) = self.receiver.take() {
                self.result = Some(rx.recv().map_err(|_| TaskError::Abandoned));
            }
        }
    }

    /// Waits and takes the result.
    pub fn get(mut self) -> Result<R, TaskError> {
        self.wait();
        self.result.take().unwrap_or(Err(TaskError::Abandoned))
    }

    /// Returns whether dropping this future blocks on task completion.
    pub fn sync_on_drop(&self) -> bool {
        self.sync_on_drop
    }

    /// Changes the drop policy for this future.
    pub fn set_sync_on_drop(&mut self, sync: bool) {
        self.sync_on_drop = sync;
    }
}

impl<R> Drop for TaskFuture<R> {
    fn drop(&mut self) {
        if self.sync_on_drop && self.result.is_none() {
            if let Some(rx) = self.receiver.take() {
                let _ = rx.recv();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_get_returns_value() {
        let (promise, future) = task_channel::<u64>(true);
        promise.set(17);
        assert_eq!(future.get(), Ok(17));
    }

    #[test]
    fn test_dropped_promise_breaks_future() {
        let (promise, future) = task_channel::<u64>(false);
        drop(promise);
        assert_eq!(future.get(), Err(TaskError::Abandoned));
    }

    #[test]
    fn test_wait_is_idempotent() {
        let (promise, mut future) = task_channel::<&str>(true);
        promise.set("done");
        future.wait();
        future.wait();
        assert_eq!(future.get(), Ok("done"));
    }

    #[test]
    fn test_sync_on_drop_waits_for_result() {
        let (promise, future) = task_channel::<u64>(true);
        let fulfiller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.set(1);
        });
        // Drop must block until the promise is fulfilled.
        drop(future);
        fulfiller.join().unwrap();
    }

    #[test]
    fn test_async_drop_does_not_wait() {
        let (promise, future) = task_channel::<u64>(false);
        drop(future);
        // The promise side is still usable; the value just goes nowhere.
        promise.set(5);
    }
}
