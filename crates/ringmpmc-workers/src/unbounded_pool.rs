use crate::future::{task_channel, TaskFuture};
use crate::group::TaskGroup;
use crate::metrics::{PoolMetrics, PoolStats};
use crate::task::{ErasedTask, GroupTask, TaskRun};
use ringmpmc::PolyQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Heterogeneous worker pool with an unbounded task queue.
///
/// Tasks live in a [`PolyQueue`]: the node header and the type-erased task
/// share a single allocation, so submitting costs one allocation total. The
/// pool mutex only serializes the linked-list mutation — submission never
/// blocks on capacity.
pub struct UnboundedTaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    tasks: Mutex<PolyQueue<dyn TaskRun>>,
    has_task: Condvar,
    finish_workers: AtomicBool,
    metrics: PoolMetrics,
}

impl UnboundedTaskPool {
    /// Creates a pool with `n_workers` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `n_workers` is zero.
    pub fn new(n_workers: usize) -> Self {
        assert!(n_workers >= 1, "worker pool needs at least one worker");
        let shared = Arc::new(Shared {
            tasks: Mutex::new(PolyQueue::new()),
            has_task: Condvar::new(),
            finish_workers: AtomicBool::new(false),
            metrics: PoolMetrics::new(),
        });
        let workers = (0..n_workers)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("unbounded-pool-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        tracing::debug!(workers = n_workers, "unbounded pool started");
        Self { shared, workers }
    }

    /// Submits a closure; the returned future waits for the task when
    /// dropped. Never blocks on queue capacity.
    pub fn push<F, R>(&self, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.push_inner(true, f)
    }

    /// Submits a closure; the returned future does not wait when dropped.
    pub fn push_async<F, R>(&self, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.push_inner(false, f)
    }

    /// Submits a task bound to `group` instead of a future.
    pub fn push_group<F>(&self, group: &TaskGroup, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.push(
            GroupTask::new(f, Arc::clone(group.inner())),
            |t| t as &mut dyn TaskRun,
        );
        group.inner().enter();
        self.shared.metrics.add_submitted(1);
        self.shared.has_task.notify_one();
    }

    fn push_inner<F, R>(&self, sync: bool, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (promise, future) = task_channel(sync);
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.push(ErasedTask::new(f, promise), |t| t as &mut dyn TaskRun);
        self.shared.metrics.add_submitted(1);
        self.shared.has_task.notify_one();
        drop(tasks);
        future
    }

    /// Returns a snapshot of the pool's task counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.metrics.snapshot()
    }

    /// Waits until every queued task has been dispatched, then stops.
    pub fn drain_then_stop(&mut self) {
        loop {
            let tasks = self
                .shared
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if tasks.is_empty() {
                break;
            }
            drop(tasks);
            thread::yield_now();
        }
        stop(&self.shared, &mut self.workers);
    }
}

impl Drop for UnboundedTaskPool {
    fn drop(&mut self) {
        stop(&self.shared, &mut self.workers);
    }
}

fn stop(shared: &Shared, workers: &mut Vec<JoinHandle<()>>) {
    if workers.is_empty() {
        return;
    }
    {
        let _tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        shared.finish_workers.store(true, Ordering::Release);
        shared.has_task.notify_all();
    }
    for worker in workers.drain(..) {
        let _ = worker.join();
    }
    let mut tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
    let mut abandoned = 0;
    while tasks.try_pop().is_some() {
        abandoned += 1;
    }
    shared.metrics.add_abandoned(abandoned);
    tracing::debug!(abandoned, "unbounded pool stopped");
}

fn worker_loop(shared: &Shared) {
    while !shared.finish_workers.load(Ordering::Acquire) {
        let mut tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if shared.finish_workers.load(Ordering::Acquire) {
                return;
            }
            if let Some(mut task) = tasks.try_pop() {
                drop(tasks);
                task.run();
                shared.metrics.add_executed(1);
                break;
            }
            tasks = shared
                .has_task
                .wait(tasks)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_submission_never_blocks_on_capacity() {
        let pool = UnboundedTaskPool::new(1);
        // Far more tasks than any worker could have drained yet.
        let futures: Vec<_> = (0..500u64).map(|i| pool.push_async(move || i)).collect();
        for (i, future) in futures.into_iter().enumerate() {
            assert_eq!(future.get(), Ok(i as u64));
        }
    }

    #[test]
    fn test_mixed_futures_and_groups() {
        let pool = UnboundedTaskPool::new(4);
        let group = TaskGroup::new();
        let counter = Arc::new(AtomicU64::new(0));

        for _ in 0..10 {
            let counter = Arc::clone(&counter);
            pool.push_group(&group, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        let future = pool.push(|| 99u64);

        group.wait();
        assert_eq!(counter.load(Ordering::SeqCst), 10);
        assert_eq!(future.get(), Ok(99));
    }
}
