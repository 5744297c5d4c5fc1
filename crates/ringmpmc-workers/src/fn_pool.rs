use crate::future::{task_channel, TaskFuture};
use crate::metrics::{PoolMetrics, PoolStats};
use crate::task::FnTask;
use ringmpmc::{Full, LocalQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Fixed-signature worker pool with a waiting worker loop.
///
/// Tasks are `fn(A) -> R` pointers with one argument value, stored by value
/// in a [`LocalQueue`] guarded by the pool mutex. Workers park on the
/// `has_task` condition; submitters park on `has_slot` when the queue is
/// full. For the yielding, lock-free sibling see
/// [`SpinFnPool`](crate::SpinFnPool).
///
/// # Example
///
/// ```
/// use ringmpmc_workers::FnPool;
///
/// fn square(x: u64) -> u64 { x * x }
///
/// let pool = FnPool::new(4);
/// let futures: Vec<_> = (0..10).map(|i| pool.push(square, i)).collect();
/// let sum: u64 = futures.into_iter().map(|f| f.get().unwrap()).sum();
/// assert_eq!(sum, 285);
/// ```
pub struct FnPool<A, R> {
    shared: Arc<Shared<A, R>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<A, R> {
    tasks: Mutex<LocalQueue<FnTask<A, R>>>,
    has_task: Condvar,
    has_slot: Condvar,
    finish_workers: AtomicBool,
    metrics: PoolMetrics,
}

impl<A, R> FnPool<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Creates a pool with one queue slot per worker.
    ///
    /// # Panics
    ///
    /// Panics if `n_workers` is zero.
    pub fn new(n_workers: usize) -> Self {
        Self::with_capacity(n_workers, n_workers)
    }

    /// Creates a pool with an explicit task queue capacity.
    ///
    /// # Panics
    ///
    /// Panics if `n_workers` or `queue_capacity` is zero.
    pub fn with_capacity(n_workers: usize, queue_capacity: usize) -> Self {
        assert!(n_workers >= 1, "worker pool needs at least one worker");
        let shared = Arc::new(Shared {
            tasks: Mutex::new(LocalQueue::new(queue_capacity)),
            has_task: Condvar::new(),
            has_slot: Condvar::new(),
            finish_workers: AtomicBool::new(false),
            metrics: PoolMetrics::new(),
        });
        let workers = (0..n_workers)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("fn-pool-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        tracing::debug!(workers = n_workers, capacity = queue_capacity, "fn pool started");
        Self { shared, workers }
    }

    /// Submits a task; the returned future waits for the task when dropped.
    pub fn push(&self, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        self.push_inner(true, f, arg)
    }

    /// Submits a task; the returned future does not wait when dropped.
    pub fn push_async(&self, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        self.push_inner(false, f, arg)
    }

    fn push_inner(&self, sync: bool, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        let (promise, future) = task_channel(sync);
        let mut task = FnTask::new(f, arg, promise);
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match tasks.try_push(task) {
                Ok(_) => {
                    self.shared.metrics.add_submitted(1);
                    self.shared.has_task.notify_one();
                    return future;
                }
                Err(Full(rejected)) => {
                    task = rejected;
                    tasks = self
                        .shared
                        .has_slot
                        .wait(tasks)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Returns a snapshot of the pool's task counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.metrics.snapshot()
    }

    /// Waits until every queued task has been dispatched, then stops.
    ///
    /// Completion of dispatched tasks is the futures' business; pair with
    /// sync futures or explicit `wait` calls for a full quiesce.
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

impl<A, R> Drop for FnPool<A, R> {
    fn drop(&mut self) {
        stop(&self.shared, &mut self.workers);
    }
}

fn stop<A, R>(shared: &Shared<A, R>, workers: &mut Vec<JoinHandle<()>>) {
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
    // Tasks still queued are destroyed unexecuted; their futures observe the
    // broken promise.
    let mut tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
    let mut abandoned = 0;
    while tasks.try_pop().is_some() {
        abandoned += 1;
    }
    shared.metrics.add_abandoned(abandoned);
    tracing::debug!(abandoned, "fn pool stopped");
}

fn worker_loop<A, R>(shared: &Shared<A, R>) {
    while !shared.finish_workers.load(Ordering::Acquire) {
        let mut tasks = shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if shared.finish_workers.load(Ordering::Acquire) {
                return;
            }
            if let Some(task) = tasks.try_pop() {
                shared.has_slot.notify_one();
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
