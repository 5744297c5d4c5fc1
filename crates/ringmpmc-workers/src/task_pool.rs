use crate::future::{task_channel, TaskFuture};
use crate::group::TaskGroup;
use crate::metrics::{PoolMetrics, PoolStats};
use crate::task::{ErasedTask, GroupTask, TaskRun};
use ringmpmc::{Full, LocalQueue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

/// Heterogeneous worker pool with a bounded task queue.
///
/// Tasks are arbitrary `FnOnce() -> R` closures, boxed behind the single-call
/// task interface and queued in a [`LocalQueue`] under the pool mutex; each
/// submission's future stays statically typed to its closure's return type.
/// Group submissions tie fire-and-forget tasks to a [`TaskGroup`] barrier
/// instead of a future.
///
/// # Example
///
/// ```
/// use ringmpmc_workers::TaskPool;
///
/// let pool = TaskPool::new(4);
/// let total = pool.push(|| (1..=100u64).sum::<u64>());
/// let greeting = pool.push(|| format!("{} {}", "hello", "pool"));
/// assert_eq!(total.get(), Ok(5050));
/// assert_eq!(greeting.get().unwrap(), "hello pool");
/// ```
pub struct TaskPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared {
    tasks: Mutex<LocalQueue<Box<dyn TaskRun>>>,
    has_task: Condvar,
    has_slot: Condvar,
    finish_workers: AtomicBool,
    metrics: PoolMetrics,
}

impl TaskPool {
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
                    .name(format!("task-pool-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        tracing::debug!(workers = n_workers, capacity = queue_capacity, "task pool started");
        Self { shared, workers }
    }

    /// Submits a closure; the returned future waits for the task when
    /// dropped. Blocks on `has_slot` while the queue is full.
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
    ///
    /// The group registration happens in the same critical section as the
    /// enqueue, so `group.wait()` can never miss a queued task.
    pub fn push_group<F>(&self, group: &TaskGroup, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let task: Box<dyn TaskRun> = Box::new(GroupTask::new(f, Arc::clone(group.inner())));
        let tasks = self.enqueue(task);
        group.inner().enter();
        self.shared.metrics.add_submitted(1);
        self.shared.has_task.notify_one();
        drop(tasks);
    }

    fn push_inner<F, R>(&self, sync: bool, f: F) -> TaskFuture<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (promise, future) = task_channel(sync);
        let task: Box<dyn TaskRun> = Box::new(ErasedTask::new(f, promise));
        let tasks = self.enqueue(task);
        self.shared.metrics.add_submitted(1);
        self.shared.has_task.notify_one();
        drop(tasks);
        future
    }

    /// Pushes `task`, waiting on `has_slot` while the queue is full; returns
    /// the still-held queue guard so callers can finish their critical
    /// section before releasing it.
    fn enqueue(
        &self,
        mut task: Box<dyn TaskRun>,
    ) -> std::sync::MutexGuard<'_, LocalQueue<Box<dyn TaskRun>>> {
        let mut tasks = self
            .shared
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            match tasks.try_push(task) {
                Ok(_) => return tasks,
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

impl Drop for TaskPool {
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
    tracing::debug!(abandoned, "task pool stopped");
}

fn worker_loop(shared: &Shared) {
    while !shared.finish_workers.load(Ordering::Acquire) {
        let mut tasks = shared.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if shared.finish_workers.load(Ordering::Acquire) {
                return;
            }
            if let Some(mut task) = tasks.try_pop() {
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
