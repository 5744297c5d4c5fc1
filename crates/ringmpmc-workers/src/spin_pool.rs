use crate::future::{task_channel, TaskFuture};
use crate::metrics::{PoolMetrics, PoolStats};
use crate::task::FnTask;
use ringmpmc::SeqQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Fixed-signature worker pool with a yielding worker loop.
///
/// Tasks go straight into a lock-free [`SeqQueue`]: submission is the ring's
/// blocking `push` (whose wait degrades into scheduler yields), and workers
/// alternate `try_pop` with `yield_now`. No pool mutex, no condition
/// variables — this is the low-latency variant, trading idle CPU for
/// response time. For the parking sibling see [`FnPool`](crate::FnPool).
pub struct SpinFnPool<A, R> {
    shared: Arc<Shared<A, R>>,
    workers: Vec<JoinHandle<()>>,
}

struct Shared<A, R> {
    tasks: SeqQueue<FnTask<A, R>>,
    finish_workers: AtomicBool,
    metrics: PoolMetrics,
}

impl<A, R> SpinFnPool<A, R>
where
    A: Send + 'static,
    R: Send + 'static,
{
    /// Creates a pool with one queue slot per worker (at least two — the
    /// task ring's minimum).
    ///
    /// # Panics
    ///
    /// Panics if `n_workers` is zero.
    pub fn new(n_workers: usize) -> Self {
        Self::with_capacity(n_workers, n_workers.max(2))
    }

    /// Creates a pool with an explicit task queue capacity.
    ///
    /// # Panics
    ///
    /// Panics if `n_workers` is zero or `queue_capacity < 2`.
    pub fn with_capacity(n_workers: usize, queue_capacity: usize) -> Self {
        assert!(n_workers >= 1, "worker pool needs at least one worker");
        let shared = Arc::new(Shared {
            tasks: SeqQueue::new(queue_capacity),
            finish_workers: AtomicBool::new(false),
            metrics: PoolMetrics::new(),
        });
        let workers = (0..n_workers)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("spin-pool-{i}"))
                    .spawn(move || worker_loop(&shared))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        tracing::debug!(workers = n_workers, capacity = queue_capacity, "spin pool started");
        Self { shared, workers }
    }

    /// Submits a task; the returned future waits for the task when dropped.
    /// Blocks (yielding) while the task ring is full.
    pub fn push(&self, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        self.push_inner(true, f, arg)
    }

    /// Submits a task; the returned future does not wait when dropped.
    pub fn push_async(&self, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        self.push_inner(false, f, arg)
    }

    fn push_inner(&self, sync: bool, f: fn(A) -> R, arg: A) -> TaskFuture<R> {
        let (promise, future) = task_channel(sync);
        self.shared.tasks.push(FnTask::new(f, arg, promise));
        self.shared.metrics.add_submitted(1);
        future
    }

    /// Returns a snapshot of the pool's task counters.
    pub fn stats(&self) -> PoolStats {
        self.shared.metrics.snapshot()
    }

    /// Waits until every queued task has been dispatched, then stops.
    pub fn drain_then_stop(&mut self) {
        while !self.shared.tasks.is_empty() {
            thread::yield_now();
        }
        stop(&self.shared, &mut self.workers);
    }
}

impl<A, R> Drop for SpinFnPool<A, R> {
    fn drop(&mut self) {
        stop(&self.shared, &mut self.workers);
    }
}

fn stop<A, R>(shared: &Shared<A, R>, workers: &mut Vec<JoinHandle<()>>) {
    if workers.is_empty() {
        return;
    }
    shared.finish_workers.store(true, Ordering::Release);
    for worker in workers.drain(..) {
        let _ = worker.join();
    }
    let mut abandoned = 0;
    while shared.tasks.try_pop().is_some() {
        abandoned += 1;
    }
    shared.metrics.add_abandoned(abandoned);
    tracing::debug!(abandoned, "spin pool stopped");
}

fn worker_loop<A, R>(shared: &Shared<A, R>) {
    while !shared.finish_workers.load(Ordering::Acquire) {
        if let Some(task) = shared.tasks.try_pop() {
            task.run();
            shared.metrics.add_executed(1);
        } else {
            thread::yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(x: u64) -> u64 {
        x * 3
    }

    #[test]
    fn test_futures_deliver_results() {
        let pool = SpinFnPool::new(4);
        let futures: Vec<_> = (0..64u64).map(|i| pool.push(triple, i)).collect();
        for (i, future) in futures.into_iter().enumerate() {
            assert_eq!(future.get(), Ok(i as u64 * 3));
        }
    }

    #[test]
    fn test_single_worker_keeps_order_of_effects() {
        use std::sync::atomic::AtomicU64;

        fn bump(counter: Arc<AtomicU64>) -> u64 {
            counter.fetch_add(1, Ordering::SeqCst)
        }

        let pool = SpinFnPool::new(1);
        let counter = Arc::new(AtomicU64::new(0));
        let futures: Vec<_> = (0..16)
            .map(|_| pool.push(bump, Arc::clone(&counter)))
            .collect();
        // One worker drains the ring in FIFO ticket order.
        for (i, future) in futures.into_iter().enumerate() {
            assert_eq!(future.get(), Ok(i as u64));
        }
    }

    #[test]
    fn test_drain_then_stop_executes_everything() {
        fn noop(_: ()) {}

        let mut pool = SpinFnPool::with_capacity(2, 8);
        for _ in 0..100 {
            let _ = pool.push_async(noop, ());
        }
        pool.drain_then_stop();
        let stats = pool.stats();
        assert_eq!(stats.submitted, 100);
        assert_eq!(stats.executed, 100);
        assert_eq!(stats.abandoned, 0);
    }
}
