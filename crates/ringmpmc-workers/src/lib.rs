//! Worker pools built on the `ringmpmc` queue family.
//!
//! Four schedulers share one submission model — `push` returns a
//! [`TaskFuture`] that waits for its task on drop, `push_async` returns one
//! that does not — and differ in task shape and queueing discipline:
//!
//! - [`FnPool`] — fixed-signature `fn(A) -> R` tasks in a bounded ring under
//!   the pool mutex; workers and full-queue submitters park on condition
//!   variables
//! - [`SpinFnPool`] — the same task shape pushed straight into a lock-free
//!   [`ringmpmc::SeqQueue`]; workers poll and yield (the low-latency variant)
//! - [`TaskPool`] — arbitrary `FnOnce() -> R` closures, type-erased and
//!   bounded, with [`TaskGroup`] barrier submission
//! - [`UnboundedTaskPool`] — type-erased tasks in a single-allocation
//!   polymorphic queue; submission never blocks
//!
//! Stopping a pool joins its workers; tasks still queued are destroyed
//! unexecuted and their futures report [`TaskError::Abandoned`]. Call
//! `drain_then_stop` instead to dispatch everything first.
//!
//! # Example
//!
//! ```
//! use ringmpmc_workers::{TaskGroup, TaskPool};
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let pool = TaskPool::new(4);
//!
//! // Futures for results...
//! let sum = pool.push(|| (1..=10u64).product::<u64>());
//! assert_eq!(sum.get(), Ok(3628800));
//!
//! // ...or a barrier over fire-and-forget tasks.
//! let group = TaskGroup::new();
//! let hits = Arc::new(AtomicU64::new(0));
//! for _ in 0..8 {
//!     let hits = Arc::clone(&hits);
//!     pool.push_group(&group, move || {
//!         hits.fetch_add(1, Ordering::Relaxed);
//!     });
//! }
//! group.wait();
//! assert_eq!(hits.load(Ordering::Relaxed), 8);
//! ```

mod fn_pool;
mod future;
mod group;
mod metrics;
mod spin_pool;
mod task;
mod task_pool;
mod unbounded_pool;

pub use fn_pool::FnPool;
pub use future::{TaskError, TaskFuture};
pub use group::TaskGroup;
pub use metrics::PoolStats;
pub use spin_pool::SpinFnPool;
pub use task_pool::TaskPool;
pub use unbounded_pool::UnboundedTaskPool;
