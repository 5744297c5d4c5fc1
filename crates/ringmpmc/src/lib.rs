//! RingMPMC - a family of bounded Multi-Producer Multi-Consumer queues.
//!
//! Three co-designed MPMC rings share one contract (non-blocking `try_push` /
//! `try_pop`, blocking `push` / `pop`, in-place slot construction) and differ
//! only in their synchronization discipline:
//!
//! - [`SeqQueue`] — lock-free; each cell carries an epoch id that hands the
//!   cell between producers and consumers (the low-latency path)
//! - [`ReserveQueue`] — lock-free; four cache-line-isolated reserve/commit
//!   counters publish effects in strict ticket order
//! - [`LockQueue`] — one mutex per side; the correctness baseline
//!
//! Two single-threaded queues round out the family for callers that bring
//! their own synchronization:
//!
//! - [`LocalQueue`] — bounded ring with plain indices
//! - [`PolyQueue`] — unbounded linked FIFO of trait objects, one allocation
//!   per entry
//!
//! # Example
//!
//! ```
//! use ringmpmc::SeqQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(SeqQueue::<u64>::new(64));
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..100 {
//!             queue.push(i);
//!         }
//!     })
//! };
//!
//! let mut sum = 0;
//! for _ in 0..100 {
//!     sum += queue.pop();
//! }
//! producer.join().unwrap();
//! assert_eq!(sum, 4950);
//! ```

mod backoff;
mod error;
mod invariants;
mod local_queue;
mod lock_queue;
mod poly_queue;
mod reserve_queue;
mod seq_queue;
mod slot;

pub use backoff::Backoff;
pub use error::Full;
pub use local_queue::LocalQueue;
pub use lock_queue::LockQueue;
pub use poly_queue::{PolyBox, PolyQueue};
pub use reserve_queue::ReserveQueue;
pub use seq_queue::SeqQueue;
