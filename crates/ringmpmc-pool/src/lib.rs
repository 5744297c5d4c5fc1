//! Bounded pool of reusable shared objects.
//!
//! A [`BoundedPool`] constructs a fixed set of elements once, up front, and
//! hands them out as reference-counted [`PoolHandle`]s. Dropping the last
//! handle to an element returns that element to the pool unchanged — elements
//! are recycled, never reconstructed.
//!
//! The free list is a [`ringmpmc::LockQueue`] of slot indices: every element
//! enters and leaves the free list at most once per use, so the two-lock ring
//! is sufficient and none of the lock-free slot accounting would buy anything
//! for index values.
//!
//! # Example
//!
//! ```
//! use ringmpmc_pool::BoundedPool;
//!
//! let pool = BoundedPool::new(4, vec![0u8; 4096]);
//! assert_eq!(pool.size(), 4);
//!
//! let buffer = pool.pop();
//! assert_eq!(pool.size(), 3);
//! assert_eq!(buffer.len(), 4096);
//!
//! drop(buffer); // last release returns the element
//! assert_eq!(pool.size(), 4);
//! ```

mod pool;

pub use pool::{BoundedPool, PoolHandle};
