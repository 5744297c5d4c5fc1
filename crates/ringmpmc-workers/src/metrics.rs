use std::sync::atomic::{AtomicU64, Ordering};

/// Task accounting shared by all pool variants.
#[derive(Debug, Default)]
pub(crate) struct PoolMetrics {
    submitted: AtomicU64,
    executed: AtomicU64,
    abandoned: AtomicU64,
}

impl PoolMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_submitted(&self, n: u64) {
        self.submitted.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_executed(&self, n: u64) {
        self.executed.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_abandoned(&self, n: u64) {
        self.abandoned.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of a pool's task counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Tasks accepted by the pool.
    pub submitted: u64,
    /// Tasks run to completion by a worker.
    pub executed: u64,
    /// Tasks destroyed unexecuted at shutdown.
    pub abandoned: u64,
}
