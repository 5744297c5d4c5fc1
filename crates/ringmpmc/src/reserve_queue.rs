use crate::invariants::{debug_assert_bounded_count, debug_assert_gapless_commit};
use crate::slot::Slot;
use crate::{Backoff, Full};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// TWO-PHASE RESERVE/COMMIT PROTOCOL
// =============================================================================
//
// Each side owns a pair of counters: a reserve counter handing out tickets and
// a commit counter publishing completed work in strict ticket order.
//
// Producer of ticket `t`:
//   1. claim `t` from `push_reserve` (CAS or fetch_add), guarded by the
//      fullness predicate `t - pop_commit < capacity`
//   2. construct the value at `t mod (capacity + 1)`
//   3. wait for `push_commit == t` (all prior producers committed), then
//      publish `push_commit = t + 1` with Release
//
// Consumer of ticket `t` is symmetric against `push_commit`/`pop_commit`.
//
// The commit counters advance gaplessly (`1, 2, 3, …`), which is what makes
// the fullness and emptiness predicates sound: `pop_commit` only counts cells
// that are fully vacated, `push_commit` only cells that are fully published.
// The Acquire load of the opposite commit counter synchronizes with its
// Release store; the reserve counters are Relaxed throughout.
//
// Compared with the slot-sequenced ring this trades per-cell bookkeeping for
// four cache-line-isolated counters and plain cells.
//
// =============================================================================

/// MPMC bounded queue with per-side reserve and commit counters.
///
/// FIFO publication is enforced by the commit counters: the sequence of
/// committed push tickets has no gaps at any instant, even under contention.
pub struct ReserveQueue<T> {
    slots: Box<[Slot<T>]>,
    capacity: usize,
    push_reserve: CachePadded<AtomicU64>,
    push_commit: CachePadded<AtomicU64>,
    pop_reserve: CachePadded<AtomicU64>,
    pop_commit: CachePadded<AtomicU64>,
}

// Safety: a ticket gives its holder exclusive access to the cell between
// reserve and commit; values only need to be sendable across threads.
unsafe impl<T: Send> Send for ReserveQueue<T> {}
unsafe impl<T: Send> Sync for ReserveQueue<T> {}

impl<T> ReserveQueue<T> {
    /// Creates a queue with the given capacity.
    ///
    /// The ring holds `capacity + 1` cells; the spare cell keeps the full and
    /// empty states distinguishable.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "queue capacity must be at least 1");
        let slots = (0..=capacity).map(|_| Slot::new()).collect();
        Self {
            slots,
            capacity,
            push_reserve: CachePadded::new(AtomicU64::new(0)),
            push_commit: CachePadded::new(AtomicU64::new(0)),
            pop_reserve: CachePadded::new(AtomicU64::new(0)),
            pop_commit: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of committed items.
    #[inline]
    pub fn size(&self) -> usize {
        let push = self.push_commit.load(Ordering::Relaxed);
        let pop = self.pop_commit.load(Ordering::Relaxed);
        push.wrapping_sub(pop) as usize
    }

    /// Returns true if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    fn index(&self, ticket: u64) -> usize {
        (ticket % (self.capacity as u64 + 1)) as usize
    }

    /// Attempts to enqueue without waiting for a free cell.
    ///
    /// Returns the value back inside [`Full`] if the queue is full. Having
    /// reserved, the publication still waits for prior producers' commits;
    /// that wait is bounded by their construction times.
    pub fn try_push(&self, value: T) -> Result<(), Full<T>> {
        let mut reserved = self.push_reserve.load(Ordering::Relaxed);
        loop {
            let committed_pop = self.pop_commit.load(Ordering::Acquire);
            if reserved.wrapping_sub(committed_pop) >= self.capacity as u64 {
                return Err(Full(value));
            }
            match self.push_reserve.compare_exchange_weak(
                reserved,
                reserved.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    unsafe { self.slots[self.index(reserved)].write(value) };
                    self.commit_push(reserved);
                    return Ok(());
                }
                Err(current) => reserved = current,
            }
        }
    }

    /// Attempts to dequeue without waiting for an item. Returns `None` if
    /// empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut reserved = self.pop_reserve.load(Ordering::Relaxed);
        loop {
            let committed_push = self.push_commit.load(Ordering::Acquire);
            if !ticket_before(reserved, committed_push) {
                return None;
            }
            match self.pop_reserve.compare_exchange_weak(
                reserved,
                reserved.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // `take` vacates the cell before the commit spin; there is
                    // no separate destroy step left pending.
                    let value = unsafe { self.slots[self.index(reserved)].take() };
                    self.commit_pop(reserved);
                    return Some(value);
                }
                Err(current) => reserved = current,
            }
        }
    }

    /// Enqueues, blocking while the queue is full.
    pub fn push(&self, value: T) {
        let reserved = self.push_reserve.fetch_add(1, Ordering::Relaxed);
        let mut backoff = Backoff::new();
        while reserved.wrapping_sub(self.pop_commit.load(Ordering::Acquire))
            >= self.capacity as u64
        {
            backoff.snooze();
        }
        unsafe { self.slots[self.index(reserved)].write(value) };
        self.commit_push(reserved);
    }

    /// Dequeues, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let reserved = self.pop_reserve.fetch_add(1, Ordering::Relaxed);
        let mut backoff = Backoff::new();
        while !ticket_before(reserved, self.push_commit.load(Ordering::Acquire)) {
            backoff.snooze();
        }
        let value = unsafe { self.slots[self.index(reserved)].take() };
        self.commit_pop(reserved);
        value
    }

    /// Publishes a completed push in ticket order.
    fn commit_push(&self, reserved: u64) {
        let mut backoff = Backoff::new();
        while self.push_commit.load(Ordering::Acquire) != reserved {
            backoff.snooze();
        }
        debug_assert_gapless_commit!(self.push_commit.load(Ordering::Relaxed), reserved);
        self.push_commit
            .store(reserved.wrapping_add(1), Ordering::Release);
        debug_assert_bounded_count!(self.size(), self.capacity);
    }

    /// Publishes a completed pop in ticket order.
    fn commit_pop(&self, reserved: u64) {
        let mut backoff = Backoff::new();
        while self.pop_commit.load(Ordering::Acquire) != reserved {
            backoff.snooze();
        }
        debug_assert_gapless_commit!(self.pop_commit.load(Ordering::Relaxed), reserved);
        self.pop_commit
            .store(reserved.wrapping_add(1), Ordering::Release);
    }
}

impl<T> Drop for ReserveQueue<T> {
    fn drop(&mut self) {
        let mut cursor = self.pop_commit.load(Ordering::Relaxed);
        let end = self.push_commit.load(Ordering::Relaxed);
        while cursor != end {
            unsafe { self.slots[self.index(cursor)].drop_in_place() };
            cursor = cursor.wrapping_add(1);
        }
    }
}

/// True if ticket `a` is strictly before ticket `b` in wrapping order.
#[inline]
fn ticket_before(a: u64, b: u64) -> bool {
    (b.wrapping_sub(a) as i64) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_boundaries() {
        let q = ReserveQueue::<u64>::new(2);
        assert!(q.try_push(10).is_ok());
        assert!(q.try_push(20).is_ok());
        match q.try_push(30) {
            Err(Full(v)) => assert_eq!(v, 30),
            Ok(()) => panic!("push into a full queue succeeded"),
        }
        assert_eq!(q.try_pop(), Some(10));
        assert_eq!(q.try_pop(), Some(20));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_capacity_one() {
        let q = ReserveQueue::<u64>::new(1);
        assert!(q.try_push(1).is_ok());
        assert!(q.try_push(2).is_err());
        assert_eq!(q.try_pop(), Some(1));
        assert!(q.try_push(2).is_ok());
        assert_eq!(q.pop(), 2);
    }

    #[test]
    fn test_commit_counter_wrap_around_ring() {
        // More than two full passes over the spare-cell ring.
        let q = ReserveQueue::<u64>::new(3);
        for cycle in 0..10u64 {
            for i in 0..3 {
                q.push(cycle * 3 + i);
            }
            assert_eq!(q.size(), 3);
            for i in 0..3 {
                assert_eq!(q.pop(), cycle * 3 + i);
            }
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_drop_destroys_committed() {
        use std::sync::atomic::AtomicUsize;
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Tracked;
        impl Drop for Tracked {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        DROPS.store(0, Ordering::SeqCst);
        {
            let q = ReserveQueue::<Tracked>::new(4);
            q.push(Tracked);
            q.push(Tracked);
        }
        assert_eq!(DROPS.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn test_zero_capacity_rejected() {
        let _ = ReserveQueue::<u64>::new(0);
    }
}
