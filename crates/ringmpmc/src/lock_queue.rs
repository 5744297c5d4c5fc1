use crate::invariants::debug_assert_bounded_count;
use crate::slot::Slot;
use crate::{Backoff, Full};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// MPMC bounded queue with one mutex per side.
///
/// Producers serialize on the push guard, consumers on the pop guard; the two
/// sides only meet through the atomic ring indices. This is the correctness
/// baseline of the family, not the latency path — the blocking operations
/// spin under the lock instead of parking on a condition variable, so the
/// contract stays identical to the lock-free rings.
///
/// The ring holds `capacity + 1` cells and stores indices already wrapped,
/// the spare cell distinguishing full from empty.
pub struct LockQueue<T> {
    slots: Box<[Slot<T>]>,
    capacity: usize,
    push_index: AtomicUsize,
    pop_index: AtomicUsize,
    push_guard: CachePadded<Mutex<()>>,
    pop_guard: CachePadded<Mutex<()>>,
}

// Safety: the side guards give writers and readers exclusive access to their
// cursor cell; the index handoff is Release/Acquire.
unsafe impl<T: Send> Send for LockQueue<T> {}
unsafe impl<T: Send> Sync for LockQueue<T> {}

impl<T> LockQueue<T> {
    /// Creates a queue with the given capacity.
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
            push_index: AtomicUsize::new(0),
            pop_index: AtomicUsize::new(0),
            push_guard: CachePadded::new(Mutex::new(())),
            pop_guard: CachePadded::new(Mutex::new(())),
        }
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current number of items.
    #[inline]
    pub fn size(&self) -> usize {
        let push = self.push_index.load(Ordering::Relaxed);
        let pop = self.pop_index.load(Ordering::Relaxed);
        if pop > push {
            self.capacity + 1 + push - pop
        } else {
            push - pop
        }
    }

    /// Returns true if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    fn wrap(&self, index: usize) -> usize {
        index % (self.capacity + 1)
    }

    /// Attempts to enqueue without blocking on a full queue.
    pub fn try_push(&self, value: T) -> Result<(), Full<T>> {
        let _lock = self
            .push_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let push = self.push_index.load(Ordering::Relaxed);
        let next = self.wrap(push + 1);
        if next == self.pop_index.load(Ordering::Acquire) {
            return Err(Full(value));
        }
        unsafe { self.slots[push].write(value) };
        self.push_index.store(next, Ordering::Release);
        debug_assert_bounded_count!(self.size(), self.capacity);
        Ok(())
    }

    /// Enqueues, blocking (under the push guard) while the queue is full.
    pub fn push(&self, value: T) {
        let _lock = self
            .push_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let push = self.push_index.load(Ordering::Relaxed);
        let next = self.wrap(push + 1);
        let mut backoff = Backoff::new();
        while next == self.pop_index.load(Ordering::Acquire) {
            backoff.snooze();
        }
        unsafe { self.slots[push].write(value) };
        self.push_index.store(next, Ordering::Release);
    }

    /// Attempts to dequeue without blocking on an empty queue.
    pub fn try_pop(&self) -> Option<T> {
        let _lock = self.pop_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let pop = self.pop_index.load(Ordering::Relaxed);
        if pop == self.push_index.load(Ordering::Acquire) {
            return None;
        }
        let value = unsafe { self.slots[pop].take() };
        self.pop_index.store(self.wrap(pop + 1), Ordering::Release);
        Some(value)
    }

    /// Dequeues, blocking (under the pop guard) while the queue is empty.
    pub fn pop(&self) -> T {
        let _lock = self.pop_guard.lock().unwrap_or_else(PoisonError::into_inner);
        let pop = self.pop_index.load(Ordering::Relaxed);
        let mut backoff = Backoff::new();
        while pop == self.push_index.load(Ordering::Acquire) {
            backoff.snooze();
        }
        let value = unsafe { self.slots[pop].take() };
        self.pop_index.store(self.wrap(pop + 1), Ordering::Release);
        value
    }
}

impl<T> Drop for LockQueue<T> {
    fn drop(&mut self) {
        let mut pop = self.pop_index.load(Ordering::Relaxed);
        let push = self.push_index.load(Ordering::Relaxed);
        while pop != push {
            unsafe { self.slots[pop].drop_in_place() };
            pop = self.wrap(pop + 1);
        }
    }
}
