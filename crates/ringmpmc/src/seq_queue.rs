use crate::invariants::debug_assert_slot_claim;
use crate::slot::Slot;
use crate::{Backoff, Full};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Every operation is assigned a monotonically increasing ticket from one of
// two counters (`push_counter` for producers, `pop_counter` for consumers).
// `ticket % capacity` selects the cell; the per-cell atomic `id` is the
// handshake that orders producers and consumers on that cell:
//
//   id == t              cell is empty, ticket `t` is the next writer
//   id == t + 1          value written under ticket `t`, awaiting consumption
//   id == t + capacity   value consumed, the cell has entered the next epoch
//
// For ticket `t`, exactly one producer publishes `id = t + 1` and exactly one
// consumer later publishes `id = t + capacity`. That gives mutual exclusion
// per cell without a mutex and keeps producers from overwriting unread data.
//
// ## Memory ordering protocol
//
// - Every load of a cell `id` is Acquire: it synchronizes with the Release
//   store of whichever party previously published the cell.
// - Every publication of a cell `id` is Release: it publishes the write (or
//   the vacating read) that preceded it.
// - All counter operations are Relaxed, including the reserving `fetch_add`
//   of the blocking paths: the slot-id handshake carries the synchronization,
//   the counters only distribute tickets.
//
// ## Counter arithmetic
//
// Tickets are u64 and wrap; all comparisons go through `ticket_before`
// (wrapping difference interpreted as signed), so correctness does not depend
// on counters staying below 2^64. The ring index is `ticket % capacity` —
// capacity is not required to be a power of two.
//
// =============================================================================

/// Lock-free MPMC bounded queue over a slot-sequenced ring.
///
/// Each cell carries its own epoch id; producers and consumers hand the cell
/// to each other through that id alone. This is the low-latency member of the
/// queue family: one CAS plus one Release store per operation on the fast
/// path, with the hot counters on separate cache lines.
pub struct SeqQueue<T> {
    slots: Box<[SeqSlot<T>]>,
    capacity: usize,
    push_counter: CachePadded<AtomicU64>,
    pop_counter: CachePadded<AtomicU64>,
}

struct SeqSlot<T> {
    /// Epoch id of the cell; padded so neighbouring cells' handshakes do not
    /// share a cache line.
    id: CachePadded<AtomicU64>,
    value: Slot<T>,
}

// The padding discipline is the point of this design: the two counters and
// every cell id must sit at least a destructive-interference distance apart.
const _: () = assert!(std::mem::align_of::<CachePadded<AtomicU64>>() >= 64);

// Safety: the slot-id handshake gives each cell exactly one accessor at a
// time, so sending values of `T` across threads is all that is required.
unsafe impl<T: Send> Send for SeqQueue<T> {}
unsafe impl<T: Send> Sync for SeqQueue<T> {}

impl<T> SeqQueue<T> {
    /// Creates a queue with the given capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity < 2`. A one-cell ring cannot distinguish the
    /// "next writer" and "awaiting consumption" states of the same epoch.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 2, "queue capacity must be at least 2");
        let slots = (0..capacity)
            .map(|i| SeqSlot {
                id: CachePadded::new(AtomicU64::new(i as u64)),
                value: Slot::new(),
            })
            .collect();
        Self {
            slots,
            capacity,
            push_counter: CachePadded::new(AtomicU64::new(0)),
            pop_counter: CachePadded::new(AtomicU64::new(0)),
        }
    }

    /// Returns the queue capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the current number of items.
    ///
    /// Computed from the raw ticket counters; while blocking reservations are
    /// outstanding it may transiently over-report.
    #[inline]
    pub fn size(&self) -> usize {
        let push = self.push_counter.load(Ordering::Relaxed);
        let pop = self.pop_counter.load(Ordering::Relaxed);
        push.wrapping_sub(pop) as usize
    }

    /// Returns true if the queue is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    fn index(&self, ticket: u64) -> usize {
        (ticket % self.capacity as u64) as usize
    }

    /// Attempts to enqueue without blocking.
    ///
    /// Returns the value back inside [`Full`] if the queue is full; nothing
    /// is constructed in that case.
    pub fn try_push(&self, value: T) -> Result<(), Full<T>> {
        let mut push = self.push_counter.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[self.index(push)];
            let id = slot.id.load(Ordering::Acquire);
            if id == push {
                // Overwrite protection: the cell is empty for exactly this
                // ticket; win the counter to claim it.
                match self.push_counter.compare_exchange_weak(
                    push,
                    push.wrapping_add(1),
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        debug_assert_slot_claim!(slot.id.load(Ordering::Relaxed), push);
                        unsafe { slot.value.write(value) };
                        slot.id.store(push.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(current) => push = current,
                }
            } else if ticket_before(id, push) {
                // The cell still holds a value from `capacity` tickets ago.
                return Err(Full(value));
            } else {
                // Another producer claimed this ticket between our reads.
                push = self.push_counter.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to dequeue without blocking. Returns `None` if empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut pop = self.pop_counter.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[self.index(pop)];
            let next = pop.wrapping_add(1);
            let id = slot.id.load(Ordering::Acquire);
            if id == next {
                match self.pop_counter.compare_exchange_weak(
                    pop,
                    next,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        let value = unsafe { slot.value.take() };
                        // Advance the cell into the next epoch.
                        slot.id
                            .store(pop.wrapping_add(self.capacity as u64), Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pop = current,
                }
            } else if ticket_before(id, next) {
                return None;
            } else {
                pop = self.pop_counter.load(Ordering::Relaxed);
            }
        }
    }

    /// Enqueues, blocking while the queue is full.
    ///
    /// Reserves a ticket up front, then waits for the cell to empty. The wait
    /// backs off from spinning to scheduler yields, bounded by one consumer
    /// epoch-advance per cell.
    pub fn push(&self, value: T) {
        let ticket = self.push_counter.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[self.index(ticket)];
        let mut backoff = Backoff::new();
        while slot.id.load(Ordering::Acquire) != ticket {
            backoff.snooze();
        }
        unsafe { slot.value.write(value) };
        slot.id.store(ticket.wrapping_add(1), Ordering::Release);
    }

    /// Dequeues, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        let ticket = self.pop_counter.fetch_add(1, Ordering::Relaxed);
        let next = ticket.wrapping_add(1);
        let slot = &self.slots[self.index(ticket)];
        let mut backoff = Backoff::new();
        while slot.id.load(Ordering::Acquire) != next {
            backoff.snooze();
        }
        let value = unsafe { slot.value.take() };
        slot.id
            .store(ticket.wrapping_add(self.capacity as u64), Ordering::Release);
        value
    }
}

impl<T> Drop for SeqQueue<T> {
    fn drop(&mut self) {
        // Walk forward from the consumer cursor, destroying cells that still
        // hold a published value.
        let mut pop = self.pop_counter.load(Ordering::Relaxed);
        for _ in 0..self.capacity {
            let slot = &self.slots[self.index(pop)];
            if slot.id.load(Ordering::Relaxed) == pop.wrapping_add(1) {
                unsafe { slot.value.drop_in_place() };
                pop = pop.wrapping_add(1);
            } else {
                break;
            }
        }
    }
}

/// True if ticket `a` is strictly before ticket `b` in wrapping order.
#[inline]
fn ticket_before(a: u64, b: u64) -> bool {
    (b.wrapping_sub(a) as i64) > 0
}
