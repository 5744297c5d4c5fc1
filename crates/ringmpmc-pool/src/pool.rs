use ringmpmc::LockQueue;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{self, AtomicUsize, Ordering};
use std::sync::Arc;

/// A pool element plus its share count.
///
/// `use_count == 0` iff the slot's index currently sits in the free list;
/// the 1 → 0 transition is the only one that pushes it back.
struct PoolSlot<T> {
    value: T,
    use_count: AtomicUsize,
}

struct PoolInner<T> {
    slots: Box<[PoolSlot<T>]>,
    /// Free list of slot indices; its size is the pool's size.
    free: LockQueue<usize>,
}

/// Fixed-capacity pool of pre-constructed shared objects.
///
/// All elements are constructed at pool creation and destroyed with the pool;
/// [`pop`] and [`try_pop`] lend them out as counted [`PoolHandle`]s. The pool
/// itself is a cheap handle over shared state and can be cloned across
/// threads.
///
/// Handles keep the element storage alive, so a handle outliving the last
/// `BoundedPool` clone is fine: the storage is released only after the final
/// handle drops.
///
/// [`pop`]: BoundedPool::pop
/// [`try_pop`]: BoundedPool::try_pop
pub struct BoundedPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> BoundedPool<T> {
    /// Creates a pool of `capacity` clones of `value`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::with_factory(capacity, |_| value.clone())
    }

    /// Creates a pool whose elements are produced by `factory`, called once
    /// per slot with the slot index.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_factory(capacity: usize, mut factory: impl FnMut(usize) -> T) -> Self {
        assert!(capacity >= 1, "pool capacity must be at least 1");
        let slots: Box<[PoolSlot<T>]> = (0..capacity)
            .map(|i| PoolSlot {
                value: factory(i),
                use_count: AtomicUsize::new(0),
            })
            .collect();
        let free = LockQueue::new(capacity);
        for i in 0..capacity {
            free.push(i);
        }
        Self {
            inner: Arc::new(PoolInner { slots, free }),
        }
    }

    /// Returns the number of elements currently available.
    #[inline]
    pub fn size(&self) -> usize {
        self.inner.free.size()
    }

    /// Returns the pool capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns true if no element is currently available.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Borrows an element, blocking until one is available.
    pub fn pop(&self) -> PoolHandle<T> {
        let index = self.inner.free.pop();
        self.make_handle(index)
    }

    /// Borrows an element without blocking. Returns `None` if every element
    /// is currently lent out.
    pub fn try_pop(&self) -> Option<PoolHandle<T>> {
        let index = self.inner.free.try_pop()?;
        Some(self.make_handle(index))
    }

    fn make_handle(&self, index: usize) -> PoolHandle<T> {
        let prev = self.inner.slots[index].use_count.fetch_add(1, Ordering::Relaxed);
        debug_assert!(prev == 0, "element {index} handed out while still shared");
        PoolHandle {
            inner: Arc::clone(&self.inner),
            index,
        }
    }
}

impl<T> Clone for BoundedPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> FromIterator<T> for BoundedPool<T> {
    /// Builds a pool from initial element values, one slot per item.
    ///
    /// # Panics
    ///
    /// Panics if the iterator is empty.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let slots: Box<[PoolSlot<T>]> = iter
            .into_iter()
            .map(|value| PoolSlot {
                value,
                use_count: AtomicUsize::new(0),
            })
            .collect();
        assert!(!slots.is_empty(), "pool capacity must be at least 1");
        let free = LockQueue::new(slots.len());
        for i in 0..slots.len() {
            free.push(i);
        }
        Self {
            inner: Arc::new(PoolInner { slots, free }),
        }
    }
}

impl<T> fmt::Debug for BoundedPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedPool")
            .field("capacity", &self.capacity())
            .field("size", &self.size())
            .finish()
    }
}

/// Counted borrow of a pool element.
///
/// Cloning shares the element; dropping the last clone returns the element to
/// its pool. Access is shared (`Deref` to `&T`) — an element lent to several
/// holders at once must synchronize interior mutation itself.
pub struct PoolHandle<T> {
    inner: Arc<PoolInner<T>>,
    index: usize,
}

impl<T> PoolHandle<T> {
    /// Returns the number of handles currently sharing this element.
    pub fn use_count(&self) -> usize {
        self.slot().use_count.load(Ordering::Acquire)
    }

    #[inline]
    fn slot(&self) -> &PoolSlot<T> {
        &self.inner.slots[self.index]
    }
}

impl<T> Deref for PoolHandle<T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        &self.slot().value
    }
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        self.slot().use_count.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::clone(&self.inner),
            index: self.index,
        }
    }
}

impl<T> Drop for PoolHandle<T> {
    fn drop(&mut self) {
        // Arc-style release protocol: the Release decrement orders this
        // holder's use of the element before the Acquire fence of whoever
        // reuses it.
        if self.slot().use_count.fetch_sub(1, Ordering::Release) == 1 {
            atomic::fence(Ordering::Acquire);
            self.inner.free.push(self.index);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoolHandle").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_decrements_size() {
        let pool = BoundedPool::new(10, 1.0f32);
        assert_eq!(pool.capacity(), 10);
        assert_eq!(pool.size(), 10);

        let handle = pool.try_pop().unwrap();
        assert_eq!(*handle, 1.0);
        assert_eq!(handle.use_count(), 1);
        assert_eq!(pool.size(), 9);

        drop(handle);
        assert_eq!(pool.size(), 10);
    }

    #[test]
    fn test_factory_constructor() {
        let pool = BoundedPool::with_factory(4, |i| i * i);
        let mut seen: Vec<usize> = (0..4).map(|_| *pool.pop()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 4, 9]);
    }

    #[test]
    fn test_from_iterator_round_trip() {
        let pool: BoundedPool<u64> = (0..10u64).collect();
        assert_eq!(pool.size(), 10);

        let handles: Vec<_> = std::iter::from_fn(|| pool.try_pop()).collect();
        assert_eq!(handles.len(), 10);
        assert_eq!(pool.size(), 0);
        assert!(pool.is_empty());
        assert!(pool.try_pop().is_none());

        let mut values: Vec<u64> = handles.iter().map(|h| **h).collect();
        values.sort_unstable();
        assert_eq!(values, (0..10u64).collect::<Vec<_>>());

        drop(handles);
        assert_eq!(pool.size(), 10);
    }

    #[test]
    fn test_clone_shares_count() {
        let pool = BoundedPool::new(2, String::from("buf"));
        let a = pool.pop();
        let b = a.clone();
        assert_eq!(a.use_count(), 2);
        assert_eq!(b.use_count(), 2);
        assert_eq!(pool.size(), 1);

        drop(a);
        assert_eq!(b.use_count(), 1);
        assert_eq!(pool.size(), 1);

        drop(b);
        assert_eq!(pool.size(), 2);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn test_zero_capacity_rejected() {
        let _ = BoundedPool::new(0, 0u8);
    }
}
