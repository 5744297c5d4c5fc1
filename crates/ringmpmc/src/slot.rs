use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;

/// A queue cell holding either nothing or one value of `T`.
///
/// Storage is raw uninitialized memory; construction and destruction are
/// explicit and never happen implicitly on cell reuse. The owning queue is
/// responsible for the accounting: exactly one [`take`] or [`drop_in_place`]
/// per [`write`], sequenced by the queue's own protocol.
///
/// [`write`]: Slot::write
/// [`take`]: Slot::take
/// [`drop_in_place`]: Slot::drop_in_place
///
/// # Synchronization
///
/// All methods take `&self`; the slot itself provides no synchronization.
/// Callers must guarantee exclusive access for the duration of each call —
/// in this crate that guarantee comes from the slot-id handshake ([`SeqQueue`]),
/// the reserve/commit counters ([`ReserveQueue`]), the push/pop mutexes
/// ([`LockQueue`]), or plain `&mut` exclusivity ([`LocalQueue`]).
///
/// [`SeqQueue`]: crate::SeqQueue
/// [`ReserveQueue`]: crate::ReserveQueue
/// [`LockQueue`]: crate::LockQueue
/// [`LocalQueue`]: crate::LocalQueue
pub(crate) struct Slot<T> {
    value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    /// Creates an empty slot; the storage is uninitialized.
    pub(crate) const fn new() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    /// Constructs `value` in place.
    ///
    /// # Safety
    ///
    /// The slot must be empty and the caller must have exclusive access.
    #[inline]
    pub(crate) unsafe fn write(&self, value: T) {
        (*self.value.get()).write(value);
    }

    /// Moves the value out, leaving the slot empty.
    ///
    /// The move-then-destroy pair of a manual-lifetime cell collapses into a
    /// single `ptr::read`: after `take` the storage is uninitialized again and
    /// no separate destruction is owed.
    ///
    /// # Safety
    ///
    /// The slot must be full and the caller must have exclusive access.
    #[inline]
    pub(crate) unsafe fn take(&self) -> T {
        ptr::read((*self.value.get()).as_ptr())
    }

    /// Runs the value's destructor in place, leaving the slot empty.
    ///
    /// # Safety
    ///
    /// The slot must be full and the caller must have exclusive access.
    #[inline]
    pub(crate) unsafe fn drop_in_place(&self) {
        ptr::drop_in_place((*self.value.get()).as_mut_ptr());
    }

    /// Returns a reference to the contained value.
    ///
    /// # Safety
    ///
    /// The slot must be full and no exclusive access may be active.
    #[inline]
    #[allow(dead_code)]
    pub(crate) unsafe fn get(&self) -> &T {
        &*(*self.value.get()).as_ptr()
    }

    /// Returns a mutable reference to the contained value.
    ///
    /// # Safety
    ///
    /// The slot must be full and the caller must have exclusive access.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn get_mut(&self) -> &mut T {
        &mut *(*self.value.get()).as_mut_ptr()
    }
}
