use std::fmt;
use thiserror::Error;

/// Error returned by the non-blocking `try_push` when the queue is full.
///
/// The rejected value is handed back so the caller can retry or drop it;
/// a failed push never constructs anything inside the queue.
#[derive(Error, Clone, Copy, PartialEq, Eq)]
#[error("queue is full")]
pub struct Full<T>(pub T);

impl<T> Full<T> {
    /// Consumes the error, returning the rejected value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual Debug keeps the payload opaque so `Result<_, Full<T>>` stays
// debuggable for payloads that are not `Debug` themselves.
impl<T> fmt::Debug for Full<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad("Full(..)")
    }
}
