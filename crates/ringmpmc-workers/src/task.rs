use crate::future::Promise;
use crate::group::GroupInner;
use std::sync::Arc;

/// Fixed-signature task: function pointer, argument, result promise.
///
/// Stored by value in the bounded task rings of the fixed-signature pools —
/// enqueueing one constructs nothing on the heap beyond its promise channel.
pub(crate) struct FnTask<A, R> {
    f: fn(A) -> R,
    arg: A,
    promise: Promise<R>,
}

impl<A, R> FnTask<A, R> {
    pub(crate) fn new(f: fn(A) -> R, arg: A, promise: Promise<R>) -> Self {
        Self { f, arg, promise }
    }

    /// Applies the function and fulfils the promise.
    pub(crate) fn run(self) {
        self.promise.set((self.f)(self.arg));
    }
}

/// The type-erased task capability: a single `run`.
///
/// Heterogeneous pools store tasks behind this interface, boxed or placed
/// inside the polymorphic queue's node buffers.
pub(crate) trait TaskRun: Send {
    fn run(&mut self);
}

/// Type-erased task holding an arbitrary callable and a typed promise.
///
/// Arguments live in the closure capture; the submitter's future stays
/// statically typed to the callable's return type.
pub(crate) struct ErasedTask<F, R> {
    cell: Option<(F, Promise<R>)>,
}

impl<F, R> ErasedTask<F, R> {
    pub(crate) fn new(f: F, promise: Promise<R>) -> Self {
        Self {
            cell: Some((f, promise)),
        }
    }
}

impl<F, R> TaskRun for ErasedTask<F, R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    fn run(&mut self) {
        if let Some((f, promise)) = self.cell.take() {
            promise.set(f());
        }
    }
}

/// Group-bound task: runs the callable, then leaves its group.
pub(crate) struct GroupTask<F> {
    cell: Option<(F, Arc<GroupInner>)>,
}

impl<F> GroupTask<F> {
    pub(crate) fn new(f: F, group: Arc<GroupInner>) -> Self {
        Self {
            cell: Some((f, group)),
        }
    }
}

impl<F> TaskRun for GroupTask<F>
where
    F: FnOnce() + Send,
{
    fn run(&mut self) {
        if let Some((f, group)) = self.cell.take() {
            f();
            group.leave();
        }
    }
}

impl<F> Drop for GroupTask<F> {
    fn drop(&mut self) {
        // A task destroyed unexecuted still leaves its group, so `wait`
        // cannot hang on tasks the pool abandoned at shutdown.
        if let Some((_, group)) = self.cell.take() {
            group.leave();
        }
    }
}
