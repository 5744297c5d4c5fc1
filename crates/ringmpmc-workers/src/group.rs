use std::sync::{Arc, Condvar, Mutex, PoisonError};

/// Shared barrier state: an in-progress count and its completion signal.
pub(crate) struct GroupInner {
    in_progress: Mutex<usize>,
    all_complete: Condvar,
}

impl GroupInner {
    /// Registers one task with the group.
    pub(crate) fn enter(&self) {
        let mut count = self
            .in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *count += 1;
    }

    /// Marks one task complete, waking waiters when the count hits zero.
    pub(crate) fn leave(&self) {
        let mut count = self
            .in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        debug_assert!(*count > 0, "group left more often than entered");
        *count -= 1;
        self.all_complete.notify_all();
    }

    fn wait(&self) {
        let mut count = self
            .in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while *count != 0 {
            count = self
                .all_complete
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Counting barrier over a set of submitted tasks.
///
/// Submitting a task with `push_group` registers it here; the task leaves the
/// group when it finishes. [`wait`] blocks until every registered task has
/// left. By default the group also waits when dropped; clear that with
/// [`set_wait_on_drop`] for fire-and-forget groups.
///
/// [`wait`]: TaskGroup::wait
/// [`set_wait_on_drop`]: TaskGroup::set_wait_on_drop
pub struct TaskGroup {
    inner: Arc<GroupInner>,
    wait_on_drop: bool,
}

impl TaskGroup {
    /// Creates a group that waits for its tasks on drop.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GroupInner {
                in_progress: Mutex::new(0),
                all_complete: Condvar::new(),
            }),
            wait_on_drop: true,
        }
    }

    /// Changes whether dropping the group blocks until all tasks complete.
    pub fn set_wait_on_drop(&mut self, wait: bool) {
        self.wait_on_drop = wait;
    }

    /// Blocks until every task registered with this group has completed.
    pub fn wait(&self) {
        self.inner.wait();
    }

    /// Returns the number of tasks currently in progress.
    pub fn in_progress(&self) -> usize {
        *self
            .inner
            .in_progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn inner(&self) -> &Arc<GroupInner> {
        &self.inner
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        if self.wait_on_drop {
            self.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_blocks_until_all_leave() {
        let group = TaskGroup::new();
        for _ in 0..4 {
            group.inner().enter();
        }
        assert_eq!(group.in_progress(), 4);

        let inner = Arc::clone(group.inner());
        let finisher = thread::spawn(move || {
            for _ in 0..4 {
                thread::sleep(Duration::from_millis(2));
                inner.leave();
            }
        });

        group.wait();
        assert_eq!(group.in_progress(), 0);
        finisher.join().unwrap();
    }

    #[test]
    fn test_empty_group_does_not_block() {
        let group = TaskGroup::new();
        group.wait();
        drop(group);
    }
}
