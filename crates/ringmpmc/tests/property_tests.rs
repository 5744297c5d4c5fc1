//! Property tests checking the single-threaded semantics of every queue in
//! the family against a `VecDeque` model, plus construction/destruction
//! accounting over arbitrary operation sequences.

use proptest::prelude::*;
use ringmpmc::{LocalQueue, LockQueue, ReserveQueue, SeqQueue};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Payload that counts how many live instances exist.
struct Tracked {
    value: u64,
    live: Rc<Cell<isize>>,
}

impl Tracked {
    fn new(value: u64, live: &Rc<Cell<isize>>) -> Self {
        live.set(live.get() + 1);
        Self {
            value,
            live: Rc::clone(live),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

/// One queue operation: `true` pushes the next value, `false` pops.
fn ops() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(prop::bool::ANY, 1..200)
}

macro_rules! model_equivalence {
    ($name:ident, $make:expr, $try_push:expr, $try_pop:expr) => {
        proptest! {
            #[test]
            fn $name(capacity in 1usize..16, ops in ops()) {
                let capacity = capacity.max(2); // family-wide lower bound
                let mut queue = $make(capacity);
                let mut model: VecDeque<u64> = VecDeque::new();
                let live = Rc::new(Cell::new(0isize));
                let mut next = 0u64;

                for op in ops {
                    if op {
                        let pushed = $try_push(&mut queue, Tracked::new(next, &live));
                        if model.len() < capacity {
                            prop_assert!(pushed, "push refused below capacity");
                            model.push_back(next);
                        } else {
                            prop_assert!(!pushed, "push accepted at capacity");
                        }
                        next += 1;
                    } else {
                        let got: Option<Tracked> = $try_pop(&mut queue);
                        prop_assert_eq!(got.map(|t| t.value), model.pop_front());
                    }
                    prop_assert_eq!(queue.size(), model.len());
                    prop_assert!(queue.size() <= queue.capacity());
                }

                drop(queue);
                // Every constructed payload has been destroyed exactly once.
                prop_assert_eq!(live.get(), 0);
            }
        }
    };
}

model_equivalence!(
    prop_seq_queue_matches_model,
    |c| SeqQueue::<Tracked>::new(c),
    |q: &mut SeqQueue<Tracked>, v| q.try_push(v).is_ok(),
    |q: &mut SeqQueue<Tracked>| q.try_pop()
);

model_equivalence!(
    prop_reserve_queue_matches_model,
    |c| ReserveQueue::<Tracked>::new(c),
    |q: &mut ReserveQueue<Tracked>, v| q.try_push(v).is_ok(),
    |q: &mut ReserveQueue<Tracked>| q.try_pop()
);

model_equivalence!(
    prop_lock_queue_matches_model,
    |c| LockQueue::<Tracked>::new(c),
    |q: &mut LockQueue<Tracked>, v| q.try_push(v).is_ok(),
    |q: &mut LockQueue<Tracked>| q.try_pop()
);

model_equivalence!(
    prop_local_queue_matches_model,
    |c| LocalQueue::<Tracked>::new(c),
    |q: &mut LocalQueue<Tracked>, v| q.try_push(v).is_ok(),
    |q: &mut LocalQueue<Tracked>| q.try_pop()
);

proptest! {
    /// Counter wrap inside the ring: after any number of full cycles the
    /// queue still round-trips values in order.
    #[test]
    fn prop_epoch_cycles_preserve_fifo(capacity in 2usize..12, cycles in 1usize..40) {
        let queue = SeqQueue::<u64>::new(capacity);
        let mut next = 0u64;
        for _ in 0..cycles {
            for _ in 0..capacity {
                prop_assert!(queue.try_push(next).is_ok());
                next += 1;
            }
            prop_assert!(queue.try_push(next).is_err());
            let base = next - capacity as u64;
            for i in 0..capacity as u64 {
                prop_assert_eq!(queue.try_pop(), Some(base + i));
            }
            prop_assert_eq!(queue.try_pop(), None);
        }
    }
}
