use ringmpmc_pool::BoundedPool;
use std::sync::Arc;
use std::thread;

#[test]
fn test_return_on_last_release() {
    let pool = BoundedPool::new(10, 7u64);

    let first = pool.pop();
    let second = first.clone();
    let third = first.clone();
    assert_eq!(first.use_count(), 3);
    assert_eq!(pool.size(), 9);

    drop(second);
    drop(third);
    // Two of three copies released: the element stays out.
    assert_eq!(first.use_count(), 1);
    assert_eq!(pool.size(), 9);

    drop(first);
    assert_eq!(pool.size(), 10);
}

#[test]
fn test_released_element_is_reused() {
    let pool = BoundedPool::with_factory(10, |i| i as u64);

    // Drain the pool so the identity of the next pop is deterministic.
    let mut held: Vec<_> = (0..10).map(|_| pool.pop()).collect();
    assert!(pool.is_empty());

    let released = held.pop().unwrap();
    let address = &*released as *const u64;
    let value = *released;
    drop(released);
    assert_eq!(pool.size(), 1);

    // The only free element is the one just returned.
    let reused = pool.pop();
    assert_eq!(&*reused as *const u64, address);
    assert_eq!(*reused, value);
}

#[test]
fn test_size_plus_outstanding_is_capacity() {
    let pool = BoundedPool::new(8, 0u32);
    let mut held = Vec::new();
    for out in 1..=8 {
        held.push(pool.pop());
        assert_eq!(pool.size() + held.len(), pool.capacity());
        assert_eq!(pool.size(), 8 - out);
    }
    held.clear();
    assert_eq!(pool.size(), 8);
}

#[test]
fn test_concurrent_borrowers() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 2_000;

    let pool = Arc::new(BoundedPool::new(3, vec![0u8; 64]));
    let mut handles = Vec::new();
    for _ in 0..THREADS {
        let pool = Arc::clone(&pool);
        handles.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                let element = pool.pop();
                assert_eq!(element.len(), 64);
                assert!(element.use_count() >= 1);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    // Every borrow was returned.
    assert_eq!(pool.size(), 3);
}

#[test]
fn test_handles_keep_storage_alive() {
    let handle = {
        let pool = BoundedPool::new(2, String::from("survivor"));
        pool.pop()
        // pool dropped here, element storage retained by the handle
    };
    assert_eq!(&*handle, "survivor");
    assert_eq!(handle.use_count(), 1);
}
