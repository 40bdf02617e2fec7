//! Unit tests for counting_semaphore.rs

use crate::sync::CountingSemaphore;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// NON-BLOCKING BEHAVIOUR
// ============================================================================

#[test]
fn test_try_acquire_requires_exact_count() {
    let sem = CountingSemaphore::new();
    sem.release();
    sem.release();
    sem.release();

    assert!(!sem.try_acquire(2));
    assert!(!sem.try_acquire(4));
    assert_eq!(sem.value(), 3);
    assert!(sem.try_acquire(3));
    assert_eq!(sem.value(), 0);
}

#[test]
fn test_acquire_zero_is_immediate() {
    let sem = CountingSemaphore::new();
    sem.acquire(0);
    assert_eq!(sem.value(), 0);
}

// ============================================================================
// BARRIER BEHAVIOUR
// ============================================================================

#[test]
fn test_acquire_waits_for_all_workers() {
    const WORKERS: u32 = 6;
    let sem = Arc::new(CountingSemaphore::new());
    let finished = Arc::new(AtomicU32::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|i| {
            let sem = sem.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(5 * u64::from(i)));
                finished.fetch_add(1, Ordering::SeqCst);
                sem.release();
            })
        })
        .collect();

    sem.acquire(WORKERS);
    assert_eq!(finished.load(Ordering::SeqCst), WORKERS);

    // Counter was reset by the acquire
    assert!(!sem.try_acquire(1));
    assert_eq!(sem.value(), 0);

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_acquire_does_not_return_early() {
    let sem = Arc::new(CountingSemaphore::new());
    sem.release();

    let waiter = {
        let sem = sem.clone();
        thread::spawn(move || sem.acquire(2))
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!waiter.is_finished());

    sem.release();
    waiter.join().unwrap();
    assert_eq!(sem.value(), 0);
}

#[test]
fn test_reusable_across_rounds() {
    const WORKERS: u32 = 3;
    let sem = Arc::new(CountingSemaphore::new());

    for _ in 0..10 {
        let handles: Vec<_> = (0..WORKERS)
            .map(|_| {
                let sem = sem.clone();
                thread::spawn(move || sem.release())
            })
            .collect();
        sem.acquire(WORKERS);
        for handle in handles {
            handle.join().unwrap();
        }
    }
    assert_eq!(sem.value(), 0);
}
