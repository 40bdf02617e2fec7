//! Unit tests for binary_semaphore.rs

use crate::sync::BinarySemaphore;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// NON-BLOCKING BEHAVIOUR
// ============================================================================

#[test]
fn test_new_semaphore_is_unsignaled() {
    let sem = BinarySemaphore::new();
    assert!(!sem.is_signaled());
    assert!(!sem.try_acquire());
}

#[test]
fn test_release_then_try_acquire_consumes_permit() {
    let sem = BinarySemaphore::new();
    sem.release();
    assert!(sem.is_signaled());
    assert!(sem.try_acquire());
    assert!(!sem.try_acquire());
}

#[test]
fn test_second_release_does_not_queue_a_permit() {
    let sem = BinarySemaphore::new();
    sem.release();
    sem.release();
    assert!(sem.try_acquire());
    assert!(!sem.try_acquire());
}

#[test]
fn test_acquire_returns_immediately_when_signaled() {
    let sem = BinarySemaphore::new();
    sem.release();
    sem.acquire();
    assert!(!sem.is_signaled());
}

// ============================================================================
// BLOCKING BEHAVIOUR
// ============================================================================

#[test]
fn test_acquire_blocks_until_release() {
    let sem = Arc::new(BinarySemaphore::new());
    let released = Arc::new(AtomicBool::new(false));

    let waiter = {
        let sem = sem.clone();
        let released = released.clone();
        thread::spawn(move || {
            sem.acquire();
            released.load(Ordering::SeqCst)
        })
    };

    thread::sleep(Duration::from_millis(50));
    released.store(true, Ordering::SeqCst);
    sem.release();

    assert!(waiter.join().unwrap(), "acquire returned before release");
}

#[test]
fn test_single_release_wakes_exactly_one_of_two_waiters() {
    let sem = Arc::new(BinarySemaphore::new());
    let passed = Arc::new(AtomicU32::new(0));

    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let sem = sem.clone();
            let passed = passed.clone();
            thread::spawn(move || {
                sem.acquire();
                passed.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    sem.release();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(passed.load(Ordering::SeqCst), 1);

    sem.release();
    for waiter in waiters {
        waiter.join().unwrap();
    }
    assert_eq!(passed.load(Ordering::SeqCst), 2);
    assert!(!sem.is_signaled());
}

#[test]
fn test_ping_pong_hand_off() {
    let ping = Arc::new(BinarySemaphore::new());
    let pong = Arc::new(BinarySemaphore::new());
    const ROUNDS: u32 = 200;

    let worker = {
        let ping = ping.clone();
        let pong = pong.clone();
        thread::spawn(move || {
            for _ in 0..ROUNDS {
                ping.acquire();
                pong.release();
            }
        })
    };

    for _ in 0..ROUNDS {
        ping.release();
        pong.acquire();
    }
    worker.join().unwrap();
    assert!(!ping.is_signaled());
    assert!(!pong.is_signaled());
}
