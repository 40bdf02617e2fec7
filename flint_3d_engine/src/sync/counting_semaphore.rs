/// Counting semaphore - "exactly K completions" barrier
///
/// `release()` increments an atomic counter. `acquire(count)` waits until the
/// counter equals `count` exactly, then resets it to zero in the same atomic
/// step. Used by the secondary command recorder: K workers each release once,
/// the primary thread acquires K.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

use super::binary_semaphore::SPIN_LIMIT;

pub struct CountingSemaphore {
    counter: AtomicU32,
    lock: Mutex<()>,
    wake: Condvar,
}

impl CountingSemaphore {
    /// Create a semaphore with a zero counter
    pub fn new() -> Self {
        Self {
            counter: AtomicU32::new(0),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Report one completion
    pub fn release(&self) {
        self.counter.fetch_add(1, Ordering::AcqRel);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_all();
    }

    /// Reset the counter to zero if it equals `count`, without blocking
    pub fn try_acquire(&self, count: u32) -> bool {
        self.counter
            .compare_exchange(count, 0, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Block until exactly `count` releases have happened, then reset to zero
    ///
    /// Waiting for more completions than will ever be released blocks forever;
    /// callers must pair every acquire with the matching number of releases.
    pub fn acquire(&self, count: u32) {
        for _ in 0..SPIN_LIMIT {
            if self.try_acquire(count) {
                return;
            }
            std::hint::spin_loop();
        }

        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.try_acquire(count) {
            guard = self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Current counter value
    pub fn value(&self) -> u32 {
        self.counter.load(Ordering::Acquire)
    }
}

impl Default for CountingSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "counting_semaphore_tests.rs"]
mod tests;
