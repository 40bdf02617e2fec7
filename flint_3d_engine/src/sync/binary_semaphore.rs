/// Binary semaphore - single-permit CPU signaling
///
/// Two states, signaled and unsignaled. `release()` signals and never blocks.
/// `acquire()` waits until signaled, then clears the signal, so exactly one
/// waiter proceeds per release. A second `release()` before any acquire does
/// not queue a second permit.
///
/// Waiters spin for a short while before parking on a condition variable,
/// which keeps hand-offs in the sub-millisecond range without burning a core
/// when the wait turns out to be long.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

/// Number of spin iterations before a waiter parks
pub(crate) const SPIN_LIMIT: u32 = 256;

pub struct BinarySemaphore {
    signaled: AtomicBool,
    lock: Mutex<()>,
    wake: Condvar,
}

impl BinarySemaphore {
    /// Create an unsignaled semaphore
    pub fn new() -> Self {
        Self {
            signaled: AtomicBool::new(false),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        }
    }

    /// Signal the semaphore (never blocks on waiters)
    pub fn release(&self) {
        self.signaled.store(true, Ordering::Release);

        // Taking the lock orders this notify after any waiter's check-then-wait
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.wake.notify_one();
    }

    /// Clear the signal if it is set, without blocking
    ///
    /// # Returns
    ///
    /// `true` if this call consumed the permit
    pub fn try_acquire(&self) -> bool {
        self.signaled
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Block until signaled, then clear the signal
    pub fn acquire(&self) {
        for _ in 0..SPIN_LIMIT {
            if self.try_acquire() {
                return;
            }
            std::hint::spin_loop();
        }

        let mut guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        while !self.try_acquire() {
            guard = self.wake.wait(guard).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether a permit is currently available
    pub fn is_signaled(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}

impl Default for BinarySemaphore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "binary_semaphore_tests.rs"]
mod tests;
