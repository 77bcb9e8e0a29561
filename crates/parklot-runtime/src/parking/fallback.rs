//! Fallback parker using std::sync::Condvar
//!
//! Used on platforms without futex support, or everywhere with the
//! `fallback-parker` feature. Less efficient but portable.

use super::Parkable;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Condvar-based parker (fallback)
#[derive(Debug)]
pub struct FallbackParker {
    /// `true` while armed. Only written under the mutex so a waker cannot
    /// slip between the owner's check and its condvar wait.
    armed: Mutex<bool>,

    /// Condition variable
    condvar: Condvar,
}

impl FallbackParker {
    // Nothing panics while holding the lock, so a poisoned guard still
    // protects a consistent bool.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.armed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for FallbackParker {
    fn default() -> Self {
        Self::new()
    }
}

impl Parkable for FallbackParker {
    fn new() -> Self {
        Self {
            armed: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn prepare(&self) {
        *self.lock() = true;
    }

    fn block_until_changed(&self, deadline: Option<Instant>) -> bool {
        let mut armed = self.lock();
        while *armed {
            match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    armed = self
                        .condvar
                        .wait_timeout(armed, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
                None => {
                    armed = self
                        .condvar
                        .wait(armed)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        true
    }

    fn wake(&self) {
        let mut armed = self.lock();
        *armed = false;
        // Notify while still holding the lock: once the owner can observe
        // `false` it may re-arm, and our notify must not outlive that.
        self.condvar.notify_one();
        drop(armed);
    }

    fn reset(&self) {
        *self.lock() = false;
    }

    fn is_prepared(&self) -> bool {
        *self.lock()
    }
}
