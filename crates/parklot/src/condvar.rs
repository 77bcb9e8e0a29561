//! One-byte condition variable
//!
//! Works with any `lock_api::RawMutex`. Waiters queue in the global parking
//! lot under the address of the `has_waiters` flag; the flag lets notifiers
//! skip the bucket lock entirely when nobody has ever waited.
//!
//! Spurious wakeups are possible (as with every condition variable); callers
//! re-check their predicate, or use [`WordCondvar::wait_while`].

use core::sync::atomic::{AtomicBool, Ordering};
use lock_api::{MutexGuard, RawMutex};
use parklot_core::WaitAddress;
use parklot_runtime::lot;
use std::time::{Duration, Instant};

/// Whether a timed condition-variable wait returned because its time ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult(bool);

impl WaitTimeoutResult {
    #[inline]
    pub fn timed_out(self) -> bool {
        self.0
    }
}

/// A condition variable occupying one byte.
#[derive(Debug, Default)]
pub struct WordCondvar {
    has_waiters: AtomicBool,
}

impl WordCondvar {
    pub const fn new() -> Self {
        Self {
            has_waiters: AtomicBool::new(false),
        }
    }

    #[inline]
    fn address(&self) -> WaitAddress {
        WaitAddress::of(&self.has_waiters)
    }

    /// Wake one waiting thread. Returns whether a thread was woken.
    #[inline]
    pub fn notify_one(&self) -> bool {
        if !self.has_waiters.load(Ordering::Acquire) {
            return false;
        }
        self.notify_one_slow()
    }

    #[cold]
    fn notify_one_slow(&self) -> bool {
        lot::wake_one_with(self.address(), |result| {
            if !result.has_waiting_threads {
                self.has_waiters.store(false, Ordering::Relaxed);
            }
            0
        })
        .did_wake
    }

    /// Wake every waiting thread. Returns how many were woken.
    #[inline]
    pub fn notify_all(&self) -> usize {
        if !self.has_waiters.load(Ordering::Acquire) {
            return 0;
        }
        self.has_waiters.store(false, Ordering::Relaxed);
        lot::wake_all(self.address())
    }

    /// Unlock the guard's mutex, block until notified, and re-lock.
    pub fn wait<R: RawMutex, T: ?Sized>(&self, guard: &mut MutexGuard<'_, R, T>) {
        // SAFETY: the guard proves we hold the lock, and it is re-acquired
        // before the guard is handed back.
        unsafe {
            let raw = MutexGuard::mutex(guard).raw();
            self.wait_raw(raw);
        }
    }

    /// [`wait`](Self::wait) with a timeout. The mutex is re-locked either
    /// way.
    pub fn wait_for<R: RawMutex, T: ?Sized>(
        &self,
        guard: &mut MutexGuard<'_, R, T>,
        timeout: Duration,
    ) -> WaitTimeoutResult {
        let deadline = Instant::now().checked_add(timeout);
        // SAFETY: as in `wait`.
        unsafe {
            let raw = MutexGuard::mutex(guard).raw();
            self.park(raw, deadline)
        }
    }

    /// Block while `condition` holds for the protected value.
    pub fn wait_while<R, T, F>(&self, guard: &mut MutexGuard<'_, R, T>, mut condition: F)
    where
        R: RawMutex,
        T: ?Sized,
        F: FnMut(&mut T) -> bool,
    {
        while condition(&mut **guard) {
            self.wait(guard);
        }
    }

    /// Wait using a bare lock.
    ///
    /// # Safety
    ///
    /// The calling thread must hold `raw`. It holds it again on return.
    pub unsafe fn wait_raw<R: RawMutex>(&self, raw: &R) {
        self.park(raw, None);
    }

    unsafe fn park<R: RawMutex>(&self, raw: &R, deadline: Option<Instant>) -> WaitTimeoutResult {
        let can_wait = || {
            self.has_waiters.store(true, Ordering::Relaxed);
            true
        };
        let before_wait = || raw.unlock();

        let result = match deadline {
            Some(deadline) => lot::wait_until(self.address(), can_wait, before_wait, deadline),
            None => lot::wait(self.address(), can_wait, before_wait),
        };

        if result.did_wait {
            raw.lock();
        }
        WaitTimeoutResult(result.timed_out())
    }
}
