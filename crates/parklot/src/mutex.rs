//! One-byte mutex
//!
//! All of the lock's state lives in a single `AtomicU8`; the queue of
//! blocked threads lives in the global parking lot, keyed by the address of
//! that byte.
//!
//! ```text
//!   0                      unlocked
//!   LOCKED                 held, nobody parked
//!   LOCKED | HAS_WAITERS   held, threads may be parked
//!   HAS_WAITERS            briefly, between unlock and the next barger
//! ```
//!
//! The lock is barging: a thread that arrives while the lock is free takes
//! it even if others are parked, and a woken thread simply competes again.

use core::sync::atomic::{AtomicU8, Ordering};
use lock_api::GuardSend;
use parklot_core::WaitAddress;
use parklot_runtime::{config, lot};

const LOCKED: u8 = 0b01;
const HAS_WAITERS: u8 = 0b10;

/// A mutual-exclusion lock occupying one byte.
///
/// This is the raw lock; use [`Mutex`] to protect data with it.
#[derive(Debug)]
pub struct WordMutex {
    state: AtomicU8,
}

impl WordMutex {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(0),
        }
    }

    /// Acquire the lock, parking the thread if it stays contended.
    #[inline]
    pub fn lock(&self) {
        if self
            .state
            .compare_exchange_weak(0, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            self.lock_slow();
        }
    }

    /// Acquire the lock if it is free.
    #[inline]
    pub fn try_lock(&self) -> bool {
        let mut state = self.state.load(Ordering::Relaxed);
        loop {
            if state & LOCKED != 0 {
                return false;
            }
            match self.state.compare_exchange_weak(
                state,
                state | LOCKED,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(current) => state = current,
            }
        }
    }

    /// Release the lock. The caller must hold it.
    #[inline]
    pub fn unlock(&self) {
        debug_assert!(self.is_locked(), "unlock of an unlocked WordMutex");
        if self
            .state
            .compare_exchange(LOCKED, 0, Ordering::Release, Ordering::Relaxed)
            .is_err()
        {
            self.unlock_slow();
        }
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) & LOCKED != 0
    }

    #[inline]
    fn address(&self) -> WaitAddress {
        WaitAddress::of(&self.state)
    }

    #[cold]
    fn lock_slow(&self) {
        let config = config::global();
        let mut spins = 0;

        loop {
            let state = self.state.load(Ordering::Relaxed);

            if state & LOCKED == 0 {
                if self
                    .state
                    .compare_exchange_weak(
                        state,
                        state | LOCKED,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
                {
                    return;
                }
                continue;
            }

            // Nobody is parked yet: the holder may be about to release.
            if state & HAS_WAITERS == 0 && spins < config.spin_limit {
                spins += 1;
                if config.spin_yield {
                    std::thread::yield_now();
                } else {
                    core::hint::spin_loop();
                }
                continue;
            }

            if state & HAS_WAITERS == 0
                && self
                    .state
                    .compare_exchange_weak(
                        state,
                        state | HAS_WAITERS,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    )
                    .is_err()
            {
                continue;
            }

            // Any outcome means "try again": a wake, an early refusal because
            // the state moved, or a spurious return.
            lot::wait(
                self.address(),
                || self.state.load(Ordering::Relaxed) == LOCKED | HAS_WAITERS,
                || {},
            );
        }
    }

    #[cold]
    fn unlock_slow(&self) {
        // HAS_WAITERS is only cleared under the bucket lock, so a thread
        // deciding to park sees either the flag or the free lock.
        lot::wake_one_with(self.address(), |result| {
            let next = if result.has_waiting_threads { HAS_WAITERS } else { 0 };
            self.state.store(next, Ordering::Release);
            0
        });
    }
}

impl Default for WordMutex {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for WordMutex {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = WordMutex::new();

    type GuardMarker = GuardSend;

    #[inline]
    fn lock(&self) {
        WordMutex::lock(self);
    }

    #[inline]
    fn try_lock(&self) -> bool {
        WordMutex::try_lock(self)
    }

    #[inline]
    unsafe fn unlock(&self) {
        WordMutex::unlock(self);
    }

    #[inline]
    fn is_locked(&self) -> bool {
        WordMutex::is_locked(self)
    }
}

/// A data-carrying mutex backed by [`WordMutex`].
pub type Mutex<T> = lock_api::Mutex<WordMutex, T>;

/// RAII guard for [`Mutex`].
pub type MutexGuard<'a, T> = lock_api::MutexGuard<'a, WordMutex, T>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::{Duration, Instant};

    fn wait_for_waiters(mutex: &WordMutex, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while lot::waiter_count(mutex.address()) < n {
            assert!(Instant::now() < deadline, "no thread parked on the mutex");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_mutual_exclusion() {
        const THREADS: usize = 8;
        const ITERS: usize = 20_000;

        let counter = Arc::new(Mutex::new(0usize));
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || {
                    for _ in 0..ITERS {
                        *counter.lock() += 1;
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*counter.lock(), THREADS * ITERS);
        assert!(!counter.is_locked());
    }

    #[test]
    fn test_try_lock() {
        let mutex = WordMutex::new();
        assert!(mutex.try_lock());
        assert!(mutex.is_locked());
        assert!(!mutex.try_lock());
        mutex.unlock();
        assert!(!mutex.is_locked());
        assert!(mutex.try_lock());
        mutex.unlock();
    }

    #[test]
    fn test_guard_try_lock() {
        let mutex = Mutex::new(vec![1, 2]);
        let guard = mutex.lock();
        assert!(mutex.try_lock().is_none());
        drop(guard);
        mutex.try_lock().unwrap().push(3);
        assert_eq!(*mutex.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_contended_unlock_hands_off() {
        let mutex = Arc::new(WordMutex::new());
        mutex.lock();

        let contender = {
            let mutex = Arc::clone(&mutex);
            thread::spawn(move || {
                mutex.lock();
                mutex.unlock();
            })
        };

        wait_for_waiters(&mutex, 1);
        assert_eq!(mutex.state.load(Ordering::Relaxed), LOCKED | HAS_WAITERS);

        // Only waiter dequeued: the flag is dropped with the lock.
        mutex.unlock();
        contender.join().unwrap();
        assert_eq!(mutex.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_unlock_keeps_flag_while_waiters_remain() {
        let mutex = Arc::new(WordMutex::new());
        mutex.lock();

        let (tx, rx) = std::sync::mpsc::channel();
        let handles: Vec<_> = (0..2)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                let tx = tx.clone();
                thread::spawn(move || {
                    mutex.lock();
                    tx.send(()).unwrap();
                    // Hold until the test has looked at the state.
                    thread::sleep(Duration::from_millis(50));
                    mutex.unlock();
                })
            })
            .collect();

        wait_for_waiters(&mutex, 2);
        mutex.unlock();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        // One thread owns the lock, the other is still parked or about to
        // be, so the flag survives the hand-off.
        let state = mutex.state.load(Ordering::Relaxed);
        assert_eq!(state, LOCKED | HAS_WAITERS);

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(mutex.state.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_const_init() {
        static GLOBAL: Mutex<u32> = Mutex::const_new(<WordMutex as lock_api::RawMutex>::INIT, 5);
        *GLOBAL.lock() += 1;
        assert_eq!(*GLOBAL.lock(), 6);
    }
}
