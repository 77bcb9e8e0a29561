//! Linux futex-based parker
//!
//! Futex word semantics:
//! - 0 = released (not parked, or a waker has finished with us)
//! - 1 = armed (owner is, or is about to be, blocked)
//!
//! Parking:
//! 1. Owner stores 1 (`prepare`) before becoming visible to wakers
//! 2. FUTEX_WAIT while the word is still 1
//! 3. Return once the word reads 0, or when the deadline passes
//!
//! Waking:
//! 1. Store 0 (release); this is the waker's last write to the record
//! 2. FUTEX_WAKE one waiter
//!
//! A FUTEX_WAKE that lands after the owner has already re-armed for its
//! next park just makes FUTEX_WAIT return early; the loop re-checks the word.

use super::Parkable;
use nix::errno::Errno;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

const RELEASED: u32 = 0;
const ARMED: u32 = 1;

/// Linux futex-based parker
#[derive(Debug)]
pub struct FutexParker {
    futex: AtomicU32,
}

impl FutexParker {
    /// FUTEX_WAIT while the word equals `ARMED`.
    ///
    /// Returns `false` only when the kernel reports the timeout expired.
    fn futex_wait(&self, timeout: Option<libc::timespec>) -> bool {
        let timespec_ptr = match &timeout {
            Some(ts) => ts as *const libc::timespec,
            None => std::ptr::null(),
        };

        // Safety: the futex word lives as long as `self`, and the kernel only
        // reads it. The timeout (relative, CLOCK_MONOTONIC) outlives the call.
        let result = unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAIT | libc::FUTEX_PRIVATE_FLAG,
                ARMED,
                timespec_ptr,
                std::ptr::null::<u32>(),
                0u32,
            )
        };

        // EAGAIN = word already changed, EINTR = signal: both just re-check.
        result == 0 || Errno::last() != Errno::ETIMEDOUT
    }

    fn futex_wake(&self) {
        // Safety: as above; FUTEX_WAKE does not touch the word's contents.
        unsafe {
            libc::syscall(
                libc::SYS_futex,
                self.futex.as_ptr(),
                libc::FUTEX_WAKE | libc::FUTEX_PRIVATE_FLAG,
                1i32,
                std::ptr::null::<libc::timespec>(),
                std::ptr::null::<u32>(),
                0u32,
            );
        }
    }
}

impl Default for FutexParker {
    fn default() -> Self {
        Self::new()
    }
}

impl Parkable for FutexParker {
    fn new() -> Self {
        Self {
            futex: AtomicU32::new(RELEASED),
        }
    }

    #[inline]
    fn prepare(&self) {
        self.futex.store(ARMED, Ordering::Relaxed);
    }

    fn block_until_changed(&self, deadline: Option<Instant>) -> bool {
        while self.futex.load(Ordering::Acquire) == ARMED {
            let timeout = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    let remaining = deadline - now;
                    Some(libc::timespec {
                        tv_sec: remaining.as_secs().min(libc::time_t::MAX as u64) as libc::time_t,
                        tv_nsec: remaining.subsec_nanos() as _,
                    })
                }
                None => None,
            };

            if !self.futex_wait(timeout) && self.futex.load(Ordering::Acquire) == ARMED {
                return false;
            }
        }
        true
    }

    #[inline]
    fn wake(&self) {
        self.futex.store(RELEASED, Ordering::Release);
        self.futex_wake();
    }

    #[inline]
    fn reset(&self) {
        self.futex.store(RELEASED, Ordering::Relaxed);
    }

    #[inline]
    fn is_prepared(&self) -> bool {
        self.futex.load(Ordering::Relaxed) == ARMED
    }
}
