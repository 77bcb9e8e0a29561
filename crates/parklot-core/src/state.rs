//! Wait and wake results

/// Payload handed from a waker to the thread it wakes.
pub type WakeToken = u64;

/// Outcome of a wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaitState {
    /// `can_wait` returned true and the thread was enqueued.
    pub did_wait: bool,
    /// The thread was dequeued by a waker (as opposed to timing out).
    pub did_wake: bool,
    /// Token supplied by the waker; zero unless `did_wake`.
    pub wake_token: WakeToken,
}

impl WaitState {
    /// Result for a wait rejected by its `can_wait` check.
    pub const NOT_WAITED: WaitState = WaitState {
        did_wait: false,
        did_wake: false,
        wake_token: 0,
    };

    /// Result for a wait that hit its deadline before any waker reached it.
    pub const TIMED_OUT: WaitState = WaitState {
        did_wait: true,
        did_wake: false,
        wake_token: 0,
    };

    /// Result for a wait ended by a waker.
    #[inline]
    pub const fn woken(wake_token: WakeToken) -> Self {
        WaitState {
            did_wait: true,
            did_wake: true,
            wake_token,
        }
    }

    /// Waited, but no waker dequeued us.
    #[inline]
    pub const fn timed_out(&self) -> bool {
        self.did_wait && !self.did_wake
    }
}

/// What a waker observed while holding the bucket lock.
///
/// Passed to the `on_wake_state` callback of `wake_one_with` and returned
/// from `wake_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WakeState {
    /// A waiter on the address was dequeued.
    pub did_wake: bool,
    /// Other waiters on the same address are still queued.
    pub has_waiting_threads: bool,
}
