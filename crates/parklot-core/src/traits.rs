//! Platform blocking primitive
//!
//! The interface between the platform-agnostic parking logic and the
//! OS facility that actually puts a thread to sleep.

use std::time::Instant;

/// Per-thread block/wake mechanism.
///
/// A parker is a one-shot latch owned by a single thread:
///
/// 1. the owner calls [`prepare`](Parkable::prepare) before making itself
///    reachable by wakers,
/// 2. the owner calls [`block_until_changed`](Parkable::block_until_changed),
/// 3. some other thread calls [`wake`](Parkable::wake) exactly once, or the
///    owner takes itself out of reach again and calls
///    [`reset`](Parkable::reset).
///
/// `wake` must be the last write a waker performs on the owning record: once
/// the owner observes the release it may re-`prepare` immediately. A late OS
/// notification after that point must only ever look like a spurious wakeup.
pub trait Parkable: Send + Sync {
    /// Create an unarmed parker.
    fn new() -> Self
    where
        Self: Sized;

    /// Arm the parker. Only the owning thread calls this, while no waker
    /// can reach it.
    fn prepare(&self);

    /// Block while the parker is armed.
    ///
    /// Returns `true` once a [`wake`](Parkable::wake) has been observed, or
    /// `false` if `deadline` passed while still armed. Spurious OS wakeups
    /// are absorbed internally.
    fn block_until_changed(&self, deadline: Option<Instant>) -> bool;

    /// Release the owning thread (disarm + notify).
    fn wake(&self);

    /// Disarm without notifying. Only the owning thread calls this, after
    /// taking itself out of every wait queue.
    fn reset(&self);

    /// Whether the parker is currently armed (hint, may be stale).
    fn is_prepared(&self) -> bool;
}
