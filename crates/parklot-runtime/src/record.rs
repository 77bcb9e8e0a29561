//! Per-thread parking record
//!
//! One `ThreadRecord` exists per OS thread that has ever waited. It is
//! shared through `Arc`: the thread-local slot holds one reference, a
//! bucket queue holds one while the thread is enqueued, and a waker holds
//! one from dequeue until its notify completes. That last reference is what
//! keeps the record valid when its thread exits in the middle of a wake.

use crate::parking::{Parkable, PlatformParker};
use crate::table;
use parklot_core::{WaitAddress, WakeToken};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Live records; drives table growth.
static LIVE_RECORDS: AtomicUsize = AtomicUsize::new(0);

static NEXT_RECORD_ID: AtomicU64 = AtomicU64::new(1);

/// A thread's membership card for the wait queues.
#[derive(Debug)]
pub struct ThreadRecord {
    /// Process-unique id, for diagnostics.
    id: u64,

    /// Raw `WaitAddress` while enqueued; 0 otherwise.
    wait_address: AtomicUsize,

    /// Token from the waker that dequeued us.
    wake_token: AtomicU64,

    parker: PlatformParker,
}

impl ThreadRecord {
    /// Create a record for the calling thread and make room for it in the
    /// table.
    pub(crate) fn register() -> Arc<Self> {
        let live = LIVE_RECORDS.fetch_add(1, Ordering::Relaxed) + 1;
        table::reserve(live);

        let record = Arc::new(Self {
            id: NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed),
            wait_address: AtomicUsize::new(0),
            wake_token: AtomicU64::new(0),
            parker: PlatformParker::new(),
        });
        tracing::trace!(record = record.id, live, "thread record registered");
        record
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address this record is queued on, if any.
    #[inline]
    pub fn wait_address(&self) -> Option<WaitAddress> {
        WaitAddress::from_raw(self.wait_address.load(Ordering::Acquire))
    }

    /// Mark the record as waiting on `address`. Called by the owner with the
    /// bucket locked, immediately before enqueueing.
    #[inline]
    pub(crate) fn prepare(&self, address: WaitAddress) {
        debug_assert!(
            self.wait_address().is_none(),
            "thread record {} is already parked",
            self.id
        );
        self.wake_token.store(0, Ordering::Relaxed);
        self.wait_address.store(address.as_usize(), Ordering::Relaxed);
        self.parker.prepare();
    }

    /// Block until a waker releases us or `deadline` passes.
    #[inline]
    pub(crate) fn block(&self, deadline: Option<Instant>) -> bool {
        self.parker.block_until_changed(deadline)
    }

    /// Undo `prepare` after the owner removed itself from its bucket.
    #[inline]
    pub(crate) fn cancel(&self) {
        self.wait_address.store(0, Ordering::Relaxed);
        self.parker.reset();
    }

    /// Token left by the waker. Only meaningful after `block` returned true.
    #[inline]
    pub(crate) fn wake_token(&self) -> WakeToken {
        self.wake_token.load(Ordering::Relaxed)
    }

    /// Second half of the wake handshake, run by the waker after it has
    /// dequeued the record and dropped the bucket lock.
    ///
    /// The parker release is the final write: the owner may re-park the
    /// moment it observes it.
    #[inline]
    pub(crate) fn wake(&self, token: WakeToken) {
        self.wake_token.store(token, Ordering::Relaxed);
        self.wait_address.store(0, Ordering::Release);
        self.parker.wake();
    }
}

impl Drop for ThreadRecord {
    fn drop(&mut self) {
        let live = LIVE_RECORDS.fetch_sub(1, Ordering::Relaxed) - 1;
        tracing::trace!(record = self.id, live, "thread record dropped");
    }
}

/// Number of live thread records (hint).
pub fn live_records() -> usize {
    LIVE_RECORDS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_register_counts_and_unique_ids() {
        let a = ThreadRecord::register();
        let b = ThreadRecord::register();
        assert_ne!(a.id(), b.id());
        assert!(live_records() >= 2);
        assert!(table::bucket_count() >= 2);
    }

    #[test]
    fn test_prepare_wake_handshake() {
        let record = ThreadRecord::register();
        let addr = WaitAddress::from_raw(0xdead_beef).unwrap();

        record.prepare(addr);
        assert_eq!(record.wait_address(), Some(addr));

        let waker = Arc::clone(&record);
        let handle = thread::spawn(move || waker.wake(42));

        assert!(record.block(None));
        handle.join().unwrap();
        assert_eq!(record.wait_address(), None);
        assert_eq!(record.wake_token(), 42);
    }

    #[test]
    fn test_cancel_clears_address() {
        let record = ThreadRecord::register();
        record.prepare(WaitAddress::from_raw(0x40).unwrap());
        record.cancel();
        assert_eq!(record.wait_address(), None);
        // Disarmed: returns without sleeping.
        assert!(record.block(None));
    }

    #[test]
    fn test_record_outlives_owner_thread() {
        // The waker's clone keeps the record usable after the owner exits.
        let record = thread::spawn(ThreadRecord::register).join().unwrap();
        record.prepare(WaitAddress::from_raw(0x80).unwrap());
        record.wake(1);
        assert_eq!(record.wake_token(), 1);
    }
}
