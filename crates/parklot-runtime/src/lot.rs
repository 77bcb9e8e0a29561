//! Wait / wake facade
//!
//! Any thread can park on any [`WaitAddress`] and any other thread can wake
//! it by naming the same address. The two sides meet in the bucket the
//! address hashes to:
//!
//! ```text
//!   waiter                              waker
//!   ------                              -----
//!   lock bucket                         lock bucket
//!   can_wait()?  -- no --> return       dequeue matching record(s)
//!   enqueue record, arm parker          on_wake_state(..) -> token
//!   unlock bucket                       unlock bucket
//!   before_wait()                       store token, clear address,
//!   block on parker  <----------------  release parker
//! ```
//!
//! Because `can_wait` and `on_wake_state` run under the same bucket lock,
//! a caller can test-and-enqueue atomically with respect to a concurrent
//! state change plus wake. No wakeup delivered after the record is
//! enqueued can be lost.

use crate::table;
use crate::tls;
use parklot_core::{WaitAddress, WaitState, WakeState, WakeToken};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Park the calling thread on `address`.
///
/// `can_wait` runs with the bucket locked; returning `false` aborts without
/// blocking. `before_wait` runs after the thread is enqueued and the bucket
/// is unlocked, only if it will actually block (typically: release an outer
/// lock). Neither may park or wake on any address.
pub fn wait<C, B>(address: WaitAddress, can_wait: C, before_wait: B) -> WaitState
where
    C: FnOnce() -> bool,
    B: FnOnce(),
{
    park(address, can_wait, before_wait, None)
}

/// [`wait`] with a relative timeout. A timeout too large to represent
/// waits forever.
pub fn wait_for<C, B>(
    address: WaitAddress,
    can_wait: C,
    before_wait: B,
    timeout: Duration,
) -> WaitState
where
    C: FnOnce() -> bool,
    B: FnOnce(),
{
    park(address, can_wait, before_wait, Instant::now().checked_add(timeout))
}

/// [`wait`] with an absolute deadline.
pub fn wait_until<C, B>(
    address: WaitAddress,
    can_wait: C,
    before_wait: B,
    deadline: Instant,
) -> WaitState
where
    C: FnOnce() -> bool,
    B: FnOnce(),
{
    park(address, can_wait, before_wait, Some(deadline))
}

fn park<C, B>(
    address: WaitAddress,
    can_wait: C,
    before_wait: B,
    deadline: Option<Instant>,
) -> WaitState
where
    C: FnOnce() -> bool,
    B: FnOnce(),
{
    debug_assert!(
        !tls::is_in_bucket_callback(),
        "cannot park from inside a can_wait / on_wake_state callback"
    );

    let record = tls::current_record();

    {
        let mut bucket = table::lock_bucket(address);
        if !tls::in_bucket_callback(can_wait) {
            return WaitState::NOT_WAITED;
        }
        record.prepare(address);
        bucket.push(address, Arc::clone(&record));
    }

    before_wait();

    if record.block(deadline) {
        return WaitState::woken(record.wake_token());
    }

    // Deadline passed. If we can still find ourselves in the queue, nobody
    // has claimed us and this is a plain timeout.
    if let Some(mut bucket) = table::lock_existing_bucket(address) {
        if bucket.remove_record(&record) {
            drop(bucket);
            record.cancel();
            return WaitState::TIMED_OUT;
        }
    }

    // A waker dequeued us first and is mid-handshake. Wait for it to finish
    // so it never writes into a record we have already moved on from.
    record.block(None);
    WaitState::woken(record.wake_token())
}

/// Wake the oldest thread parked on `address`, if any.
pub fn wake_one(address: WaitAddress) -> WakeState {
    wake_one_with(address, |_| 0)
}

/// Wake the oldest thread parked on `address`, if any, deciding the token
/// it receives with the bucket still locked.
///
/// `on_wake_state` always runs (even if nobody was woken) and sees whether
/// a thread was dequeued and whether others remain on `address`. Its return
/// value becomes the woken thread's [`WaitState::wake_token`]. Like
/// `can_wait`, it may not park or wake.
pub fn wake_one_with<F>(address: WaitAddress, on_wake_state: F) -> WakeState
where
    F: FnOnce(WakeState) -> WakeToken,
{
    debug_assert!(
        !tls::is_in_bucket_callback(),
        "cannot wake from inside a can_wait / on_wake_state callback"
    );

    let (woken, state, token) = {
        let mut bucket = table::lock_bucket(address);
        let woken = bucket.take_first(address);
        let state = WakeState {
            did_wake: woken.is_some(),
            has_waiting_threads: bucket.contains(address),
        };
        let token = tls::in_bucket_callback(|| on_wake_state(state));
        (woken, state, token)
    };

    if let Some(record) = woken {
        record.wake(token);
    }
    state
}

/// Wake up to `count` threads parked on `address`, oldest first. Returns
/// how many were woken.
pub fn wake_multiple(address: WaitAddress, count: usize) -> usize {
    debug_assert!(
        !tls::is_in_bucket_callback(),
        "cannot wake from inside a can_wait / on_wake_state callback"
    );

    if count == 0 {
        return 0;
    }

    let mut woken = Vec::new();
    if let Some(mut bucket) = table::lock_existing_bucket(address) {
        bucket.take_up_to(address, count, &mut woken);
    }

    for record in &woken {
        record.wake(0);
    }
    woken.len()
}

/// Wake every thread parked on `address`. Returns how many were woken.
pub fn wake_all(address: WaitAddress) -> usize {
    wake_multiple(address, usize::MAX)
}

/// Number of threads currently parked on `address` (stale as soon as it
/// returns).
pub fn waiter_count(address: WaitAddress) -> usize {
    table::lock_existing_bucket(address).map_or(0, |bucket| bucket.count(address))
}
