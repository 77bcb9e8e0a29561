//! Bucket table
//!
//! Maps a `WaitAddress` to the queue of threads parked on it. There is one
//! table per process, reached through the `TABLE` pointer:
//!
//! - The table is an array of lazily created buckets whose length is a
//!   power of two. It only ever grows, one step per power of two of live
//!   thread records.
//! - Readers never lock the pointer. They index the table they loaded, lock
//!   the bucket, then check the pointer still names that table; if it
//!   moved, they unlock and start over.
//! - Growth locks every bucket of the current table (in bucket-address
//!   order), moves every waiter into a new, larger table and publishes it.
//!
//! Superseded tables are never freed, and their bucket objects are reused
//! by the next generation or simply leaked. The waste is bounded by the
//! number of growth steps (logarithmic in peak thread count), not by wait
//! traffic, and it is what allows the lock-free pointer read above: a
//! thread may hold a stale `&'static Table` for as long as it likes.

use crate::config;
use crate::record::ThreadRecord;
use parklot_core::{SpinLock, SpinLockGuard, WaitAddress};
use std::collections::VecDeque;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Arc;

/// A parked thread and the address it waits on.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub(crate) address: WaitAddress,
    pub(crate) record: Arc<ThreadRecord>,
}

/// FIFO of waiters sharing a bucket (possibly for different addresses).
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    entries: VecDeque<Waiter>,
}

impl WaitQueue {
    const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    #[inline]
    pub(crate) fn push(&mut self, address: WaitAddress, record: Arc<ThreadRecord>) {
        self.entries.push_back(Waiter { address, record });
    }

    /// Remove the oldest waiter on `address`.
    pub(crate) fn take_first(&mut self, address: WaitAddress) -> Option<Arc<ThreadRecord>> {
        let pos = self.entries.iter().position(|w| w.address == address)?;
        self.entries.remove(pos).map(|w| w.record)
    }

    /// Remove up to `max` waiters on `address`, oldest first.
    pub(crate) fn take_up_to(
        &mut self,
        address: WaitAddress,
        max: usize,
        out: &mut Vec<Arc<ThreadRecord>>,
    ) {
        let mut taken = 0;
        self.entries.retain(|w| {
            if taken < max && w.address == address {
                out.push(Arc::clone(&w.record));
                taken += 1;
                false
            } else {
                true
            }
        });
    }

    /// Remove this exact record, wherever it is queued.
    pub(crate) fn remove_record(&mut self, record: &Arc<ThreadRecord>) -> bool {
        match self.entries.iter().position(|w| Arc::ptr_eq(&w.record, record)) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub(crate) fn contains(&self, address: WaitAddress) -> bool {
        self.entries.iter().any(|w| w.address == address)
    }

    #[inline]
    pub(crate) fn count(&self, address: WaitAddress) -> usize {
        self.entries.iter().filter(|w| w.address == address).count()
    }

    fn iter(&self) -> impl Iterator<Item = &Waiter> {
        self.entries.iter()
    }

    fn drain_into(&mut self, out: &mut Vec<Waiter>) {
        out.extend(self.entries.drain(..));
    }
}

/// One table slot: a queue behind its own lock.
pub(crate) struct Bucket {
    queue: SpinLock<WaitQueue>,
}

impl Bucket {
    const fn new() -> Self {
        Self {
            queue: SpinLock::new(WaitQueue::new()),
        }
    }

    #[inline]
    fn lock(&'static self) -> LockedBucket {
        self.queue.lock()
    }
}

/// A bucket's queue with the bucket lock held.
pub(crate) type LockedBucket = SpinLockGuard<'static, WaitQueue>;

struct Table {
    /// Null until a waiter (or growth) needs the bucket.
    slots: Box<[AtomicPtr<Bucket>]>,
}

impl Table {
    fn with_size(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            slots: (0..size).map(|_| AtomicPtr::new(ptr::null_mut())).collect(),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn bucket(&self, index: usize) -> Option<&'static Bucket> {
        let bucket = self.slots[index].load(Ordering::Acquire);
        // Safety: published buckets are never freed.
        unsafe { bucket.as_ref() }
    }

    fn bucket_or_install(&self, index: usize) -> &'static Bucket {
        if let Some(bucket) = self.bucket(index) {
            return bucket;
        }

        let fresh = Box::into_raw(Box::new(Bucket::new()));
        match self.slots[index].compare_exchange(
            ptr::null_mut(),
            fresh,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // Safety: just published; never freed from here on.
            Ok(_) => unsafe { &*fresh },
            Err(existing) => {
                // Safety: `fresh` lost the race and was never shared.
                drop(unsafe { Box::from_raw(fresh) });
                // Safety: published buckets are never freed.
                unsafe { &*existing }
            }
        }
    }
}

/// The current table. Null until first use; afterwards every value it has
/// held stays allocated for the life of the process.
static TABLE: AtomicPtr<Table> = AtomicPtr::new(ptr::null_mut());

#[inline]
fn current_table() -> &'static Table {
    let table = TABLE.load(Ordering::Acquire);
    if table.is_null() {
        create_table()
    } else {
        // Safety: non-null values of TABLE are never freed.
        unsafe { &*table }
    }
}

#[cold]
fn create_table() -> &'static Table {
    let size = config::global().initial_table_size();
    let fresh = Box::into_raw(Box::new(Table::with_size(size)));

    match TABLE.compare_exchange(ptr::null_mut(), fresh, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            tracing::debug!(buckets = size, "parking table created");
            // Safety: just published; never freed.
            unsafe { &*fresh }
        }
        Err(existing) => {
            // Safety: `fresh` lost the race and was never shared.
            drop(unsafe { Box::from_raw(fresh) });
            // Safety: non-null values of TABLE are never freed.
            unsafe { &*existing }
        }
    }
}

#[inline]
fn is_current(table: &'static Table) -> bool {
    ptr::eq(TABLE.load(Ordering::Acquire), table)
}

/// Lock the bucket for `address`, creating it if the slot is empty.
pub(crate) fn lock_bucket(address: WaitAddress) -> LockedBucket {
    loop {
        let table = current_table();
        let bucket = table.bucket_or_install(address.index(table.len()));
        let guard = bucket.lock();
        if is_current(table) {
            return guard;
        }
    }
}

/// Lock the bucket for `address` if it exists. A missing bucket has no
/// waiters.
pub(crate) fn lock_existing_bucket(address: WaitAddress) -> Option<LockedBucket> {
    loop {
        let table = current_table();
        let bucket = table.bucket(address.index(table.len()))?;
        let guard = bucket.lock();
        if is_current(table) {
            return Some(guard);
        }
    }
}

/// Lock every bucket of `table`, filling empty slots first so no waiter can
/// slip into an unlocked bucket. Guards are returned in slot order.
///
/// Returns `None` (with everything unlocked again) if `table` was replaced
/// while we were acquiring.
fn lock_all(table: &'static Table) -> Option<Vec<LockedBucket>> {
    let mut order: Vec<(usize, &'static Bucket)> = (0..table.len())
        .map(|index| (index, table.bucket_or_install(index)))
        .collect();

    // Global lock order, shared by every concurrent grower.
    order.sort_unstable_by_key(|&(_, bucket)| bucket as *const Bucket as usize);

    let mut guards: Vec<Option<LockedBucket>> = (0..table.len()).map(|_| None).collect();
    for (index, bucket) in order {
        guards[index] = Some(bucket.lock());
    }

    if !is_current(table) {
        return None;
    }
    Some(guards.into_iter().flatten().collect())
}

/// Make sure the table has at least `thread_count` buckets (rounded up to
/// a power of two). Called once per thread record registration.
pub fn reserve(thread_count: usize) {
    let target = thread_count.max(1).next_power_of_two();
    loop {
        let table = current_table();
        if table.len() >= target {
            return;
        }
        if let Some(guards) = lock_all(table) {
            grow(table, guards, target);
            return;
        }
    }
}

#[cold]
fn grow(old: &'static Table, mut guards: Vec<LockedBucket>, target: usize) {
    let mut waiters = Vec::new();
    for guard in guards.iter_mut() {
        guard.drain_into(&mut waiters);
    }

    let new = Table::with_size(target);

    // Old bucket objects move to the same index in the new table. We still
    // hold their locks, so waiters landing there go through `guards`.
    for (old_slot, new_slot) in old.slots.iter().zip(new.slots.iter()) {
        new_slot.store(old_slot.load(Ordering::Relaxed), Ordering::Relaxed);
    }

    let rehashed = waiters.len();
    for Waiter { address, record } in waiters {
        let index = address.index(target);
        match guards.get_mut(index) {
            Some(guard) => guard.push(address, record),
            // Unpublished bucket: the lock is uncontended.
            None => new.bucket_or_install(index).lock().push(address, record),
        }
    }

    TABLE.store(Box::into_raw(Box::new(new)), Ordering::Release);
    drop(guards);

    tracing::debug!(
        from = old.len(),
        to = target,
        rehashed,
        "parking table grew"
    );
}

/// Current number of buckets.
pub fn bucket_count() -> usize {
    current_table().len()
}

/// Every queued `(address, record id)` pair, bucket by bucket in queue
/// order. Locks the whole table while collecting.
pub fn queued_snapshot() -> Vec<(WaitAddress, u64)> {
    loop {
        let table = current_table();
        if let Some(guards) = lock_all(table) {
            return guards
                .iter()
                .flat_map(|queue| queue.iter().map(|w| (w.address, w.record.id())))
                .collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: usize) -> WaitAddress {
        WaitAddress::from_raw(raw).unwrap()
    }

    #[test]
    fn test_queue_order_and_matching() {
        let a = ThreadRecord::register();
        let b = ThreadRecord::register();
        let c = ThreadRecord::register();

        let mut queue = WaitQueue::new();
        queue.push(addr(8), Arc::clone(&a));
        queue.push(addr(16), Arc::clone(&b));
        queue.push(addr(8), Arc::clone(&c));

        assert_eq!(queue.count(addr(8)), 2);
        assert!(queue.contains(addr(16)));
        assert!(!queue.contains(addr(24)));

        // Oldest waiter on the address first, other addresses untouched.
        let first = queue.take_first(addr(8)).unwrap();
        assert!(Arc::ptr_eq(&first, &a));
        assert_eq!(queue.count(addr(8)), 1);
        assert!(queue.take_first(addr(24)).is_none());

        assert!(queue.remove_record(&b));
        assert!(!queue.remove_record(&b));

        let mut out = Vec::new();
        queue.take_up_to(addr(8), usize::MAX, &mut out);
        assert_eq!(out.len(), 1);
        assert!(Arc::ptr_eq(&out[0], &c));
        assert_eq!(queue.iter().count(), 0);
    }

    #[test]
    fn test_take_up_to_respects_limit() {
        let records: Vec<_> = (0..5).map(|_| ThreadRecord::register()).collect();
        let mut queue = WaitQueue::new();
        for r in &records {
            queue.push(addr(64), Arc::clone(r));
        }

        let mut out = Vec::new();
        queue.take_up_to(addr(64), 3, &mut out);
        assert_eq!(out.len(), 3);
        assert!(out.iter().zip(&records).all(|(a, b)| Arc::ptr_eq(a, b)));
        assert_eq!(queue.count(addr(64)), 2);
    }

    #[test]
    fn test_lock_bucket_same_address_same_bucket() {
        let address = addr(0x5555_0000);
        {
            let _guard = lock_bucket(address);
            // Growth is blocked on our bucket, so the table cannot move here.
            let table = current_table();
            let bucket = table.bucket(address.index(table.len())).unwrap();
            assert!(bucket.queue.is_locked());
        }
        assert!(lock_existing_bucket(address).is_some());
    }

    #[test]
    fn test_reserve_is_monotonic_power_of_two() {
        let before = bucket_count();
        reserve(before + 1);
        let after = bucket_count();
        assert!(after.is_power_of_two());
        assert!(after > before);

        // Never shrinks.
        reserve(1);
        assert!(bucket_count() >= after);
    }

    #[test]
    fn test_growth_keeps_queued_waiters_in_order() {
        // Queue records by hand (no threads): the table must carry them over.
        let address = addr(0x7777_0008);
        let records: Vec<_> = (0..3).map(|_| ThreadRecord::register()).collect();
        {
            let mut bucket = lock_bucket(address);
            for r in &records {
                bucket.push(address, Arc::clone(r));
            }
        }

        let ids = |snapshot: Vec<(WaitAddress, u64)>| -> Vec<u64> {
            snapshot
                .into_iter()
                .filter(|&(a, _)| a == address)
                .map(|(_, id)| id)
                .collect()
        };
        let expected: Vec<u64> = records.iter().map(|r| r.id()).collect();
        assert_eq!(ids(queued_snapshot()), expected);

        reserve(bucket_count() * 4);
        assert_eq!(ids(queued_snapshot()), expected);

        let mut bucket = lock_bucket(address);
        for r in &records {
            assert!(Arc::ptr_eq(&bucket.take_first(address).unwrap(), r));
        }
    }
}
