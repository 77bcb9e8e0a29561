//! Thread-local parking state
//!
//! Provides the calling thread's `ThreadRecord` and tracks whether the
//! thread is currently running a callback under a bucket lock.

use crate::record::ThreadRecord;
use std::cell::Cell;
use std::sync::Arc;

thread_local! {
    /// This thread's record, created on first wait.
    static CURRENT_RECORD: Arc<ThreadRecord> = ThreadRecord::register();

    /// Set while a `can_wait` / `on_wake_state` callback runs with a bucket
    /// locked. Parking or waking from there would self-deadlock.
    static IN_BUCKET_CALLBACK: Cell<bool> = const { Cell::new(false) };
}

/// The calling thread's record.
///
/// During thread teardown, after the thread-local slot is destroyed, a
/// fresh record is created for the one call instead.
#[inline]
pub fn current_record() -> Arc<ThreadRecord> {
    CURRENT_RECORD
        .try_with(Arc::clone)
        .unwrap_or_else(|_| ThreadRecord::register())
}

/// Run `f` flagged as a bucket-locked callback.
#[inline]
pub(crate) fn in_bucket_callback<R>(f: impl FnOnce() -> R) -> R {
    struct Reset(bool);

    impl Drop for Reset {
        fn drop(&mut self) {
            let _ = IN_BUCKET_CALLBACK.try_with(|cell| cell.set(self.0));
        }
    }

    let previous = IN_BUCKET_CALLBACK
        .try_with(|cell| cell.replace(true))
        .unwrap_or(false);
    let _reset = Reset(previous);
    f()
}

/// Whether the calling thread is inside a bucket-locked callback.
#[inline]
pub fn is_in_bucket_callback() -> bool {
    IN_BUCKET_CALLBACK.try_with(Cell::get).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_current_record_is_stable_per_thread() {
        let a = current_record();
        let b = current_record();
        assert!(Arc::ptr_eq(&a, &b));

        let other = thread::spawn(|| current_record().id()).join().unwrap();
        assert_ne!(other, a.id());
    }

    #[test]
    fn test_callback_flag_nests_and_resets() {
        assert!(!is_in_bucket_callback());
        in_bucket_callback(|| {
            assert!(is_in_bucket_callback());
            in_bucket_callback(|| assert!(is_in_bucket_callback()));
            assert!(is_in_bucket_callback());
        });
        assert!(!is_in_bucket_callback());
    }

    #[test]
    fn test_callback_flag_resets_on_panic() {
        let result = std::panic::catch_unwind(|| in_bucket_callback(|| panic!("boom")));
        assert!(result.is_err());
        assert!(!is_in_bucket_callback());
    }
}
