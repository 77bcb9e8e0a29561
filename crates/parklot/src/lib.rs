//! # parklot - word-sized locks on a global parking lot
//!
//! A process-wide thread-parking facility and the two primitives built on
//! it: a one-byte mutex and a one-byte condition variable.
//!
//! ## Features
//!
//! - **Compact**: `WordMutex` and `WordCondvar` are one byte each; wait
//!   queues live in a shared hash table keyed by address
//! - **Fast paths**: uncontended lock/unlock is a single CAS, notify with no
//!   waiters is a single load
//! - **Barging mutex**: bounded spin, then park
//! - **General parking**: `wait` / `wake_one` on any address, with callbacks
//!   run under the queue lock for race-free test-and-park
//! - **lock_api integration**: `Mutex<T>` / `MutexGuard` RAII wrappers
//!
//! ## Quick Start
//!
//! ```ignore
//! use parklot::{Mutex, WordCondvar};
//! use std::sync::Arc;
//!
//! let pair = Arc::new((Mutex::new(false), WordCondvar::new()));
//! let pair2 = Arc::clone(&pair);
//!
//! std::thread::spawn(move || {
//!     let (lock, cvar) = &*pair2;
//!     *lock.lock() = true;
//!     cvar.notify_one();
//! });
//!
//! let (lock, cvar) = &*pair;
//! let mut ready = lock.lock();
//! cvar.wait_while(&mut ready, |ready| !*ready);
//! ```
//!
//! ## Configuration
//!
//! - `PARKLOT_SPIN_LIMIT` - mutex spins before parking (default 40)
//! - `PARKLOT_SPIN_YIELD` - yield the OS thread on each spin (default on)
//! - `PARKLOT_INITIAL_BUCKETS` - size of the first bucket table (default 16)

pub mod condvar;
pub mod mutex;

pub use condvar::{WaitTimeoutResult, WordCondvar};
pub use mutex::{Mutex, MutexGuard, WordMutex};

// Re-export the parking facade
pub use parklot_runtime::{
    wait, wait_for, wait_until, wake_all, wake_multiple, wake_one, wake_one_with, waiter_count,
};
pub use parklot_runtime::table::{bucket_count, queued_snapshot};
pub use parklot_runtime::{config, platform_parker_name, ConfigError, LotConfig};

// Re-export core types
pub use parklot_core::{WaitAddress, WaitState, WakeState, WakeToken};
