//! # parklot-runtime
//!
//! Platform-specific half of the parklot thread-parking facility.
//!
//! This crate provides:
//! - Parkers (Linux futex, Mutex+Condvar fallback)
//! - Per-thread records and thread-local access to them
//! - The global, growable bucket table of wait queues
//! - The wait / wake facade built on top of them
//! - Runtime configuration (env overrides, validation)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 wait / wake facade (lot)                    │
//! │     wait, wait_for, wait_until, wake_one, wake_all, ...     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Bucket table                           │
//! │   hash(address) → SpinLock<WaitQueue>, grows with threads   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Arc<ThreadRecord> (one per thread)             │
//! │         wait address, wake token, PlatformParker            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Race detection
//!
//! ThreadSanitizer does not model raw futex syscalls, so run it with the
//! condvar parker (nightly, x86_64 Linux):
//!
//! ```text
//! RUSTFLAGS="-Zsanitizer=thread" RUSTDOCFLAGS="-Zsanitizer=thread" \
//!     cargo +nightly test -Zbuild-std --target x86_64-unknown-linux-gnu \
//!     -p parklot-runtime --features fallback-parker -- lot::tests
//! ```
//!
//! Miri covers the same tests (slowly):
//!
//! ```text
//! cargo +nightly miri test -p parklot-runtime --features fallback-parker -- lot::tests
//! ```

pub mod config;
pub mod parking;
pub mod record;
pub mod table;
pub mod tls;
pub mod lot;

// Re-exports
pub use config::{ConfigError, LotConfig};
pub use parking::{platform_parker_name, PlatformParker};
pub use lot::{
    wait, wait_for, wait_until, wake_all, wake_multiple, wake_one, wake_one_with, waiter_count,
};
pub use parklot_core::{WaitAddress, WaitState, WakeState, WakeToken};
