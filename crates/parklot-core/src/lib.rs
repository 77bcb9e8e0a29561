//! # parklot-core
//!
//! Core types and traits for the parklot thread-parking facility.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Parkers, the bucket table and the wait/wake facade live in
//! `parklot-runtime`.
//!
//! ## Modules
//!
//! - `address` - Wait address key type and its hash
//! - `state` - Results handed back by wait and wake operations
//! - `traits` - The `Parkable` blocking-primitive interface
//! - `spinlock` - Bucket lock primitive
//! - `env` - Environment variable utilities

pub mod address;
pub mod state;
pub mod traits;
pub mod spinlock;
pub mod env;

// Re-exports for convenience
pub use address::WaitAddress;
pub use state::{WaitState, WakeState, WakeToken};
pub use traits::Parkable;
pub use spinlock::{SpinLock, SpinLockGuard};
pub use env::{env_get, env_get_bool, env_get_opt};
