//! Thread parkers
//!
//! The OS-level block/wake mechanism behind every thread record.
//! Platform-specific implementations use the most efficient primitive
//! available; the choice is made at build time.

pub use parklot_core::Parkable;

// The fallback is portable, so it is always built (and tested).
pub mod fallback;
pub use fallback::FallbackParker;

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        pub mod futex_linux;
        pub use futex_linux::FutexParker;
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "linux", not(feature = "fallback-parker")))] {
        pub use futex_linux::FutexParker as PlatformParker;
    } else {
        pub use fallback::FallbackParker as PlatformParker;
    }
}

/// Name of the parker selected for this build (for logs and diagnostics).
pub fn platform_parker_name() -> &'static str {
    cfg_if::cfg_if! {
        if #[cfg(all(target_os = "linux", not(feature = "fallback-parker")))] {
            "futex"
        } else {
            "condvar"
        }
    }
}
