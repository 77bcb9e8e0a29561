//! Compile-time configuration defaults

/// Mutex spin iterations before parking.
pub const SPIN_LIMIT: u32 = 40;

/// Whether each mutex spin iteration yields the OS thread (otherwise it
/// only issues a CPU spin hint).
pub const SPIN_YIELD: bool = true;

/// Bucket count of the first table. Rounded up to a power of two.
pub const INITIAL_BUCKETS: usize = 16;

/// Upper bound accepted for `INITIAL_BUCKETS` overrides.
pub const MAX_INITIAL_BUCKETS: usize = 1 << 20;

/// Upper bound accepted for `SPIN_LIMIT` overrides.
pub const MAX_SPIN_LIMIT: u32 = 100_000;
