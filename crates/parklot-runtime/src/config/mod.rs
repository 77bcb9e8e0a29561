//! Parking lot configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Environment variables (read once, on first use of the lot)
//! 2. Library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use parklot_runtime::config::{self, LotConfig};
//!
//! // What the lot is actually running with
//! let spins = config::global().spin_limit;
//!
//! // Or build one explicitly
//! let config = LotConfig::new().spin_limit(100).initial_buckets(64);
//! assert!(config.validate().is_ok());
//! ```

pub mod defaults;

use parklot_core::env::{env_get, env_get_bool};
use std::sync::OnceLock;
use thiserror::Error;

/// Runtime configuration with builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotConfig {
    /// Mutex spin budget before parking
    pub spin_limit: u32,
    /// Yield the OS thread on each spin (else a CPU spin hint)
    pub spin_yield: bool,
    /// Bucket count of the first table (rounded up to a power of two)
    pub initial_buckets: usize,
}

impl Default for LotConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl LotConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `PARKLOT_SPIN_LIMIT` - Mutex spin iterations before parking
    /// - `PARKLOT_SPIN_YIELD` - Yield on each spin (`1`/`true`/`yes`/`on`)
    /// - `PARKLOT_INITIAL_BUCKETS` - Size of the first bucket table
    pub fn from_env() -> Self {
        Self {
            spin_limit: env_get("PARKLOT_SPIN_LIMIT", defaults::SPIN_LIMIT),
            spin_yield: env_get_bool("PARKLOT_SPIN_YIELD", defaults::SPIN_YIELD),
            initial_buckets: env_get("PARKLOT_INITIAL_BUCKETS", defaults::INITIAL_BUCKETS),
        }
    }

    /// Create config with explicit defaults (no env override).
    pub fn new() -> Self {
        Self {
            spin_limit: defaults::SPIN_LIMIT,
            spin_yield: defaults::SPIN_YIELD,
            initial_buckets: defaults::INITIAL_BUCKETS,
        }
    }

    // Builder methods

    pub fn spin_limit(mut self, spins: u32) -> Self {
        self.spin_limit = spins;
        self
    }

    pub fn spin_yield(mut self, yield_now: bool) -> Self {
        self.spin_yield = yield_now;
        self
    }

    pub fn initial_buckets(mut self, buckets: usize) -> Self {
        self.initial_buckets = buckets;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spin_limit > defaults::MAX_SPIN_LIMIT {
            return Err(ConfigError::SpinLimitTooLarge {
                value: self.spin_limit,
                max: defaults::MAX_SPIN_LIMIT,
            });
        }
        if self.initial_buckets == 0 || self.initial_buckets > defaults::MAX_INITIAL_BUCKETS {
            return Err(ConfigError::InitialBucketsOutOfRange {
                value: self.initial_buckets,
                max: defaults::MAX_INITIAL_BUCKETS,
            });
        }
        Ok(())
    }

    /// Bucket count of the first table, as actually allocated.
    pub fn initial_table_size(&self) -> usize {
        self.initial_buckets.max(1).next_power_of_two()
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid config: spin_limit {value} exceeds {max}")]
    SpinLimitTooLarge { value: u32, max: u32 },

    #[error("invalid config: initial_buckets {value} must be in 1..={max}")]
    InitialBucketsOutOfRange { value: usize, max: usize },
}

static GLOBAL: OnceLock<LotConfig> = OnceLock::new();

/// The configuration the process-wide lot runs with.
///
/// Loaded from the environment on first call. An invalid environment is
/// logged and replaced by the library defaults.
pub fn global() -> &'static LotConfig {
    GLOBAL.get_or_init(|| {
        let config = LotConfig::from_env();
        match config.validate() {
            Ok(()) => {
                tracing::debug!(
                    spin_limit = config.spin_limit,
                    spin_yield = config.spin_yield,
                    initial_buckets = config.initial_buckets,
                    parker = crate::parking::platform_parker_name(),
                    "parking lot configured"
                );
                config
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring PARKLOT_* overrides, using defaults");
                LotConfig::new()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_valid() {
        let config = LotConfig::new();
        assert_eq!(config.spin_limit, defaults::SPIN_LIMIT);
        assert_eq!(config.initial_buckets, defaults::INITIAL_BUCKETS);
        assert_eq!(config.spin_yield, defaults::SPIN_YIELD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = LotConfig::new().spin_limit(7).initial_buckets(100);
        assert_eq!(config.spin_limit, 7);
        assert_eq!(config.initial_table_size(), 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_spin_yield_from_env() {
        std::env::set_var("PARKLOT_SPIN_YIELD", "off");
        assert!(!LotConfig::from_env().spin_yield);
        std::env::set_var("PARKLOT_SPIN_YIELD", " Yes ");
        assert!(LotConfig::from_env().spin_yield);
        std::env::remove_var("PARKLOT_SPIN_YIELD");
        assert_eq!(LotConfig::from_env().spin_yield, defaults::SPIN_YIELD);

        assert!(!LotConfig::new().spin_yield(false).spin_yield);
    }

    #[test]
    fn test_validation() {
        let err = LotConfig::new().initial_buckets(0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InitialBucketsOutOfRange { value: 0, .. }));

        let err = LotConfig::new().spin_limit(u32::MAX).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("invalid config: spin_limit {} exceeds {}", u32::MAX, defaults::MAX_SPIN_LIMIT)
        );
    }

    #[test]
    fn test_global_is_valid() {
        assert!(global().validate().is_ok());
        assert!(std::ptr::eq(global(), global()));
    }
}
