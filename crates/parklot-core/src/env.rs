//! Environment variable utilities
//!
//! Used by the runtime configuration to apply `PARKLOT_*` overrides.
//!
//! ```ignore
//! use parklot_core::env::{env_get, env_get_bool};
//!
//! let spins: u32 = env_get("PARKLOT_SPIN_LIMIT", 40);
//! let verbose = env_get_bool("PARKLOT_VERBOSE", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default.
///
/// Unset variables and values that fail to parse both yield `default`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean.
///
/// "1", "true", "yes", "on" (case-insensitive) are true; any other value is
/// false. Unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(
            val.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}

/// Get environment variable as optional value.
///
/// `Some(T)` only if the variable is set and parses (surrounding whitespace
/// is ignored).
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_returns_default() {
        let val: u32 = env_get("__PARKLOT_TEST_UNSET__", 40);
        assert_eq!(val, 40);
        assert!(env_get_bool("__PARKLOT_TEST_UNSET__", true));
        assert!(env_get_opt::<usize>("__PARKLOT_TEST_UNSET__").is_none());
    }

    #[test]
    fn test_parse_and_fallback() {
        std::env::set_var("__PARKLOT_TEST_NUM__", " 128 ");
        assert_eq!(env_get("__PARKLOT_TEST_NUM__", 0usize), 128);

        std::env::set_var("__PARKLOT_TEST_NUM__", "lots");
        assert_eq!(env_get("__PARKLOT_TEST_NUM__", 16usize), 16);
        std::env::remove_var("__PARKLOT_TEST_NUM__");
    }

    #[test]
    fn test_bool_variants() {
        for (raw, expected) in [("1", true), ("On", true), ("YES", true), ("0", false), ("nope", false)] {
            std::env::set_var("__PARKLOT_TEST_BOOL__", raw);
            assert_eq!(env_get_bool("__PARKLOT_TEST_BOOL__", !expected), expected, "{raw}");
        }
        std::env::remove_var("__PARKLOT_TEST_BOOL__");
    }
}
