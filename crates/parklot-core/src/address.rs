//! Wait address type
//!
//! A wait address is the "channel" a thread parks on. It is never
//! dereferenced; it only selects a bucket and identifies matching waiters.

use core::fmt;
use core::num::NonZeroUsize;

/// Fibonacci hashing multiplier (2^64 / golden ratio).
const HASH_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Opaque key a thread waits on and a waker targets.
///
/// Usually derived from the address of the state word of a primitive
/// (`WaitAddress::of(&self.state)`), so two distinct live primitives never
/// share a key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct WaitAddress(NonZeroUsize);

impl WaitAddress {
    /// Key derived from the address of `value`.
    #[inline]
    pub fn of<T: ?Sized>(value: &T) -> Self {
        let raw = value as *const T as *const () as usize;
        // References are never null.
        match NonZeroUsize::new(raw) {
            Some(addr) => WaitAddress(addr),
            None => unreachable!("reference with a null address"),
        }
    }

    /// Key from a raw value. Returns `None` for zero, which is reserved
    /// for "not waiting".
    #[inline]
    pub const fn from_raw(raw: usize) -> Option<Self> {
        match NonZeroUsize::new(raw) {
            Some(addr) => Some(WaitAddress(addr)),
            None => None,
        }
    }

    /// Raw value, never zero.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0.get()
    }

    /// 64 -> 32 bit multiplicative mix of the address.
    #[inline]
    pub const fn hash32(self) -> u32 {
        ((self.0.get() as u64).wrapping_mul(HASH_MULTIPLIER) >> 32) as u32
    }

    /// Index into a table of `len` slots.
    ///
    /// For power-of-two `len` this is the top `log2(len)` bits of
    /// [`hash32`](Self::hash32), which are the best mixed ones.
    #[inline]
    pub const fn index(self, len: usize) -> usize {
        ((self.hash32() as u64 * len as u64) >> 32) as usize
    }
}

impl fmt::Debug for WaitAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WaitAddress({:#x})", self.0.get())
    }
}

impl<T: ?Sized> From<&T> for WaitAddress {
    #[inline]
    fn from(value: &T) -> Self {
        WaitAddress::of(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_from_raw_rejects_zero() {
        assert!(WaitAddress::from_raw(0).is_none());
        assert_eq!(WaitAddress::from_raw(0x1000).unwrap().as_usize(), 0x1000);
    }

    #[test]
    fn test_of_distinct_values() {
        let a = 1u8;
        let b = 2u8;
        assert_ne!(WaitAddress::of(&a), WaitAddress::of(&b));
        assert_eq!(WaitAddress::of(&a), WaitAddress::from(&a));
    }

    #[test]
    fn test_index_in_range() {
        for len in [1usize, 2, 16, 1024, 1 << 20] {
            for raw in (8..8 * 4096).step_by(8) {
                let addr = WaitAddress::from_raw(raw).unwrap();
                assert!(addr.index(len) < len);
            }
        }
        // A single-slot table maps everything to slot 0.
        assert_eq!(WaitAddress::from_raw(12345).unwrap().index(1), 0);
    }

    #[test]
    fn test_aligned_addresses_spread() {
        // 256 word-aligned neighbours should land in most of 256 buckets.
        let base = 0x7f00_0000_1000usize;
        let used: HashSet<usize> = (0..256)
            .map(|i| WaitAddress::from_raw(base + i * 8).unwrap().index(256))
            .collect();
        assert!(used.len() > 128, "poor spread: {} buckets used", used.len());
    }
}
