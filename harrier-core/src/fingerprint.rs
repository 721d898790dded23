//! Item-to-key fingerprinting.
//!
//! The set orders and identifies items by a 32-bit fingerprint. The
//! function must be deterministic and pure: equal inputs always produce
//! equal outputs, across calls and across threads. Distinct items mapping
//! to the same fingerprint are handled by the set itself (payloads are
//! compared on a key match), so collisions cost a short adjacent scan but
//! never corrupt membership.

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV-1a, 32-bit.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// A deterministic mapping from an item to the 32-bit key domain.
pub trait Fingerprint {
    fn fingerprint(&self) -> u32;
}

impl Fingerprint for [u8] {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(self)
    }
}

impl<const N: usize> Fingerprint for [u8; N] {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(self)
    }
}

impl Fingerprint for Vec<u8> {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(self)
    }
}

impl Fingerprint for str {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(self.as_bytes())
    }
}

impl Fingerprint for String {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(self.as_bytes())
    }
}

/// `u32` is already in the key domain; the fingerprint is the identity.
impl Fingerprint for u32 {
    fn fingerprint(&self) -> u32 {
        *self
    }
}

impl Fingerprint for u64 {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(&self.to_le_bytes())
    }
}

impl Fingerprint for usize {
    fn fingerprint(&self) -> u32 {
        fnv1a_32(&(*self as u64).to_le_bytes())
    }
}

impl<T: Fingerprint + ?Sized> Fingerprint for &T {
    fn fingerprint(&self) -> u32 {
        (**self).fingerprint()
    }
}
