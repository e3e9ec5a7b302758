//! 64-bit FNV-1a, the hash `UStr` keys are expected to be looked up with.

use std::hash::{BuildHasherDefault, Hasher};

pub const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
pub const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

#[inline]
fn fold(hash: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(hash, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME))
}

/// Hashes `bytes` with 64-bit FNV-1a.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    fold(FNV_OFFSET_BASIS, bytes)
}

/// Streaming FNV-1a. Hashing a `UStr` with it gives the same value as `UStr::fnv1a`.
#[derive(Clone, Copy, Debug)]
pub struct FnvHasher(u64);

impl Default for FnvHasher {
    fn default() -> FnvHasher {
        FnvHasher(FNV_OFFSET_BASIS)
    }
}

impl Hasher for FnvHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        self.0 = fold(self.0, bytes);
    }
}

/// For `HashMap<UStr, V, FnvBuildHasher>` and friends.
pub type FnvBuildHasher = BuildHasherDefault<FnvHasher>;
