//! Digest computation and the split into placement and filter components.
//!
//! Every key is reduced to a 64-bit digest. The low [`TAG_BITS`] bits become
//! the control-byte tag (H2) and the remaining bits select the first group of
//! the probe sequence (H1). Keeping the two disjoint means entries sharing a
//! home group still carry independent tags.

use core::hash::BuildHasher;
use core::hash::Hasher;

/// Number of digest bits stored inline in a control byte.
pub(crate) const TAG_BITS: u32 = 7;

const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

/// Placement component of a digest.
#[inline(always)]
pub(crate) fn h1(hash: u64) -> usize {
    (hash >> TAG_BITS) as usize
}

/// Filter tag of a digest. Always has the top bit clear, which is what
/// distinguishes a present control byte from `EMPTY` and `DELETED`.
#[inline(always)]
pub(crate) fn h2(hash: u64) -> u8 {
    (hash & TAG_MASK) as u8
}

/// Hashes a byte-buffer key.
///
/// The whole buffer goes through a single `write` call so that `&str`,
/// `String`, `&[u8]` and `Vec<u8>` views of the same bytes agree.
#[inline]
pub(crate) fn hash_bytes<S: BuildHasher>(hash_builder: &S, bytes: &[u8]) -> u64 {
    let mut hasher = hash_builder.build_hasher();
    hasher.write(bytes);
    hasher.finish()
}

/// Hashes a native-width integer key.
#[inline]
pub(crate) fn hash_int<S: BuildHasher>(hash_builder: &S, value: u64) -> u64 {
    let mut hasher = hash_builder.build_hasher();
    hasher.write_u64(value);
    hasher.finish()
}

// PCG multiplier and the fractional digits of pi.
const MULTIPLE: u64 = 0x5851_f42d_4c95_7f2d;
const ARBITRARY: u64 = 0x243f_6a88_85a3_08d3;

#[inline(always)]
const fn folded_multiply(x: u64, y: u64) -> u64 {
    let full = (x as u128).wrapping_mul(y as u128);
    (full as u64) ^ ((full >> 64) as u64)
}

/// A small folded-multiply hasher.
///
/// This is the default strategy for [`IntMap`](crate::IntMap): integer keys
/// are frequently sequential or pointer-aligned, so a single multiply-and-fold
/// is enough to spread them over both the tag and the placement bits. It also
/// accepts arbitrary byte input, which makes it usable as the fallback byte
/// hasher on targets without `foldhash` or `std`.
#[derive(Clone, Debug)]
pub struct MixHasher {
    state: u64,
}

impl Hasher for MixHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut chunks = bytes.chunks_exact(8);
        for chunk in &mut chunks {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            self.write_u64(u64::from_le_bytes(word));
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            let mut word = [0u8; 8];
            word[..tail.len()].copy_from_slice(tail);
            self.write_u64(u64::from_le_bytes(word));
        }

        // Zero padding alone would make "ab" and "ab\0" collide.
        self.write_u64(bytes.len() as u64);
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn write_u16(&mut self, i: u16) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.state = folded_multiply(self.state ^ i, MULTIPLE);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        folded_multiply(self.state, ARBITRARY)
    }
}

/// Builder for [`MixHasher`].
///
/// The seed is fixed for the lifetime of the builder, so digests of inserted
/// keys stay reproducible for as long as the owning table exists.
#[derive(Clone, Debug)]
pub struct MixState {
    seed: u64,
}

impl MixState {
    /// Creates a builder with an explicit seed.
    pub const fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

impl Default for MixState {
    fn default() -> Self {
        Self::with_seed(ARBITRARY)
    }
}

impl BuildHasher for MixState {
    type Hasher = MixHasher;

    #[inline]
    fn build_hasher(&self) -> MixHasher {
        MixHasher { state: self.seed }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used by [`HashSet`](crate::HashSet) and
        /// [`HashMap`](crate::HashMap) when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used by [`HashSet`](crate::HashSet) and
        /// [`HashMap`](crate::HashMap) when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// The hash builder used by [`HashSet`](crate::HashSet) and
        /// [`HashMap`](crate::HashMap) when none is specified.
        pub type DefaultHashBuilder = MixState;
    }
}
