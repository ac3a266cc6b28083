//! Control bytes and the group scan.
//!
//! Each slot owns one control byte. A byte with the top bit clear is the
//! 7-bit tag of a live entry; the two sentinels both have the top bit set so
//! that a single `movemask` finds every slot that could accept an insert.

use core::fmt::Debug;

/// Number of control bytes scanned together.
pub(crate) const GROUP_WIDTH: usize = 16;

/// Special tag value marking a slot that has never held an entry since the
/// last resize.
///
/// Chosen as 0x80 (sign bit set) so SSE2 `movemask`-based scans can leverage
/// the sign bit to detect free slots.
pub(crate) const EMPTY: u8 = 0x80;

/// Special tag value marking a vacated slot. Probing continues past it.
pub(crate) const DELETED: u8 = 0xFE;

/// Returns `true` if the control byte belongs to a live entry.
#[inline(always)]
pub(crate) fn is_full(ctrl: u8) -> bool {
    ctrl & 0x80 == 0
}

/// Decoded form of a control byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Control {
    /// Never used since the last resize. Terminates a probe.
    Empty,
    /// Vacated. Does not terminate a probe.
    Tombstone,
    /// Holds a live entry whose digest ends in the given tag.
    Present(u8),
}

impl Control {
    /// Decodes a raw control byte.
    #[inline]
    pub(crate) fn from_byte(byte: u8) -> Self {
        match byte {
            EMPTY => Control::Empty,
            DELETED => Control::Tombstone,
            tag => {
                debug_assert!(is_full(tag), "invalid control byte {tag:#04x}");
                Control::Present(tag)
            }
        }
    }
}

/// The set of matching positions within one group, lowest position first.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct BitMask(pub(crate) u16);

impl BitMask {
    #[inline(always)]
    pub(crate) fn any_bit_set(self) -> bool {
        self.0 != 0
    }

    #[inline(always)]
    pub(crate) fn lowest_set_bit(self) -> Option<usize> {
        if self.0 == 0 {
            None
        } else {
            Some(self.0.trailing_zeros() as usize)
        }
    }

    #[inline(always)]
    pub(crate) fn count(self) -> usize {
        self.0.count_ones() as usize
    }
}

impl Debug for BitMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "BitMask({:016b})", self.0)
    }
}

impl Iterator for BitMask {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let bit = self.lowest_set_bit()?;
        self.0 &= self.0 - 1;
        Some(bit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.count();
        (count, Some(count))
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "x86_64", target_feature = "sse2"))] {
        use core::arch::x86_64::*;

        /// One group of control bytes held in an SSE2 register.
        #[derive(Clone, Copy)]
        pub(crate) struct Group(__m128i);

        impl Group {
            /// Loads the group starting at `ptr`.
            ///
            /// # Safety
            ///
            /// `ptr` must be valid for reads of `GROUP_WIDTH` bytes and aligned
            /// to `GROUP_WIDTH`.
            #[inline(always)]
            pub(crate) unsafe fn load(ptr: *const u8) -> Self {
                debug_assert_eq!(ptr as usize % GROUP_WIDTH, 0);
                // SAFETY: Caller guarantees 16 readable bytes at a 16-byte aligned
                // address, which is what `_mm_load_si128` requires.
                unsafe { Group(_mm_load_si128(ptr as *const __m128i)) }
            }

            /// Positions whose control byte equals `tag`.
            #[inline(always)]
            pub(crate) fn match_tag(self, tag: u8) -> BitMask {
                // SAFETY: SSE2 is statically enabled for this target.
                unsafe {
                    let cmp = _mm_cmpeq_epi8(self.0, _mm_set1_epi8(tag as i8));
                    BitMask(_mm_movemask_epi8(cmp) as u16)
                }
            }

            /// Positions that are `EMPTY`.
            #[inline(always)]
            pub(crate) fn match_empty(self) -> BitMask {
                self.match_tag(EMPTY)
            }

            /// Positions that are `EMPTY` or `DELETED`. Relies on both sentinels
            /// having the sign bit set.
            #[inline(always)]
            pub(crate) fn match_empty_or_deleted(self) -> BitMask {
                // SAFETY: SSE2 is statically enabled for this target.
                unsafe { BitMask(_mm_movemask_epi8(self.0) as u16) }
            }

            /// Positions holding a live entry.
            #[inline(always)]
            pub(crate) fn match_full(self) -> BitMask {
                BitMask(!self.match_empty_or_deleted().0)
            }
        }
    } else {
        /// One group of control bytes, scanned byte by byte.
        #[derive(Clone, Copy)]
        pub(crate) struct Group([u8; GROUP_WIDTH]);

        impl Group {
            /// Loads the group starting at `ptr`.
            ///
            /// # Safety
            ///
            /// `ptr` must be valid for reads of `GROUP_WIDTH` bytes and aligned
            /// to `GROUP_WIDTH`.
            #[inline(always)]
            pub(crate) unsafe fn load(ptr: *const u8) -> Self {
                debug_assert_eq!(ptr as usize % GROUP_WIDTH, 0);
                // SAFETY: Caller guarantees 16 readable bytes at `ptr`.
                unsafe { Group(core::ptr::read(ptr as *const [u8; GROUP_WIDTH])) }
            }

            #[inline(always)]
            fn matching(self, pred: impl Fn(u8) -> bool) -> BitMask {
                let mut bits: u16 = 0;
                for (i, &byte) in self.0.iter().enumerate() {
                    if pred(byte) {
                        bits |= 1 << i;
                    }
                }
                BitMask(bits)
            }

            /// Positions whose control byte equals `tag`.
            #[inline(always)]
            pub(crate) fn match_tag(self, tag: u8) -> BitMask {
                self.matching(|byte| byte == tag)
            }

            /// Positions that are `EMPTY`.
            #[inline(always)]
            pub(crate) fn match_empty(self) -> BitMask {
                self.match_tag(EMPTY)
            }

            /// Positions that are `EMPTY` or `DELETED`.
            #[inline(always)]
            pub(crate) fn match_empty_or_deleted(self) -> BitMask {
                self.matching(|byte| !is_full(byte))
            }

            /// Positions holding a live entry.
            #[inline(always)]
            pub(crate) fn match_full(self) -> BitMask {
                self.matching(is_full)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[repr(C, align(16))]
    struct Aligned([u8; GROUP_WIDTH]);

    fn sample() -> Aligned {
        let mut bytes = [EMPTY; GROUP_WIDTH];
        bytes[0] = 0x11;
        bytes[3] = DELETED;
        bytes[5] = 0x11;
        bytes[6] = 0x00;
        bytes[15] = 0x7F;
        Aligned(bytes)
    }

    #[test]
    fn group_matches() {
        let bytes = sample();
        // SAFETY: `Aligned` is 16 bytes and 16-byte aligned.
        let group = unsafe { Group::load(bytes.0.as_ptr()) };

        assert_eq!(group.match_tag(0x11).collect::<Vec<_>>(), [0, 5]);
        assert_eq!(group.match_tag(0x00).collect::<Vec<_>>(), [6]);
        assert_eq!(group.match_tag(0x7F).collect::<Vec<_>>(), [15]);
        assert!(!group.match_tag(0x12).any_bit_set());

        assert_eq!(group.match_full().collect::<Vec<_>>(), [0, 5, 6, 15]);
        assert_eq!(group.match_empty().count(), 11);
        assert_eq!(group.match_empty_or_deleted().count(), 12);
        assert_eq!(group.match_empty_or_deleted().lowest_set_bit(), Some(1));
    }

    #[test]
    fn tombstone_is_not_empty() {
        let mut bytes = Aligned([0x01; GROUP_WIDTH]);
        bytes.0[9] = DELETED;
        // SAFETY: `Aligned` is 16 bytes and 16-byte aligned.
        let group = unsafe { Group::load(bytes.0.as_ptr()) };

        assert!(!group.match_empty().any_bit_set());
        assert_eq!(group.match_empty_or_deleted().lowest_set_bit(), Some(9));
        assert_eq!(group.match_full().count(), 15);
    }

    #[test]
    fn decode_control_bytes() {
        assert_eq!(Control::from_byte(EMPTY), Control::Empty);
        assert_eq!(Control::from_byte(DELETED), Control::Tombstone);
        assert_eq!(Control::from_byte(0x2A), Control::Present(0x2A));
        assert!(is_full(0x00));
        assert!(!is_full(EMPTY));
        assert!(!is_full(DELETED));
    }

    #[test]
    fn bitmask_iterates_lowest_first() {
        let mask = BitMask(0b1000_0000_0010_0101);
        assert_eq!(mask.size_hint(), (4, Some(4)));
        assert_eq!(mask.collect::<Vec<_>>(), [0, 2, 5, 15]);
        assert_eq!(BitMask(0).lowest_set_bit(), None);
    }
}
