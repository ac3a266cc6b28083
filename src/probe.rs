use crate::hasher::h1;

/// Triangular probe sequence over group indices.
///
/// Starting from `h1 & group_mask`, step `i` advances by `i` groups, so the
/// visited offsets are the triangular numbers `0, 1, 3, 6, ...`. For a
/// power-of-two group count the first `group_mask + 1` positions are a
/// permutation of all groups.
#[derive(Clone, Debug)]
pub(crate) struct ProbeSeq {
    group: usize,
    stride: usize,
    group_mask: usize,
}

impl ProbeSeq {
    #[inline(always)]
    pub(crate) fn new(hash: u64, group_mask: usize) -> Self {
        debug_assert!(group_mask.wrapping_add(1).is_power_of_two());
        ProbeSeq {
            group: h1(hash) & group_mask,
            stride: 0,
            group_mask,
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        let group = self.group;
        self.stride += 1;
        self.group = (self.group + self.stride) & self.group_mask;
        Some(group)
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn visits_every_group_once() {
        for groups in [1usize, 2, 4, 8, 64, 1024] {
            for start in [0u64, 1, 5, 12345, u64::MAX] {
                let mut seen = vec![false; groups];
                for group in ProbeSeq::new(start << 7, groups - 1).take(groups) {
                    assert!(!seen[group], "group {group} repeated for {groups} groups");
                    seen[group] = true;
                }
                assert!(seen.iter().all(|&s| s));
            }
        }
    }

    #[test]
    fn starts_at_home_group() {
        let hash = (37u64 << 7) | 0x55;
        let seq: Vec<_> = ProbeSeq::new(hash, 63).take(4).collect();
        assert_eq!(seq, [37, 38, 40, 43]);
    }

    #[test]
    fn wraps_around() {
        let hash = 7u64 << 7;
        let seq: Vec<_> = ProbeSeq::new(hash, 7).take(8).collect();
        assert_eq!(seq, [7, 0, 2, 5, 1, 6, 4, 3]);
    }
}
