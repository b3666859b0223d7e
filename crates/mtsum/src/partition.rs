//! Deterministic recursive partition of a byte range into a binary tree
//!
//! Two split policies share the recursion:
//!
//! - **Balanced** (large ranges): halve the range, rounding the left side up
//!   to a whole number of blocks. Both halves stay within one block of each
//!   other, and the left side remains splittable on block boundaries.
//! - **Power-of-two** (ranges at or below the balance threshold): the left
//!   side takes the greatest power of two below the size, building a
//!   left-complete tree; the right side absorbs the remainder.
//!
//! Both policies tile the parent exactly, so every level of the resulting
//! tree covers the same byte range as the file.

/// Leaf payload upper bound: 128 MiB.
pub const BLOCK_SIZE: u64 = 128 * 1024 * 1024;

/// Sizes above this split with the balanced policy: 1 GiB.
pub const BALANCE_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Round `x` up to a whole number of blocks.
pub fn ceil_to_block(x: u64, block_size: u64) -> u64 {
    ((x + block_size - 1) / block_size) * block_size
}

/// Greatest power of two `<= x`. Callers must not pass 0.
pub fn floor_pot(x: u64) -> u64 {
    debug_assert!(x >= 1, "floor_pot is undefined for 0");
    let mut x = x;
    x |= x >> 1;
    x |= x >> 2;
    x |= x >> 4;
    x |= x >> 8;
    x |= x >> 16;
    x |= x >> 32;
    x - (x >> 1)
}

/// Split `(offset, size)` into left and right child ranges.
///
/// Picks the policy from the size: balanced above `balance_threshold`,
/// power-of-two below. Only meaningful for `size > block_size`; leaf-sized
/// ranges are never split.
pub fn split(
    offset: u64,
    size: u64,
    block_size: u64,
    balance_threshold: u64,
) -> ((u64, u64), (u64, u64)) {
    debug_assert!(size > block_size, "leaf-sized range must not be split");
    let left_size = if size <= balance_threshold {
        floor_pot(size - 1)
    } else {
        ceil_to_block(size / 2, block_size)
    };
    let right_size = size - left_size;
    ((offset, left_size), (offset + left_size, right_size))
}

/// Split `(offset, size)` with the balanced policy unconditionally.
///
/// This is the shape the distributed fold mirrors: the rank partition and
/// the gathered-digest tree must split identically for the global root to
/// match a same-shape single-process run.
pub fn split_balanced(offset: u64, size: u64, block_size: u64) -> ((u64, u64), (u64, u64)) {
    let left_size = ceil_to_block(size / 2, block_size);
    let right_size = size - left_size;
    ((offset, left_size), (offset + left_size, right_size))
}

/// Partition `[0, file_size)` into `ranks` ranges in left-to-right order.
///
/// Applies the balanced policy recursively until the level width equals the
/// rank count. Rank `i` owns entry `i`. `ranks` must be a power of two.
pub fn partition_ranks(file_size: u64, ranks: usize, block_size: u64) -> Vec<(u64, u64)> {
    debug_assert!(ranks.is_power_of_two(), "rank count must be a power of two");
    let mut parts = Vec::with_capacity(ranks);
    partition_level(&mut parts, 0, file_size, 1, ranks, block_size);
    parts
}

fn partition_level(
    parts: &mut Vec<(u64, u64)>,
    offset: u64,
    size: u64,
    level: usize,
    target: usize,
    block_size: u64,
) {
    if level == target {
        parts.push((offset, size));
        return;
    }
    let ((lo, ls), (ro, rs)) = split_balanced(offset, size, block_size);
    partition_level(parts, lo, ls, level << 1, target, block_size);
    partition_level(parts, ro, rs, level << 1, target, block_size);
}

#[cfg(test)]
mod tests {
    use super::*;

    const KB: u64 = 1024;

    #[test]
    fn test_ceil_to_block() {
        assert_eq!(ceil_to_block(1, KB), KB);
        assert_eq!(ceil_to_block(KB, KB), KB);
        assert_eq!(ceil_to_block(KB + 1, KB), 2 * KB);
        assert_eq!(ceil_to_block(0, KB), 0);
    }

    #[test]
    fn test_floor_pot() {
        assert_eq!(floor_pot(1), 1);
        assert_eq!(floor_pot(2), 2);
        assert_eq!(floor_pot(3), 2);
        assert_eq!(floor_pot(255), 128);
        assert_eq!(floor_pot(256), 256);
        assert_eq!(floor_pot(u64::MAX), 1 << 63);
    }

    #[test]
    fn test_split_tiles_parent() {
        // Both policies: children cover the parent range exactly.
        for size in [3 * KB, 5 * KB + 17, 100 * KB] {
            let ((lo, ls), (ro, rs)) = split(7 * KB, size, KB, 8 * KB);
            assert_eq!(lo, 7 * KB);
            assert_eq!(ro, lo + ls);
            assert_eq!(ls + rs, size);
            assert!(ls > 0 && rs > 0);
        }
    }

    #[test]
    fn test_split_power_of_two_policy() {
        // At or below the threshold, the left side is the greatest power of
        // two below the size.
        let ((_, ls), (_, rs)) = split(0, 3 * KB, KB, 8 * KB);
        assert_eq!(ls, 2 * KB);
        assert_eq!(rs, KB);

        // Exactly two blocks splits evenly.
        let ((_, ls), (_, rs)) = split(0, 2 * KB, KB, 8 * KB);
        assert_eq!(ls, KB);
        assert_eq!(rs, KB);
    }

    #[test]
    fn test_split_balanced_policy() {
        // Above the threshold the halves stay within one block.
        let ((_, ls), (_, rs)) = split(0, 9 * KB, KB, 8 * KB);
        assert_eq!(ls, ceil_to_block(9 * KB / 2, KB));
        assert_eq!(ls + rs, 9 * KB);
        assert!(ls.abs_diff(rs) <= KB);
        assert_eq!(ls % KB, 0);
    }

    #[test]
    fn test_partition_ranks_single() {
        let parts = partition_ranks(100 * KB, 1, KB);
        assert_eq!(parts, vec![(0, 100 * KB)]);
    }

    #[test]
    fn test_partition_ranks_covers_file() {
        for ranks in [2, 4, 8] {
            let file_size = 1000 * KB + 333;
            let parts = partition_ranks(file_size, ranks, KB);
            assert_eq!(parts.len(), ranks);

            let mut expected_offset = 0;
            for &(offset, size) in &parts {
                assert_eq!(offset, expected_offset);
                assert!(size > 0);
                expected_offset += size;
            }
            assert_eq!(expected_offset, file_size);
        }
    }

    #[test]
    fn test_partition_ranks_left_sides_block_aligned() {
        let parts = partition_ranks(64 * KB + 5, 4, KB);
        // Every boundary between ranks falls on a block boundary.
        for &(offset, _) in &parts {
            assert_eq!(offset % KB, 0);
        }
    }

    #[test]
    fn test_partition_ranks_deterministic() {
        let a = partition_ranks(977 * KB + 11, 8, KB);
        let b = partition_ranks(977 * KB + 11, 8, KB);
        assert_eq!(a, b);
    }
}
