//! Bitboard primitives for one 8×8 half of the board.
//!
//! Bit `p` is row `p >> 3`, column `p & 7`, seen from the owner of the half: column 7 is
//! the front line facing the opponent and column 0 is the rear.

pub const SIZE: u8 = 8;

pub const ROW: u64 = 0xFF;
pub const REAR: u64 = 0x0101_0101_0101_0101;
pub const FRONT: u64 = 0x8080_8080_8080_8080;

#[inline]
pub fn popcount(mask: u64) -> u32 {
    mask.count_ones()
}

#[inline]
pub fn count_zeros(mask: u64) -> u32 {
    mask.count_zeros()
}

/// Returns the position (1..=64) of the `rank`-th set bit of `mask`, counting from the most
/// significant bit. The bit index is `64 - result`.
///
/// Branchless. `rank` must lie in `1..=popcount(mask)`.
#[inline]
pub fn rank_select(mask: u64, rank: u32) -> u32 {
    debug_assert!(rank >= 1 && rank <= popcount(mask), "rank {rank} of {mask:#x}");

    let v = mask;
    let mut r = rank as u64;

    let a = v - (v >> 1 & 0x5555_5555_5555_5555);
    let b = (a & 0x3333_3333_3333_3333) + (a >> 2 & 0x3333_3333_3333_3333);
    let c = b + (b >> 4) & 0x0F0F_0F0F_0F0F_0F0F;
    let d = c + (c >> 8) & 0x00FF_00FF_00FF_00FF;

    // Narrow the window from 64 bits down to one, keeping `r` relative to the window.
    let mut s: u64 = 64;
    let mut t = (d >> 32) + (d >> 48) & 0x7F;
    s -= (t.wrapping_sub(r) & 256) >> 3;
    r -= t & t.wrapping_sub(r) >> 8;

    t = d >> (s - 16) & 0xFF;
    s -= (t.wrapping_sub(r) & 256) >> 4;
    r -= t & t.wrapping_sub(r) >> 8;

    t = c >> (s - 8) & 0xF;
    s -= (t.wrapping_sub(r) & 256) >> 5;
    r -= t & t.wrapping_sub(r) >> 8;

    t = b >> (s - 4) & 0x7;
    s -= (t.wrapping_sub(r) & 256) >> 6;
    r -= t & t.wrapping_sub(r) >> 8;

    t = a >> (s - 2) & 0x3;
    s -= (t.wrapping_sub(r) & 256) >> 7;
    r -= t & t.wrapping_sub(r) >> 8;

    t = v >> (s - 1) & 0x1;
    s -= (t.wrapping_sub(r) & 256) >> 8;

    (65 - s) as u32
}

/// Loop-based equivalent of [`rank_select`].
pub fn rank_select_scan(mask: u64, rank: u32) -> u32 {
    let mut seen = 0;
    for bit in (0..64).rev() {
        if mask >> bit & 1 != 0 {
            seen += 1;
            if seen == rank {
                return 64 - bit;
            }
        }
    }
    panic!("rank {rank} out of range for {mask:#x}")
}

/// Position of the `n`-th free cell, counting from the most significant bit.
#[inline]
pub fn select_free(occupied: u64, n: u32) -> u8 {
    (64 - rank_select(!occupied, n)) as u8
}

/// Inverse of [`select_free`]: the 1-based rank of `position` among the free cells.
#[inline]
pub fn rank_of(free: u64, position: u8) -> u32 {
    debug_assert!(free >> position & 1 != 0);
    popcount(free & !0 << position)
}

/// Linear position of a cell. Columns past the centre line address the opponent's half,
/// which is mirrored so that both halves count columns from their own rear.
#[inline]
pub fn position(row: u8, col: u8) -> u8 {
    debug_assert!(row < SIZE && col < 2 * SIZE);
    let col = if col >= SIZE { 2 * SIZE - 1 - col } else { col };
    row << 3 | col
}

#[inline]
pub fn row_col(position: u8) -> (u8, u8) {
    (position >> 3, position & 7)
}

#[inline]
pub fn bit(position: u8) -> u64 {
    1 << position
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rstest::rstest;

    fn swar_popcount(mut n: u64) -> u32 {
        n -= n >> 1 & 0x5555_5555_5555_5555;
        n = (n & 0x3333_3333_3333_3333) + (n >> 2 & 0x3333_3333_3333_3333);
        n = n + (n >> 4) & 0x0F0F_0F0F_0F0F_0F0F;
        n += n >> 8;
        n += n >> 16;
        (n + (n >> 32) & 0x7F) as u32
    }

    fn masks() -> impl Iterator<Item = u64> {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let sparse = (0..256).map(move |_| rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>());
        [0, !0, 1, 1 << 63, FRONT, REAR, ROW]
            .into_iter()
            .chain(sparse)
            .chain((0..512).scan(ChaCha8Rng::seed_from_u64(11), |rng, _| Some(rng.gen())))
    }

    #[test]
    fn popcount_complements() {
        for m in masks() {
            assert_eq!(popcount(m) + popcount(!m), 64);
            assert_eq!(count_zeros(m), popcount(!m));
            assert_eq!(popcount(m), swar_popcount(m), "{m:#x}");
        }
    }

    #[test]
    fn rank_select_matches_scan() {
        for m in masks() {
            for i in 1..=popcount(m) {
                assert_eq!(rank_select(m, i), rank_select_scan(m, i), "{m:#x} rank {i}");
            }
        }
    }

    #[test]
    fn rank_select_counts_from_the_top() {
        for m in masks() {
            for i in 1..=popcount(m) {
                let bit = 64 - rank_select(m, i);
                assert_ne!(m >> bit & 1, 0);
                let above = if bit == 63 { 0 } else { m >> (bit + 1) };
                assert_eq!(popcount(above), i - 1);
            }
        }
    }

    #[rstest]
    #[case(1, 1, 64)]
    #[case(1 << 63, 1, 1)]
    #[case(0b1010, 1, 61)]
    #[case(0b1010, 2, 63)]
    #[case(!0, 64, 64)]
    fn rank_select_cases(#[case] mask: u64, #[case] rank: u32, #[case] expected: u32) {
        assert_eq!(rank_select(mask, rank), expected);
    }

    #[test]
    fn free_cells_round_trip() {
        let occupied = FRONT | 1 << 20 | 1 << 63;
        let free = !occupied;
        for n in 1..=popcount(free) {
            let p = select_free(occupied, n);
            assert_eq!(occupied >> p & 1, 0);
            assert_eq!(rank_of(free, p), n);
        }
        assert_eq!(select_free(occupied, 1), 62);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(3, 7, 31)]
    #[case(3, 8, 31)]
    #[case(7, 15, 56)]
    #[case(5, 12, 43)]
    fn mirrored_positions(#[case] row: u8, #[case] col: u8, #[case] expected: u8) {
        assert_eq!(position(row, col), expected);
        assert_eq!(row_col(expected), (row, col.min(15 - col)));
    }
}
