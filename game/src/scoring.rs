//! Classic scoring and gravity tables. Delays are in microseconds.

pub const SOFT_DROP_DIVISOR: u32 = 20;
pub const LINES_PER_LEVEL: u32 = 10;
pub const SOFT_DROP_POINTS_PER_ROW: u32 = 1;

const LINE_CLEAR_BASE: [u32; 5] = [0, 40, 100, 300, 1200];

const DROP_SPEED_US: [u32; 10] = [
    799_000, 715_000, 632_000, 549_000, 466_000, 383_000, 300_000, 216_000, 133_000, 100_000,
];

pub fn score_for_clear(lines_cleared: u32, level: u32) -> u32 {
    let base = LINE_CLEAR_BASE
        .get(lines_cleared as usize)
        .copied()
        .unwrap_or(0);
    base.saturating_mul(level.saturating_add(1))
}

pub fn drop_speed(level: u32) -> u32 {
    match level {
        0..=9 => DROP_SPEED_US[level as usize],
        10..=12 => 83_000,
        13..=15 => 67_000,
        16..=18 => 50_000,
        19..=28 => 33_000,
        29..=31 => 17_000,
        _ => 8_000,
    }
}

pub fn soft_drop_speed(level: u32) -> u32 {
    drop_speed(level) / SOFT_DROP_DIVISOR
}

/// Cumulative line count that triggers the next level-up.
pub fn lines_to_next_level(level: u32) -> u32 {
    LINES_PER_LEVEL.saturating_mul(level.saturating_add(1))
}

pub fn soft_drop_bonus(rows: u32) -> u32 {
    rows.saturating_mul(SOFT_DROP_POINTS_PER_ROW)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_clear_values() {
        assert_eq!(score_for_clear(4, 0), 1200);
        assert_eq!(score_for_clear(1, 9), 400);
        assert_eq!(score_for_clear(2, 1), 200);
        assert_eq!(score_for_clear(3, 0), 300);
        for level in [0, 5, 29, u32::MAX] {
            assert_eq!(score_for_clear(0, level), 0);
        }
        assert_eq!(score_for_clear(7, 3), 0);
    }

    #[test]
    fn drop_speed_table_and_bands() {
        assert_eq!(drop_speed(0), 799_000);
        assert_eq!(drop_speed(9), 100_000);
        assert_eq!(drop_speed(12), 83_000);
        assert_eq!(drop_speed(13), 67_000);
        assert_eq!(drop_speed(18), 50_000);
        assert_eq!(drop_speed(28), 33_000);
        assert_eq!(drop_speed(31), 17_000);
        assert_eq!(drop_speed(35), drop_speed(32));
        assert!((1..40).all(|l| drop_speed(l) <= drop_speed(l - 1)));
    }

    #[test]
    fn soft_drop_is_twenty_times_faster() {
        assert_eq!(soft_drop_speed(0), 39_950);
        assert_eq!(soft_drop_speed(9), 5_000);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(lines_to_next_level(0), 10);
        assert_eq!(lines_to_next_level(4), 50);
        assert_eq!(soft_drop_bonus(7), 7);
    }
}
