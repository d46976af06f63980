//! Scoring engine: pure point, rating and progression arithmetic.
//!
//! Everything here is a function of its arguments. Settlement, the board and
//! the TUI all go through these helpers, so estimates shown before grading
//! can never diverge from the values applied at settlement time.

use crate::fields::Status;
use crate::task::Task;

/// Allowed task sizes.
pub const FIBONACCI_SIZES: [u32; 9] = [1, 2, 3, 5, 8, 13, 21, 34, 55];

/// Point capacity per building level. Levels past the table clamp to the
/// last entry.
pub const CAPACITY_LADDER: [u64; 12] = [
    100, 200, 400, 700, 1200, 2000, 3300, 5400, 8800, 14300, 20000, 30000,
];

/// XP credited per settled point.
pub const XP_PER_POINT: u64 = 10;

/// Player leveling curve: `base * growth^(level-1)`.
pub const PLAYER_XP_BASE: f64 = 1000.0;
/// Squad leveling curve uses a larger base with the same growth.
pub const SQUAD_XP_BASE: f64 = 2000.0;
pub const LEVEL_GROWTH: f64 = 1.5;

/// Fresh profiles start at a neutral reputation.
pub const REPUTATION_SEED: f64 = 3.0;
const REPUTATION_DECAY: f64 = 0.95;

pub const SPRINT_DURATION_DAYS: i64 = 14;
/// Deadline extension granted when a time-limited fixed task is renewed.
pub const RENEWAL_EXTENSION_DAYS: i64 = 7;

const BASE_UPGRADE_COST: f64 = 50.0;
const UPGRADE_COST_GROWTH: f64 = 1.6;

pub fn is_valid_size(size: u32) -> bool {
    FIBONACCI_SIZES.contains(&size)
}

pub fn is_valid_complexity(complexity: u32) -> bool {
    (1..=3).contains(&complexity)
}

/// Base point value of a task before any rating is applied.
pub fn base_points(size: u32, complexity: u32, rule_multiplier: f64) -> u64 {
    floor_points(f64::from(size) * f64::from(complexity) * rule_multiplier)
}

/// Reward multiplier for a raw rating value. Anything outside 0-3 is worth
/// nothing rather than failing.
pub fn rating_multiplier(rating: u8) -> f64 {
    match rating {
        0 => 0.0,
        1 => 1.0,
        2 => 1.5,
        3 => 2.0,
        _ => 0.0,
    }
}

/// Star value a rating feeds into the reputation average.
pub fn rating_stars(rating: u8) -> f64 {
    match rating {
        0 => 1.0,
        1 => 3.0,
        2 => 4.0,
        3 => 5.0,
        _ => 1.0,
    }
}

/// Scale a base share by the rating multiplier.
pub fn scale_points(base: u64, rating: u8) -> u64 {
    floor_points(base as f64 * rating_multiplier(rating))
}

pub fn xp_for_points(points: u64) -> u64 {
    points * XP_PER_POINT
}

/// Coins pay out 1:1 with points.
pub fn coins_for_points(points: u64) -> u64 {
    points
}

/// Point capacity of a building at the given level.
pub fn capacity_for_level(level: u32) -> u64 {
    let index = (level.max(1) as usize - 1).min(CAPACITY_LADDER.len() - 1);
    CAPACITY_LADDER[index]
}

/// Coin cost to raise a building from `level` to `level + 1`.
pub fn upgrade_cost(level: u32) -> u64 {
    (BASE_UPGRADE_COST * UPGRADE_COST_GROWTH.powi(level as i32)).floor() as u64
}

/// XP needed to clear the given player level.
pub fn next_level_xp(level: u32) -> u64 {
    (PLAYER_XP_BASE * LEVEL_GROWTH.powi(level as i32 - 1)).floor() as u64
}

/// XP needed to clear the given squad level.
pub fn squad_next_level_xp(level: u32) -> u64 {
    (SQUAD_XP_BASE * LEVEL_GROWTH.powi(level as i32 - 1)).floor() as u64
}

/// Exponential moving average pulling reputation toward the latest rating.
pub fn decay_reputation(reputation: f64, rating: u8) -> f64 {
    reputation * REPUTATION_DECAY + rating_stars(rating) * (1.0 - REPUTATION_DECAY)
}

/// Five-point star display bucket for a reputation value.
pub fn reputation_stars(reputation: f64) -> u8 {
    if reputation >= 4.6 {
        5
    } else if reputation >= 3.6 {
        4
    } else if reputation >= 2.6 {
        3
    } else if reputation >= 1.6 {
        2
    } else {
        1
    }
}

/// Point estimate for a task. Settled tasks report their recorded value;
/// everything else uses the base formula.
pub fn estimate_points(task: &Task) -> u64 {
    if task.status == Status::Done {
        if let Some(settlement) = &task.settlement {
            return settlement.final_points;
        }
    }
    base_points(task.size, task.complexity, task.rule_multiplier)
}

/// Floor to whole points, clamping anything negative to zero.
fn floor_points(value: f64) -> u64 {
    value.floor().max(0.0) as u64
}
