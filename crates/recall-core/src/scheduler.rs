//! SM-2 style interval scheduling.
//!
//! Pure functions: given an item's current state and whether the answer was
//! correct, compute the quality score, the new ease factor, and the interval
//! until the item is due again. Safe to call from any thread.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::model::Item;

/// Floor of the ease factor.
pub const MIN_EASE: f64 = 1.3;

/// Ease factor of a freshly added item.
pub const DEFAULT_EASE: f64 = 2.5;

/// Ease penalty applied on an incorrect answer.
pub const MISS_PENALTY: f64 = 0.2;

/// Interval after a miss and after the first correct answer, in days.
pub const MIN_INTERVAL_DAYS: f64 = 1.0;

/// Interval after the second correct answer, in days.
pub const SECOND_INTERVAL_DAYS: f64 = 3.0;

/// Previous-interval table in days, indexed by `review_count - 2`.
pub const INTERVAL_TABLE_DAYS: [f64; 5] = [1.0, 3.0, 7.0, 14.0, 30.0];

/// Upper bound applied when converting an interval into a duration.
pub const MAX_INTERVAL_DAYS: f64 = 36_500.0;

/// Consecutive correct answers after which an item counts as learned.
pub const MASTERY_STREAK: u32 = 5;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Result of scheduling one answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// Quality on the 0..=5 scale; 0 for an incorrect answer.
    pub quality: u8,
    /// Ease factor after this answer.
    pub new_difficulty: f64,
    /// Days until the item is due again.
    pub next_interval_days: f64,
}

impl ReviewOutcome {
    /// The interval as a duration, capped at [`MAX_INTERVAL_DAYS`].
    pub fn next_interval(&self) -> Duration {
        let days = self.next_interval_days.clamp(0.0, MAX_INTERVAL_DAYS);
        Duration::milliseconds((days * MILLIS_PER_DAY).round() as i64)
    }
}

/// Compute the next review for `item` given the answer correctness.
pub fn compute_next_review(item: &Item, is_correct: bool) -> ReviewOutcome {
    let quality = quality(is_correct, item.difficulty);

    if !is_correct {
        return ReviewOutcome {
            quality,
            new_difficulty: (item.difficulty - MISS_PENALTY).max(MIN_EASE),
            next_interval_days: MIN_INTERVAL_DAYS,
        };
    }

    let new_difficulty = ease_factor(item.difficulty, quality);
    let next_interval_days = match item.review_count {
        0 => MIN_INTERVAL_DAYS,
        1 => SECOND_INTERVAL_DAYS,
        _ => previous_interval_days(item) * new_difficulty,
    };

    ReviewOutcome {
        quality,
        new_difficulty,
        next_interval_days,
    }
}

/// Quality derived from the current difficulty band.
pub fn quality(is_correct: bool, difficulty: f64) -> u8 {
    if !is_correct {
        return 0;
    }
    match difficulty {
        d if d < 2.0 => 5,
        d if d < 2.5 => 4,
        d if d < 3.0 => 3,
        d if d < 3.5 => 2,
        _ => 1,
    }
}

/// SM-2 ease update, floored at [`MIN_EASE`].
pub fn ease_factor(old_ease: f64, quality: u8) -> f64 {
    let lapse = 5.0 - f64::from(quality.min(5));
    let ease = old_ease + (0.1 - lapse * (0.08 + lapse * 0.02));
    ease.max(MIN_EASE)
}

/// The interval that preceded the current review, in days.
///
/// Read from [`INTERVAL_TABLE_DAYS`] by `review_count - 2`; past the end
/// of the table it grows geometrically with the item's current ease.
pub fn previous_interval_days(item: &Item) -> f64 {
    if item.review_count <= 1 {
        return MIN_INTERVAL_DAYS;
    }
    let index = (item.review_count - 2) as usize;
    if let Some(days) = INTERVAL_TABLE_DAYS.get(index) {
        return *days;
    }
    let last = INTERVAL_TABLE_DAYS[INTERVAL_TABLE_DAYS.len() - 1];
    let exponent = item.review_count as i32 - INTERVAL_TABLE_DAYS.len() as i32 - 1;
    last * item.difficulty.powi(exponent)
}

pub fn is_learned(consecutive_correct: u32) -> bool {
    consecutive_correct >= MASTERY_STREAK
}

/// Mastery progress in percent, saturating at 100.
pub fn mastery_progress(consecutive_correct: u32) -> f64 {
    (f64::from(consecutive_correct) / f64::from(MASTERY_STREAK)).min(1.0) * 100.0
}
