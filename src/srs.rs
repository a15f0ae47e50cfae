//! SM-2 review scheduling.
//!
//! Quality ratings run 0-5; a rating of 3 or better counts as a pass.
//! Callers that only know a correct/incorrect outcome typically map
//! correct -> 5 and incorrect -> 2. The queue schedulers do not consult
//! `next_review_at`; rating a card is an explicit, separate step.

use chrono::{Duration, NaiveDateTime};

/// Minimum ease factor allowed.
pub const MIN_EASE_FACTOR: f32 = 1.3;

/// Ease factor assigned to a card that has never been rated.
pub const DEFAULT_EASE_FACTOR: f32 = 2.5;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewUpdate {
    pub ease_factor: f32,
    pub interval_days: i32,
    pub next_review_at: NaiveDateTime,
}

/// Computes the next interval and ease factor for one quality rating.
/// Out-of-range ratings are clamped rather than rejected.
pub fn next_review(
    ease_factor: f32,
    interval_days: i32,
    quality: i32,
    now: NaiveDateTime,
) -> ReviewUpdate {
    let quality = quality.clamp(0, 5);

    let interval_days = if quality >= 3 {
        match interval_days {
            0 => 1,
            1 => 6,
            _ => (interval_days as f32 * ease_factor).round() as i32,
        }
    } else {
        // A failure restarts the card: the next pass lands on the one-day
        // interval again.
        0
    };

    // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
    let miss = (5 - quality) as f32;
    let ease_factor = (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR);

    ReviewUpdate {
        ease_factor,
        interval_days,
        next_review_at: now + Duration::days(interval_days as i64),
    }
}
