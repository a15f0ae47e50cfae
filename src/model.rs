use chrono::NaiveDateTime;
use diesel::{Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};

use crate::schema::cards;
use crate::srs;

/// One learning unit with its performance statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub card_id: i32,
    pub prompt: String,
    pub response: String,
    pub media_ref: Option<String>,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub last_answered_at: Option<NaiveDateTime>,
    pub ease_factor: f32,
    pub interval_days: i32,
    pub next_review_at: Option<NaiveDateTime>,
}

impl Card {
    pub fn new(card_id: i32, input: NewCard) -> Self {
        Card {
            card_id,
            prompt: input.prompt,
            response: input.response,
            media_ref: input.media_ref,
            correct_count: 0,
            wrong_count: 0,
            last_answered_at: None,
            ease_factor: srs::DEFAULT_EASE_FACTOR,
            interval_days: 0,
            next_review_at: None,
        }
    }

    pub fn total_answers(&self) -> i32 {
        self.correct_count + self.wrong_count
    }

    /// Zeroes both answer counters and forgets when the card was last seen.
    /// Spaced-repetition fields are left alone.
    pub fn reset_statistics(&mut self) {
        self.correct_count = 0;
        self.wrong_count = 0;
        self.last_answered_at = None;
    }
}

/// Producer input for a new card. Anything with an empty prompt or response
/// is rejected before it reaches the store.
#[derive(Debug, Deserialize)]
pub struct NewCard {
    pub prompt: String,
    pub response: String,
    #[serde(default)]
    pub media_ref: Option<String>,
}

impl NewCard {
    pub fn is_well_formed(&self) -> bool {
        !self.prompt.trim().is_empty() && !self.response.trim().is_empty()
    }
}

#[derive(Debug, Queryable, Selectable, Insertable)]
#[diesel(table_name = cards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CardRow {
    pub card_id: i32,
    pub position: i32,
    pub prompt: String,
    pub response: String,
    pub media_ref: Option<String>,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub last_answered_at: Option<NaiveDateTime>,
    pub ease_factor: f32,
    pub interval_days: i32,
    pub next_review_at: Option<NaiveDateTime>,
}

impl CardRow {
    pub fn from_card(card: &Card, position: usize) -> Self {
        CardRow {
            card_id: card.card_id,
            position: position as i32,
            prompt: card.prompt.clone(),
            response: card.response.clone(),
            media_ref: card.media_ref.clone(),
            correct_count: card.correct_count,
            wrong_count: card.wrong_count,
            last_answered_at: card.last_answered_at,
            ease_factor: card.ease_factor,
            interval_days: card.interval_days,
            next_review_at: card.next_review_at,
        }
    }

    pub fn into_card(self) -> Card {
        Card {
            card_id: self.card_id,
            prompt: self.prompt,
            response: self.response,
            media_ref: self.media_ref,
            correct_count: self.correct_count,
            wrong_count: self.wrong_count,
            last_answered_at: self.last_answered_at,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            next_review_at: self.next_review_at,
        }
    }
}
