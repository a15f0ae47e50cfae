//! Read-only statistics over the card collection.

use serde::Serialize;
use std::collections::HashSet;

use crate::model::Card;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    NotStudied,
}

/// Mastered means at least three correct answers and no wrong ones.
pub fn is_mastered(card: &Card) -> bool {
    card.correct_count >= 3 && card.wrong_count == 0
}

/// Fraction of answers that were correct, 0 for an unanswered card.
pub fn accuracy(card: &Card) -> f32 {
    if card.total_answers() == 0 {
        0.0
    } else {
        card.correct_count as f32 / card.total_answers() as f32
    }
}

/// Buckets are mutually exclusive and checked in this order: mastery,
/// never answered, mid-range accuracy with at least one miss, everything
/// else that has been answered.
pub fn difficulty(card: &Card) -> Difficulty {
    if is_mastered(card) {
        Difficulty::Easy
    } else if card.correct_count == 0 && card.wrong_count == 0 {
        Difficulty::NotStudied
    } else if card.wrong_count > 0 && accuracy(card) >= 0.5 && accuracy(card) < 1.0 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    }
}

/// Count of distinct calendar dates on which anything was answered.
/// Dates are taken from the stored timestamps as-is, without timezone
/// normalization.
pub fn distinct_study_days(cards: &[Card]) -> usize {
    cards
        .iter()
        .filter_map(|card| card.last_answered_at)
        .map(|at| at.date())
        .collect::<HashSet<_>>()
        .len()
}

#[derive(Debug, Serialize)]
pub struct OverallStats {
    pub total_cards: usize,
    pub total_correct: i32,
    pub total_wrong: i32,
    pub accuracy_percent: i32,
    pub mastered: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub not_studied: usize,
    pub study_days: usize,
}

pub fn overall(cards: &[Card]) -> OverallStats {
    let total_correct: i32 = cards.iter().map(|c| c.correct_count).sum();
    let total_wrong: i32 = cards.iter().map(|c| c.wrong_count).sum();
    let answered = total_correct + total_wrong;
    let accuracy_percent = if answered == 0 {
        0
    } else {
        (total_correct as f32 * 100.0 / answered as f32).round() as i32
    };

    let mut easy = 0;
    let mut medium = 0;
    let mut hard = 0;
    let mut not_studied = 0;
    for card in cards {
        match difficulty(card) {
            Difficulty::Easy => easy += 1,
            Difficulty::Medium => medium += 1,
            Difficulty::Hard => hard += 1,
            Difficulty::NotStudied => not_studied += 1,
        }
    }

    OverallStats {
        total_cards: cards.len(),
        total_correct,
        total_wrong,
        accuracy_percent,
        mastered: cards.iter().filter(|c| is_mastered(c)).count(),
        easy,
        medium,
        hard,
        not_studied,
        study_days: distinct_study_days(cards),
    }
}
