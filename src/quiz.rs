use std::collections::VecDeque;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::SessionError;
use crate::model::Card;
use crate::shuffle;

/// A timed multiple-choice test: one shuffled pass over every card, no
/// requeueing. Wrong answers only count against the aggregate score.
#[derive(Debug, Default)]
pub struct QuizSession {
    queue: VecDeque<usize>,
    correct: i32,
    wrong: i32,
}

#[derive(Debug, Serialize)]
pub struct QuizOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Serialize)]
pub struct QuizQuestion {
    pub position: usize,
    pub card_id: i32,
    pub prompt: String,
    pub media_ref: Option<String>,
    pub options: Vec<QuizOption>,
}

#[derive(Debug, Clone, Copy)]
pub struct QuizOutcome {
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct QuizReport {
    pub correct: i32,
    pub total: i32,
    pub accuracy_percent: i32,
}

impl QuizSession {
    /// An empty session; answering is an error until `new` builds a real one.
    pub fn idle() -> Self {
        QuizSession::default()
    }

    /// A fresh test over `card_count` cards with zeroed counters.
    pub fn new<R: Rng>(card_count: usize, rng: &mut R) -> Self {
        QuizSession {
            queue: shuffle::shuffled_positions(card_count, rng).into(),
            correct: 0,
            wrong: 0,
        }
    }

    pub fn current_position(&self) -> Option<usize> {
        self.queue.front().copied()
    }

    pub fn is_complete(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn answered(&self) -> i32 {
        self.correct + self.wrong
    }

    /// The front card's prompt with a generated option set: its own response
    /// plus up to three responses of other cards drawn without replacement,
    /// in shuffled presentation order. Duplicate response texts are kept
    /// as-is.
    pub fn current_question<R: Rng>(&self, cards: &[Card], rng: &mut R) -> Option<QuizQuestion> {
        let position = self.current_position()?;
        let card = cards.get(position)?;

        let others: Vec<usize> = (0..cards.len()).filter(|&p| p != position).collect();
        let mut options = vec![QuizOption {
            text: card.response.clone(),
            is_correct: true,
        }];
        options.extend(others.choose_multiple(rng, 3).map(|&p| QuizOption {
            text: cards[p].response.clone(),
            is_correct: false,
        }));
        options.shuffle(rng);

        Some(QuizQuestion {
            position,
            card_id: card.card_id,
            prompt: card.prompt.clone(),
            media_ref: card.media_ref.clone(),
            options,
        })
    }

    /// Pops the front card for good and books the outcome to the counters.
    pub fn submit_answer(&mut self, selected_correct: bool) -> Result<QuizOutcome, SessionError> {
        self.queue.pop_front().ok_or(SessionError::EmptyQueue)?;
        if selected_correct {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
        Ok(QuizOutcome {
            completed: self.queue.is_empty(),
        })
    }

    pub fn report(&self) -> QuizReport {
        let answered = self.answered();
        let accuracy_percent = if answered == 0 {
            0
        } else {
            (self.correct as f32 * 100.0 / answered as f32).round() as i32
        };
        QuizReport {
            correct: self.correct,
            total: answered + self.queue.len() as i32,
            accuracy_percent,
        }
    }

    /// Same shift contract as the other queues when a card leaves the store.
    pub fn drop_position(&mut self, removed: usize) {
        self.queue.retain(|&p| p != removed);
        for p in self.queue.iter_mut() {
            if *p > removed {
                *p -= 1;
            }
        }
    }
}
