use chrono::NaiveDateTime;
use rand::Rng;

use crate::error::SessionError;
use crate::mistakes::MistakeSet;
use crate::model::{Card, NewCard};
use crate::quiz::{QuizOutcome, QuizQuestion, QuizReport, QuizSession};
use crate::review::{ReviewOutcome, ReviewSession};
use crate::srs;
use crate::store::{Snapshot, StudyProgress};
use crate::study::{StudyOutcome, StudySession, StudySummary};

/// The scheduling core. Owns the card collection, the mistake set and the
/// three session queues; one instance per running service, constructed from
/// a persisted snapshot. Callers are expected to serialize access; no
/// locking happens here.
pub struct FlashcardApp {
    cards: Vec<Card>,
    mistakes: MistakeSet,
    study: StudySession,
    review: ReviewSession,
    quiz: QuizSession,
    next_card_id: i32,
}

impl FlashcardApp {
    /// Restores the scheduler from persisted state. A stored study queue
    /// that no longer matches the card collection (or was never stored) is
    /// replaced by a fresh shuffle; a finished (empty) queue also
    /// reshuffles so a returning session starts a new pass.
    pub fn from_snapshot<R: Rng>(snapshot: Snapshot, rng: &mut R) -> Self {
        let card_count = snapshot.cards.len();
        let mistakes = MistakeSet::from_positions(
            snapshot
                .mistakes
                .into_iter()
                .filter(|&p| p < card_count)
                .collect(),
        );

        let mut study = StudySession::new(snapshot.best_streak);
        match snapshot.progress {
            Some(progress)
                if !progress.study_queue.is_empty()
                    && queue_is_valid(&progress.study_queue, card_count) =>
            {
                study.resume(progress.study_queue);
            }
            Some(progress) => {
                if !progress.study_queue.is_empty() {
                    log::warn!("Stored study queue does not match the card collection, reshuffling");
                }
                study.initialize(card_count, rng);
            }
            None => study.initialize(card_count, rng),
        }

        FlashcardApp {
            cards: snapshot.cards,
            mistakes,
            study,
            review: ReviewSession::new(),
            quiz: QuizSession::idle(),
            next_card_id: snapshot.next_card_id.max(1),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn card(&self, position: usize) -> Option<&Card> {
        self.cards.get(position)
    }

    pub fn mistakes(&self) -> &MistakeSet {
        &self.mistakes
    }

    pub fn study(&self) -> &StudySession {
        &self.study
    }

    pub fn quiz(&self) -> &QuizSession {
        &self.quiz
    }

    pub fn study_summary(&self) -> StudySummary {
        self.study.summary(&self.mistakes)
    }

    pub fn study_progress(&self) -> StudyProgress {
        StudyProgress {
            current_index_hint: self.cards.len().saturating_sub(self.study.remaining()),
            study_queue: self.study.queue_snapshot(),
        }
    }

    pub fn next_card_id(&self) -> i32 {
        self.next_card_id
    }

    pub fn study_answer(
        &mut self,
        correct: bool,
        now: NaiveDateTime,
    ) -> Result<StudyOutcome, SessionError> {
        let outcome = self
            .study
            .submit_answer(&mut self.cards, &mut self.mistakes, correct, now)?;
        if self.mistakes.is_empty() {
            // A study answer can clear the last mistake out from under a
            // live review pass.
            self.review.clear();
        }
        Ok(outcome)
    }

    /// The card up for review, rebuilding the review queue from the mistake
    /// set when needed. `None` means there is nothing to review.
    pub fn current_review_position<R: Rng>(&mut self, rng: &mut R) -> Option<usize> {
        if self.mistakes.is_empty() {
            self.review.clear();
            return None;
        }
        self.review.ensure_queue(&self.mistakes, rng);
        self.review.current_position()
    }

    pub fn review_remaining(&self) -> usize {
        self.review.remaining()
    }

    pub fn review_answer(&mut self, correct: bool) -> Result<ReviewOutcome, SessionError> {
        self.review.submit_answer(&mut self.mistakes, correct)
    }

    pub fn start_quiz<R: Rng>(&mut self, rng: &mut R) -> usize {
        self.quiz = QuizSession::new(self.cards.len(), rng);
        self.cards.len()
    }

    pub fn quiz_question<R: Rng>(&self, rng: &mut R) -> Option<QuizQuestion> {
        self.quiz.current_question(&self.cards, rng)
    }

    pub fn quiz_answer(&mut self, selected_correct: bool) -> Result<QuizOutcome, SessionError> {
        self.quiz.submit_answer(selected_correct)
    }

    pub fn quiz_report(&self) -> QuizReport {
        self.quiz.report()
    }

    /// Appends every well-formed card and reshuffles the study queue so the
    /// newcomers join the current pass. Returns (created, skipped).
    pub fn add_cards<R: Rng>(&mut self, inputs: Vec<NewCard>, rng: &mut R) -> (usize, usize) {
        let mut created = 0;
        let mut skipped = 0;
        for input in inputs {
            if !input.is_well_formed() {
                skipped += 1;
                continue;
            }
            self.cards.push(Card::new(self.next_card_id, input));
            self.next_card_id += 1;
            created += 1;
        }
        if created > 0 {
            self.study.initialize(self.cards.len(), rng);
        }
        (created, skipped)
    }

    /// Removes the card at `position` and re-indexes the mistake set and
    /// every queue: the position is dropped everywhere and every tracked
    /// position above it shifts down by one.
    pub fn delete_card(&mut self, position: usize) -> Option<Card> {
        if position >= self.cards.len() {
            return None;
        }
        let removed = self.cards.remove(position);
        self.mistakes.drop_position(position);
        self.study.drop_position(position);
        self.review.drop_position(position);
        self.quiz.drop_position(position);
        if self.mistakes.is_empty() {
            self.review.clear();
        }
        Some(removed)
    }

    /// Applies one quality-scored review to a card's spaced-repetition
    /// fields. Queue membership is unaffected.
    pub fn rate_card(&mut self, position: usize, quality: i32, now: NaiveDateTime) -> Option<&Card> {
        let card = self.cards.get_mut(position)?;
        let update = srs::next_review(card.ease_factor, card.interval_days, quality, now);
        card.ease_factor = update.ease_factor;
        card.interval_days = update.interval_days;
        card.next_review_at = Some(update.next_review_at);
        Some(&self.cards[position])
    }

    /// Zeroes every card's statistics, empties the mistake set and starts a
    /// fresh study pass. Cards and the best streak survive.
    pub fn reset_progress<R: Rng>(&mut self, rng: &mut R) {
        for card in &mut self.cards {
            card.reset_statistics();
        }
        self.mistakes.clear();
        self.review.clear();
        self.quiz = QuizSession::idle();
        self.study.reset_session_counters();
        self.study.initialize(self.cards.len(), rng);
    }

    /// Drops everything, the best streak included.
    pub fn clear_all(&mut self) {
        self.cards.clear();
        self.mistakes.clear();
        self.review.clear();
        self.quiz = QuizSession::idle();
        self.study = StudySession::new(0);
        self.next_card_id = 1;
    }
}

/// A restorable queue holds each position at most once, all in range.
fn queue_is_valid(queue: &[usize], card_count: usize) -> bool {
    let mut seen = vec![false; card_count];
    queue
        .iter()
        .all(|&p| p < card_count && !std::mem::replace(&mut seen[p], true))
}
