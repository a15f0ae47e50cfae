use std::collections::VecDeque;

use chrono::NaiveDateTime;
use rand::Rng;
use serde::Serialize;

use crate::error::SessionError;
use crate::mistakes::MistakeSet;
use crate::model::Card;
use crate::shuffle;

/// One pass-with-retry session over the whole card collection.
///
/// The queue starts as a shuffled permutation of every store position. A
/// correct answer retires the front card; a wrong answer sends it to the
/// back of the same queue, so it comes around again after everything else
/// currently queued. The session is complete when the queue is empty.
#[derive(Debug)]
pub struct StudySession {
    // Invariant: every queued position indexes an existing card, at most once.
    queue: VecDeque<usize>,
    current_streak: i32,
    best_streak: i32,
    session_correct: i32,
    session_wrong: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct StudyOutcome {
    pub current_streak: i32,
    pub best_streak: i32,
    pub new_best: bool,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct StudySummary {
    pub correct: i32,
    pub wrong: i32,
    pub accuracy_percent: i32,
    pub mistakes_outstanding: usize,
}

impl StudySession {
    pub fn new(best_streak: i32) -> Self {
        StudySession {
            queue: VecDeque::new(),
            current_streak: 0,
            best_streak,
            session_correct: 0,
            session_wrong: 0,
        }
    }

    /// Rebuilds the queue as a fresh permutation of all `card_count`
    /// positions and resets the running streak. The best streak and the
    /// session counters are untouched.
    pub fn initialize<R: Rng>(&mut self, card_count: usize, rng: &mut R) {
        self.queue = shuffle::shuffled_positions(card_count, rng).into();
        self.current_streak = 0;
    }

    /// Adopts a queue restored from persisted state.
    pub fn resume(&mut self, queue: Vec<usize>) {
        self.queue = queue.into();
        self.current_streak = 0;
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

    pub fn queue_snapshot(&self) -> Vec<usize> {
        self.queue.iter().copied().collect()
    }

    pub fn current_streak(&self) -> i32 {
        self.current_streak
    }

    pub fn best_streak(&self) -> i32 {
        self.best_streak
    }

    pub fn session_correct(&self) -> i32 {
        self.session_correct
    }

    pub fn session_wrong(&self) -> i32 {
        self.session_wrong
    }

    pub fn reset_session_counters(&mut self) {
        self.session_correct = 0;
        self.session_wrong = 0;
    }

    /// Resolves the front card. Correct retires it, bumps the card's
    /// correct count and the streak, and clears it from the mistake set.
    /// Wrong bumps the wrong count, zeroes the streak, records the mistake
    /// and requeues the card at the back.
    pub fn submit_answer(
        &mut self,
        cards: &mut [Card],
        mistakes: &mut MistakeSet,
        correct: bool,
        now: NaiveDateTime,
    ) -> Result<StudyOutcome, SessionError> {
        let position = self.queue.pop_front().ok_or(SessionError::EmptyQueue)?;
        let card = &mut cards[position];
        card.last_answered_at = Some(now);

        let mut new_best = false;
        if correct {
            card.correct_count += 1;
            self.session_correct += 1;
            self.current_streak += 1;
            if self.current_streak > self.best_streak {
                self.best_streak = self.current_streak;
                new_best = true;
            }
            mistakes.remove(position);
        } else {
            card.wrong_count += 1;
            self.session_wrong += 1;
            self.current_streak = 0;
            mistakes.insert(position);
            self.queue.push_back(position);
        }

        Ok(StudyOutcome {
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            new_best,
            completed: self.queue.is_empty(),
        })
    }

    /// Accuracy is over every answer given this session, not per card.
    pub fn summary(&self, mistakes: &MistakeSet) -> StudySummary {
        let total = self.session_correct + self.session_wrong;
        let accuracy_percent = if total == 0 {
            0
        } else {
            (self.session_correct as f32 * 100.0 / total as f32).round() as i32
        };
        StudySummary {
            correct: self.session_correct,
            wrong: self.session_wrong,
            accuracy_percent,
            mistakes_outstanding: mistakes.len(),
        }
    }

    /// Card `removed` left the store: drop it from the queue and shift
    /// every queued position above it down by one.
    pub fn drop_position(&mut self, removed: usize) {
        self.queue.retain(|&p| p != removed);
        for p in self.queue.iter_mut() {
            if *p > removed {
                *p -= 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewCard;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cards(n: usize) -> Vec<Card> {
        (0..n)
            .map(|i| {
                Card::new(
                    i as i32 + 1,
                    NewCard {
                        prompt: format!("q{}", i),
                        response: format!("a{}", i),
                        media_ref: None,
                    },
                )
            })
            .collect()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn initialize_builds_a_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = StudySession::new(0);
        session.initialize(5, &mut rng);
        let mut queued = session.queue_snapshot();
        queued.sort_unstable();
        assert_eq!(queued, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn empty_collection_is_complete_immediately() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut session = StudySession::new(0);
        session.initialize(0, &mut rng);
        assert!(session.is_complete());
        assert_eq!(session.current_position(), None);
    }

    #[test]
    fn all_correct_drains_in_exactly_n_answers() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut deck = cards(4);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(0);
        session.initialize(deck.len(), &mut rng);

        for n in 0..4 {
            assert!(!session.is_complete());
            let outcome = session
                .submit_answer(&mut deck, &mut mistakes, true, now())
                .unwrap();
            assert_eq!(outcome.completed, n == 3);
        }
        assert!(session.is_complete());
        assert_eq!(session.session_correct(), 4);
    }

    #[test]
    fn wrong_answer_requeues_at_the_back() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut deck = cards(3);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(0);
        session.initialize(deck.len(), &mut rng);

        let front = session.current_position().unwrap();
        session
            .submit_answer(&mut deck, &mut mistakes, false, now())
            .unwrap();

        assert_eq!(session.remaining(), 3);
        assert_eq!(session.queue_snapshot().last(), Some(&front));
        assert!(mistakes.contains(front));
        assert_eq!(deck[front].wrong_count, 1);
    }

    #[test]
    fn failed_card_is_never_dropped_until_answered_correctly() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut deck = cards(3);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(0);
        session.initialize(deck.len(), &mut rng);

        let victim = session.current_position().unwrap();
        // Fail it, then answer everything else correctly; the failed card
        // must come back within the remaining queue length.
        session
            .submit_answer(&mut deck, &mut mistakes, false, now())
            .unwrap();
        let mut pops = 0;
        while session.current_position() != Some(victim) {
            session
                .submit_answer(&mut deck, &mut mistakes, true, now())
                .unwrap();
            pops += 1;
            assert!(pops <= 2, "failed card did not come around");
        }
        session
            .submit_answer(&mut deck, &mut mistakes, true, now())
            .unwrap();
        assert!(session.is_complete());
        assert!(!mistakes.contains(victim));
    }

    #[test]
    fn streak_tracks_corrects_and_resets_on_wrong() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut deck = cards(3);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(1);
        session.initialize(deck.len(), &mut rng);

        let first = session
            .submit_answer(&mut deck, &mut mistakes, true, now())
            .unwrap();
        assert_eq!(first.current_streak, 1);
        assert!(!first.new_best);

        let second = session
            .submit_answer(&mut deck, &mut mistakes, true, now())
            .unwrap();
        assert_eq!(second.current_streak, 2);
        assert!(second.new_best);
        assert_eq!(second.best_streak, 2);

        let third = session
            .submit_answer(&mut deck, &mut mistakes, false, now())
            .unwrap();
        assert_eq!(third.current_streak, 0);
        assert_eq!(third.best_streak, 2);
    }

    #[test]
    fn two_card_session_with_one_miss() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut deck = cards(2);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(0);
        session.initialize(deck.len(), &mut rng);

        let first = session.current_position().unwrap();
        session
            .submit_answer(&mut deck, &mut mistakes, false, now())
            .unwrap();
        assert_eq!(session.current_streak(), 0);
        assert_eq!(session.remaining(), 2);
        assert!(mistakes.contains(first));

        let outcome = session
            .submit_answer(&mut deck, &mut mistakes, true, now())
            .unwrap();
        assert_eq!(outcome.current_streak, 1);
        assert_eq!(session.remaining(), 1);

        let last = session
            .submit_answer(&mut deck, &mut mistakes, true, now())
            .unwrap();
        assert!(last.completed);

        // Three answers given, one wrong: 2/3 rounds to 67.
        let summary = session.summary(&mistakes);
        assert_eq!(summary.correct, 2);
        assert_eq!(summary.wrong, 1);
        assert_eq!(summary.accuracy_percent, 67);
        assert_eq!(summary.mistakes_outstanding, 0);
    }

    #[test]
    fn answer_on_empty_queue_is_an_error_and_mutates_nothing() {
        let mut deck = cards(2);
        let mut mistakes = MistakeSet::new();
        let mut session = StudySession::new(0);

        let result = session.submit_answer(&mut deck, &mut mistakes, true, now());
        assert_eq!(result.unwrap_err(), SessionError::EmptyQueue);
        assert_eq!(session.session_correct(), 0);
        assert!(deck.iter().all(|c| c.total_answers() == 0));
    }

    #[test]
    fn summary_accuracy_is_zero_without_answers() {
        let session = StudySession::new(0);
        assert_eq!(session.summary(&MistakeSet::new()).accuracy_percent, 0);
    }

    #[test]
    fn drop_position_shifts_queue_entries() {
        let mut session = StudySession::new(0);
        session.resume(vec![3, 0, 2, 1]);
        session.drop_position(2);
        assert_eq!(session.queue_snapshot(), vec![2, 0, 1]);
    }
}
