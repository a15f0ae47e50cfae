use std::collections::VecDeque;

use rand::Rng;

use crate::error::SessionError;
use crate::mistakes::MistakeSet;
use crate::shuffle;

/// A pass over the current mistake set, independent of the study queue.
///
/// The queue is rebuilt lazily from a shuffled copy of the mistake set
/// whenever it is empty and there are mistakes to review; the set itself is
/// never reordered. A correct answer retires the card from both the queue
/// and the set, a wrong answer requeues it at the back and leaves the set
/// alone. Card statistics are not touched in this mode.
#[derive(Debug, Default)]
pub struct ReviewSession {
    queue: VecDeque<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct ReviewOutcome {
    pub completed: bool,
    pub mistakes_left: usize,
}

impl ReviewSession {
    pub fn new() -> Self {
        ReviewSession::default()
    }

    /// Rebuilds the queue when it has run dry and mistakes remain.
    pub fn ensure_queue<R: Rng>(&mut self, mistakes: &MistakeSet, rng: &mut R) {
        if self.queue.is_empty() && !mistakes.is_empty() {
            let mut positions = mistakes.positions().to_vec();
            shuffle::shuffle(&mut positions, rng);
            self.queue = positions.into();
        }
    }

    pub fn current_position(&self) -> Option<usize> {
        self.queue.front().copied()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn submit_answer(
        &mut self,
        mistakes: &mut MistakeSet,
        correct: bool,
    ) -> Result<ReviewOutcome, SessionError> {
        let position = self.queue.pop_front().ok_or(SessionError::EmptyQueue)?;
        if correct {
            mistakes.remove(position);
            if mistakes.is_empty() {
                // Nothing left owed a review; discard the rest of the pass.
                self.queue.clear();
            }
        } else {
            self.queue.push_back(position);
        }
        Ok(ReviewOutcome {
            completed: self.queue.is_empty(),
            mistakes_left: mistakes.len(),
        })
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Same shift contract as the study queue when a card leaves the store.
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
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn queue_builds_from_the_mistake_set() {
        let mut rng = StdRng::seed_from_u64(11);
        let mistakes = MistakeSet::from_positions(vec![5]);
        let mut session = ReviewSession::new();
        session.ensure_queue(&mistakes, &mut rng);
        assert_eq!(session.current_position(), Some(5));
    }

    #[test]
    fn correct_answer_clears_the_mistake() {
        let mut rng = StdRng::seed_from_u64(12);
        let mut mistakes = MistakeSet::from_positions(vec![5]);
        let mut session = ReviewSession::new();
        session.ensure_queue(&mistakes, &mut rng);

        let outcome = session.submit_answer(&mut mistakes, true).unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.mistakes_left, 0);
        assert!(mistakes.is_empty());

        // Nothing left to review: the queue stays empty.
        session.ensure_queue(&mistakes, &mut rng);
        assert_eq!(session.current_position(), None);
    }

    #[test]
    fn wrong_answer_requeues_and_keeps_membership() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut mistakes = MistakeSet::from_positions(vec![2, 7]);
        let mut session = ReviewSession::new();
        session.ensure_queue(&mistakes, &mut rng);

        let front = session.current_position().unwrap();
        let outcome = session.submit_answer(&mut mistakes, false).unwrap();
        assert!(!outcome.completed);
        assert!(mistakes.contains(front));
        assert_eq!(session.remaining(), 2);
        assert_ne!(session.current_position(), Some(front));
    }

    #[test]
    fn emptying_the_set_discards_the_rest_of_the_pass() {
        // The set shrank (a study answer cleared 7) while a pass was live.
        let mut mistakes = MistakeSet::from_positions(vec![2]);
        let mut session = ReviewSession::new();
        session.queue = VecDeque::from(vec![2, 7]);

        let outcome = session.submit_answer(&mut mistakes, true).unwrap();
        assert!(outcome.completed);
        assert_eq!(session.remaining(), 0);
    }

    #[test]
    fn answer_on_empty_queue_is_an_error() {
        let mut mistakes = MistakeSet::new();
        let mut session = ReviewSession::new();
        assert_eq!(
            session.submit_answer(&mut mistakes, true).unwrap_err(),
            SessionError::EmptyQueue
        );
    }

    #[test]
    fn drop_position_shifts_queue_entries() {
        let mut session = ReviewSession::new();
        session.queue = VecDeque::from(vec![1, 4, 6]);
        session.drop_position(4);
        assert_eq!(session.queue, VecDeque::from(vec![1, 5]));
    }
}
