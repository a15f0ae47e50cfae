use rand::Rng;
use rand::seq::SliceRandom;

/// Fisher-Yates shuffle of a slice in place.
pub fn shuffle<T, R: Rng>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}

/// The positions `0..count` as a uniform random permutation.
pub fn shuffled_positions<R: Rng>(count: usize, rng: &mut R) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..count).collect();
    positions.shuffle(rng);
    positions
}
