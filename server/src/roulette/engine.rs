//! Random member selection
//!
//! Pure selection logic: validate the requested count, shuffle the roster
//! with an unbiased Fisher-Yates pass, take the first `count` entries. The
//! randomness source is a caller-supplied [`rand::Rng`] so seeded tests can
//! reproduce exact draws.

use rand::Rng;
use thiserror::Error;

use crate::roster::Member;

/// Selection errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection count must be between 1 and {total}, got {count}")]
    InvalidCount { count: usize, total: usize },

    #[error("no members to select from")]
    EmptyRoster,
}

/// Whether `count` winners can be drawn from `total` members.
pub fn validate_count(count: usize, total: usize) -> bool {
    count >= 1 && count <= total
}

/// Draw `count` distinct winners from `roster`, in draw order.
///
/// Validation happens before the rng is touched; an invalid request
/// consumes no randomness.
pub fn select<R>(roster: &[Member], count: usize, rng: &mut R) -> Result<Vec<Member>, SelectionError>
where
    R: Rng + ?Sized,
{
    if !validate_count(count, roster.len()) {
        return Err(SelectionError::InvalidCount {
            count,
            total: roster.len(),
        });
    }

    // Unreachable through validate_count, but selection and validation are
    // independently callable.
    if roster.is_empty() {
        return Err(SelectionError::EmptyRoster);
    }

    let mut pool: Vec<Member> = roster.to_vec();
    shuffle(&mut pool, rng);
    pool.truncate(count);
    Ok(pool)
}

/// Fisher-Yates shuffle: one uniform draw in `[0, i]` per position, swapping
/// from the high end down. Every permutation is equally likely.
pub fn shuffle<T, R>(items: &mut [T], rng: &mut R)
where
    R: Rng + ?Sized,
{
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}
