//! Category board ordering.

use crate::models::{CategorySort, CategoryStanding};
use rand::seq::SliceRandom;
use rand::Rng;
use std::cmp::Ordering;

/// Reorder `board` in place.
pub fn sort_board<R: Rng + ?Sized>(board: &mut [CategoryStanding], sort: CategorySort, rng: &mut R) {
    match sort {
        CategorySort::SuccessRate => board.sort_by(|a, b| {
            b.success_rate
                .total_cmp(&a.success_rate)
                .then_with(|| by_name(a, b))
        }),
        CategorySort::Alphabetical => board.sort_by(by_name),
        CategorySort::Random => board.shuffle(rng),
    }
}

fn by_name(a: &CategoryStanding, b: &CategoryStanding) -> Ordering {
    a.category
        .name
        .to_lowercase()
        .cmp(&b.category.name.to_lowercase())
        .then_with(|| a.category.name.cmp(&b.category.name))
}
