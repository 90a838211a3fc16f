//! Question sampling across the selected categories.
//!
//! The requested total is split evenly; when it does not divide, the
//! categories listed first each take one extra question. Each category
//! contributes at most what it has, and the combined list is shuffled.

use crate::db::QuizStore;
use crate::error::{QuizError, QuizResult};
use crate::models::{CategoryId, CategorySelection, Question};
use rand::seq::SliceRandom;
use rand::Rng;

/// Per-category question counts for `categories` categories.
///
/// The first `total % categories` entries get `total / categories + 1`,
/// the rest get `total / categories`.
pub fn allocate(categories: usize, total: usize) -> Vec<usize> {
    if categories == 0 {
        return Vec::new();
    }
    let base = total / categories;
    let remainder = total % categories;
    (0..categories).map(|i| base + usize::from(i < remainder)).collect()
}

/// Build a shuffled question list for the selection.
///
/// `total` is expected to be already clamped by the caller.
pub fn sample<S, R>(
    store: &S,
    rng: &mut R,
    selection: &CategorySelection,
    total: usize,
) -> QuizResult<QuizPlan>
where
    S: QuizStore + ?Sized,
    R: Rng + ?Sized,
{
    if selection.is_empty() {
        return Err(QuizError::NoCategories);
    }

    let counts = allocate(selection.len(), total);
    let mut questions = Vec::with_capacity(total);

    for (&category, &count) in selection.ids().iter().zip(&counts) {
        if count == 0 {
            continue;
        }
        let fetched = store.fetch_questions(category, count)?;
        if fetched.len() < count {
            tracing::info!(category, requested = count, available = fetched.len(), "category is short of questions");
        }
        questions.extend(fetched.into_iter().take(count));
    }

    questions.shuffle(rng);
    let plan = QuizPlan::new(questions);
    tracing::debug!(requested = total, planned = plan.len(), categories = ?plan.categories(), "built quiz plan");
    Ok(plan)
}

/// Finite, one-shot sequence of questions for a single quiz run.
#[derive(Debug)]
pub struct QuizPlan {
    questions: std::vec::IntoIter<Question>,
}

impl QuizPlan {
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions: questions.into_iter(),
        }
    }

    /// Distinct categories still present in the remaining plan.
    pub fn categories(&self) -> Vec<CategoryId> {
        let mut ids: Vec<_> = self.questions.as_slice().iter().map(|q| q.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl Iterator for QuizPlan {
    type Item = Question;

    fn next(&mut self) -> Option<Question> {
        self.questions.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.questions.size_hint()
    }
}

impl ExactSizeIterator for QuizPlan {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{populated, RecordingStore};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_allocate_remainder_first() {
        assert_eq!(allocate(2, 5), vec![3, 2]);
        assert_eq!(allocate(3, 10), vec![4, 3, 3]);
        assert_eq!(allocate(4, 2), vec![1, 1, 0, 0]);
        assert_eq!(allocate(1, 20), vec![20]);
        assert!(allocate(0, 5).is_empty());
    }

    proptest! {
        #[test]
        fn test_allocation_sums_to_total(categories in 1usize..12, total in 1usize..=20) {
            let counts = allocate(categories, total);
            prop_assert_eq!(counts.len(), categories);
            prop_assert_eq!(counts.iter().sum::<usize>(), total);

            let base = total / categories;
            let extra = total % categories;
            for (i, count) in counts.iter().enumerate() {
                let expected = if i < extra { base + 1 } else { base };
                prop_assert_eq!(*count, expected);
            }
        }
    }

    #[test]
    fn test_sample_two_categories() {
        let db = populated(&[10, 10]);
        let store = RecordingStore::new(&db);
        let mut rng = StdRng::seed_from_u64(5);

        let plan = sample(&store, &mut rng, &CategorySelection::new([1, 2]), 5).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(store.fetches(), vec![(1, 3), (2, 2)]);

        let questions: Vec<_> = plan.collect();
        assert_eq!(questions.iter().filter(|q| q.category_id == 1).count(), 3);
        assert_eq!(questions.iter().filter(|q| q.category_id == 2).count(), 2);
    }

    #[test]
    fn test_sample_order_follows_selection() {
        let db = populated(&[10, 10]);
        let store = RecordingStore::new(&db);
        let mut rng = StdRng::seed_from_u64(5);

        sample(&store, &mut rng, &CategorySelection::new([2, 1]), 5).unwrap();
        assert_eq!(store.fetches(), vec![(2, 3), (1, 2)]);
    }

    #[test]
    fn test_sample_short_category_is_not_padded() {
        let db = populated(&[1, 10]);
        let mut rng = StdRng::seed_from_u64(9);

        let plan = sample(&db, &mut rng, &CategorySelection::new([1, 2]), 6).unwrap();
        let questions: Vec<_> = plan.collect();
        assert_eq!(questions.len(), 4);
        assert_eq!(questions.iter().filter(|q| q.category_id == 1).count(), 1);
        assert_eq!(questions.iter().filter(|q| q.category_id == 2).count(), 3);
    }

    #[test]
    fn test_sample_skips_zero_allocations() {
        let db = populated(&[3, 3, 3]);
        let store = RecordingStore::new(&db);
        let mut rng = StdRng::seed_from_u64(1);

        let plan = sample(&store, &mut rng, &CategorySelection::new([1, 2, 3]), 1).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(store.fetches(), vec![(1, 1)]);
    }

    #[test]
    fn test_sample_requires_categories() {
        let db = populated(&[3]);
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample(&db, &mut rng, &CategorySelection::default(), 5).unwrap_err();
        assert!(matches!(err, QuizError::NoCategories));
    }

    #[test]
    fn test_sample_propagates_storage_errors() {
        let db = populated(&[3, 3]);
        let store = RecordingStore::new(&db).failing_on(2);
        let mut rng = StdRng::seed_from_u64(1);
        let err = sample(&store, &mut rng, &CategorySelection::new([1, 2]), 4).unwrap_err();
        assert!(matches!(err, QuizError::Storage(_)));
    }

    #[test]
    fn test_plan_categories() {
        let db = populated(&[10, 10, 10]);
        let mut rng = StdRng::seed_from_u64(77);
        let plan = sample(&db, &mut rng, &CategorySelection::new([3, 1]), 20).unwrap();
        assert_eq!(plan.categories(), vec![1, 3]);
        assert_eq!(plan.len(), 20);
    }
}
