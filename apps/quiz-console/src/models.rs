//! Data models for the quiz console.

use std::collections::BTreeMap;

/// Storage-assigned identifiers.
pub type UserId = i64;
pub type CategoryId = i64;
pub type QuestionId = i64;

/// A named grouping of questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A category together with the acting player's success rate in it.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStanding {
    pub category: Category,
    /// Percentage of correct answers, 0.0 when nothing was attempted yet.
    pub success_rate: f64,
}

/// How the category board is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySort {
    #[default]
    SuccessRate,
    Alphabetical,
    Random,
}

impl CategorySort {
    pub fn label(&self) -> &'static str {
        match self {
            Self::SuccessRate => "success rate",
            Self::Alphabetical => "alphabetical",
            Self::Random => "random",
        }
    }
}

/// A multiple-choice question as fetched for a quiz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub text: String,
    pub correct_answer: String,
    /// Exactly two wrong options.
    pub incorrect_answers: [String; 2],
}

impl Question {
    /// Correct answer first, then the two incorrect ones.
    pub fn options(&self) -> Vec<String> {
        let mut options = Vec::with_capacity(3);
        options.push(self.correct_answer.clone());
        options.extend(self.incorrect_answers.iter().cloned());
        options
    }
}

/// Input for a question an administrator adds to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub text: String,
    pub correct_answer: String,
    pub incorrect_answers: [String; 2],
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub is_admin: bool,
}

/// Whoever is currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Player {
    /// Unauthenticated; performance is never persisted.
    Guest,
    Member(User),
}

impl Player {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Member(user) if user.is_admin)
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest => None,
            Self::Member(user) => Some(user.id),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Guest => "Guest",
            Self::Member(user) => &user.username,
        }
    }
}

/// Ordered, duplicate-free set of categories chosen for one quiz.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySelection {
    ids: Vec<CategoryId>,
}

impl CategorySelection {
    /// Keeps the first occurrence of each id, in input order.
    pub fn new(ids: impl IntoIterator<Item = CategoryId>) -> Self {
        let mut selection = Self::default();
        for id in ids {
            if !selection.ids.contains(&id) {
                selection.ids.push(id);
            }
        }
        selection
    }

    /// Map 1-based board positions to category ids.
    pub fn from_positions(positions: &[usize], board: &[CategoryStanding]) -> Self {
        Self::new(
            positions
                .iter()
                .filter_map(|&pos| pos.checked_sub(1).and_then(|i| board.get(i)))
                .map(|standing| standing.category.id),
        )
    }

    pub fn ids(&self) -> &[CategoryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Attempted/correct counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub attempted: u32,
    pub correct: u32,
}

impl Tally {
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.correct as f64 * 100.0 / self.attempted as f64
        }
    }
}

/// Running per-category tally for a single quiz session.
///
/// Each graded question adds exactly one attempt to its category, so
/// `correct <= attempted` holds for every entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerformanceRecord {
    entries: BTreeMap<CategoryId, Tally>,
}

impl PerformanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one graded question.
    pub fn record(&mut self, category: CategoryId, correct: bool) {
        let tally = self.entries.entry(category).or_default();
        tally.attempted += 1;
        if correct {
            tally.correct += 1;
        }
    }

    pub fn get(&self, category: CategoryId) -> Option<Tally> {
        self.entries.get(&category).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, Tally)> + '_ {
        self.entries.iter().map(|(id, tally)| (*id, *tally))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_correct(&self) -> u32 {
        self.entries.values().map(|t| t.correct).sum()
    }

    pub fn total_attempted(&self) -> u32 {
        self.entries.values().map(|t| t.attempted).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: CategoryId, name: &str) -> CategoryStanding {
        CategoryStanding {
            category: Category { id, name: name.to_string() },
            success_rate: 0.0,
        }
    }

    #[test]
    fn test_selection_drops_duplicates() {
        let selection = CategorySelection::new([3, 1, 3, 2, 1]);
        assert_eq!(selection.ids(), &[3, 1, 2]);
    }

    #[test]
    fn test_selection_from_positions() {
        let board = vec![standing(10, "History"), standing(20, "Science"), standing(30, "Sport")];
        let selection = CategorySelection::from_positions(&[3, 1, 0, 4], &board);
        assert_eq!(selection.ids(), &[30, 10]);
    }

    #[test]
    fn test_performance_record() {
        let mut record = PerformanceRecord::new();
        record.record(1, true);
        record.record(1, false);
        record.record(2, true);

        assert_eq!(record.get(1), Some(Tally { attempted: 2, correct: 1 }));
        assert_eq!(record.get(2), Some(Tally { attempted: 1, correct: 1 }));
        assert_eq!(record.total_correct(), 2);
        assert_eq!(record.total_attempted(), 3);
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_player_roles() {
        let admin = Player::Member(User { id: 7, username: "root".into(), is_admin: true });
        assert!(admin.is_admin());
        assert_eq!(admin.user_id(), Some(7));
        assert!(Player::Guest.is_guest());
        assert!(!Player::Guest.is_admin());
        assert_eq!(Player::Guest.user_id(), None);
    }

    #[test]
    fn test_tally_success_rate() {
        assert_eq!(Tally::default().success_rate(), 0.0);
        assert_eq!(Tally { attempted: 4, correct: 3 }.success_rate(), 75.0);
    }
}
