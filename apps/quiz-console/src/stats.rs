//! Persisting session tallies into cumulative per-user stats.

use crate::db::{DbResult, QuizStore};
use crate::models::{CategoryId, PerformanceRecord, Tally, UserId};
use rusqlite::params;
use serde::{Deserialize, Serialize};

const COUNT_STAT: &str =
    "SELECT COUNT(1) FROM user_quiz_stats WHERE user_id = ?1 AND category_id = ?2";

const UPDATE_STAT: &str = "UPDATE user_quiz_stats
     SET questions_attempted = questions_attempted + ?3, correct_answers = correct_answers + ?4
     WHERE user_id = ?1 AND category_id = ?2";

const INSERT_STAT: &str = "INSERT INTO user_quiz_stats
     (user_id, category_id, questions_attempted, correct_answers) VALUES (?1, ?2, ?3, ?4)";

const UPSERT_STAT: &str = "INSERT INTO user_quiz_stats
     (user_id, category_id, questions_attempted, correct_answers) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(user_id, category_id) DO UPDATE SET
        questions_attempted = questions_attempted + excluded.questions_attempted,
        correct_answers = correct_answers + excluded.correct_answers";

/// How a tally is merged into the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// Existence check, then UPDATE or INSERT. Racy if two sessions write
    /// the same (user, category) at once.
    #[default]
    ReadThenWrite,
    /// One `INSERT .. ON CONFLICT DO UPDATE` statement.
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatWrite {
    Inserted,
    Updated,
    Upserted,
}

/// What happened to each category of a flush.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsReport {
    pub written: usize,
    pub failed: Vec<CategoryId>,
}

impl StatsReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Add every tally in `performance` to the user's stored stats.
///
/// Categories are written independently; a failure is logged and the
/// remaining categories are still attempted.
pub fn apply<S>(store: &S, user: UserId, performance: &PerformanceRecord, strategy: UpsertStrategy) -> StatsReport
where
    S: QuizStore + ?Sized,
{
    let mut report = StatsReport::default();

    for (category, delta) in performance.iter() {
        match apply_one(store, user, category, delta, strategy) {
            Ok(Some(write)) => {
                tracing::debug!(user, category, ?write, attempted = delta.attempted, correct = delta.correct, "stats updated");
                report.written += 1;
            }
            Ok(None) => {
                tracing::warn!(user, category, "stats write affected no rows");
                report.failed.push(category);
            }
            Err(e) => {
                tracing::error!(user, category, error = %e, "failed to update stats");
                report.failed.push(category);
            }
        }
    }

    report
}

fn apply_one<S>(
    store: &S,
    user: UserId,
    category: CategoryId,
    delta: Tally,
    strategy: UpsertStrategy,
) -> DbResult<Option<StatWrite>>
where
    S: QuizStore + ?Sized,
{
    let row = params![user, category, delta.attempted, delta.correct];

    let (written, kind) = match strategy {
        UpsertStrategy::Atomic => (store.write_rows(UPSERT_STAT, row)?, StatWrite::Upserted),
        UpsertStrategy::ReadThenWrite => {
            let existing = store.read_scalar(COUNT_STAT, &row[..2])?.unwrap_or(0);
            if existing > 0 {
                (store.write_rows(UPDATE_STAT, row)?, StatWrite::Updated)
            } else {
                (store.write_rows(INSERT_STAT, row)?, StatWrite::Inserted)
            }
        }
    };

    Ok(written.then_some(kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{populated, RecordingStore};
    use crate::db::Database;

    fn user(db: &Database, name: &str) -> UserId {
        db.insert_user(name, "h", "s", false).unwrap();
        db.find_credentials(name).unwrap().unwrap().user.id
    }

    fn record(entries: &[(CategoryId, bool)]) -> PerformanceRecord {
        let mut record = PerformanceRecord::new();
        for (category, correct) in entries {
            record.record(*category, *correct);
        }
        record
    }

    #[test]
    fn test_first_flush_inserts() {
        let db = populated(&[1, 1]);
        let ada = user(&db, "ada");
        let performance = record(&[(1, true), (1, false), (2, true)]);

        let report = apply(&db, ada, &performance, UpsertStrategy::ReadThenWrite);
        assert_eq!(report.written, 2);
        assert!(report.is_complete());
        assert_eq!(db.user_stat(ada, 1).unwrap(), Some(Tally { attempted: 2, correct: 1 }));
        assert_eq!(db.user_stat(ada, 2).unwrap(), Some(Tally { attempted: 1, correct: 1 }));
    }

    #[test]
    fn test_repeat_flush_accumulates() {
        for strategy in [UpsertStrategy::ReadThenWrite, UpsertStrategy::Atomic] {
            let db = populated(&[1]);
            let ada = user(&db, "ada");
            let performance = record(&[(1, true), (1, false), (1, true)]);

            apply(&db, ada, &performance, strategy);
            apply(&db, ada, &performance, strategy);

            assert_eq!(
                db.user_stat(ada, 1).unwrap(),
                Some(Tally { attempted: 6, correct: 4 }),
                "{:?}",
                strategy
            );
        }
    }

    #[test]
    fn test_stats_are_per_user() {
        let db = populated(&[1]);
        let ada = user(&db, "ada");
        let bob = user(&db, "bob");

        apply(&db, ada, &record(&[(1, true)]), UpsertStrategy::ReadThenWrite);
        apply(&db, bob, &record(&[(1, false)]), UpsertStrategy::ReadThenWrite);

        assert_eq!(db.user_stat(ada, 1).unwrap(), Some(Tally { attempted: 1, correct: 1 }));
        assert_eq!(db.user_stat(bob, 1).unwrap(), Some(Tally { attempted: 1, correct: 0 }));
    }

    #[test]
    fn test_one_write_per_category() {
        let db = populated(&[1, 1, 1]);
        let ada = user(&db, "ada");
        let performance = record(&[(1, true), (3, false), (3, true)]);

        let store = RecordingStore::new(&db);
        apply(&store, ada, &performance, UpsertStrategy::ReadThenWrite);
        assert_eq!(store.reads().len(), 2);
        assert_eq!(store.writes().len(), 2);
        assert!(store.writes().iter().all(|sql| sql.starts_with("INSERT")));

        let store = RecordingStore::new(&db);
        apply(&store, ada, &performance, UpsertStrategy::ReadThenWrite);
        assert!(store.writes().iter().all(|sql| sql.starts_with("UPDATE")));

        let store = RecordingStore::new(&db);
        apply(&store, ada, &performance, UpsertStrategy::Atomic);
        assert!(store.reads().is_empty());
        assert_eq!(store.writes().len(), 2);
    }

    #[test]
    fn test_failure_does_not_stop_other_categories() {
        let db = populated(&[1, 1, 1]);
        let ada = user(&db, "ada");
        let performance = record(&[(1, true), (2, true), (3, false)]);

        // Only category 2 carries the id 2 among its bound parameters.
        assert_eq!(ada, 1);
        let store = RecordingStore::new(&db).failing_on(2);
        let report = apply(&store, ada, &performance, UpsertStrategy::ReadThenWrite);

        assert_eq!(report.written, 2);
        assert_eq!(report.failed, vec![2]);
        assert!(db.user_stat(ada, 1).unwrap().is_some());
        assert!(db.user_stat(ada, 2).unwrap().is_none());
        assert!(db.user_stat(ada, 3).unwrap().is_some());
    }

    #[test]
    fn test_empty_record_writes_nothing() {
        let db = populated(&[1]);
        let ada = user(&db, "ada");
        let store = RecordingStore::new(&db);
        let report = apply(&store, ada, &PerformanceRecord::new(), UpsertStrategy::Atomic);
        assert_eq!(report, StatsReport::default());
        assert!(store.writes().is_empty());
    }
}
