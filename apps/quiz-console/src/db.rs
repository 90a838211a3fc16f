//! Database operations for the quiz console.

use crate::models::{
    Category, CategoryId, CategoryStanding, NewQuestion, Question, QuestionId, Tally, User, UserId,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult, ToSql};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    Invalid(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Parameterized storage access the quiz engine depends on.
pub trait QuizStore {
    /// Up to `limit` questions of `category`, in random order.
    fn fetch_questions(&self, category: CategoryId, limit: usize) -> DbResult<Vec<Question>>;

    /// Single-value lookup; `None` when the query yields no row or NULL.
    fn read_scalar(&self, sql: &str, params: &[&dyn ToSql]) -> DbResult<Option<i64>>;

    /// Insert/update; `true` when at least one row was affected.
    fn write_rows(&self, sql: &str, params: &[&dyn ToSql]) -> DbResult<bool>;
}

/// Stored login data for one account.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
    pub salt: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> DbResult<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                salt TEXT NOT NULL,
                is_admin INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS questions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                question_text TEXT NOT NULL,
                correct_answer TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS incorrect_answers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL REFERENCES questions(id),
                answer_text TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_quiz_stats (
                user_id INTEGER NOT NULL REFERENCES users(id),
                category_id INTEGER NOT NULL REFERENCES categories(id),
                questions_attempted INTEGER NOT NULL DEFAULT 0,
                correct_answers INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, category_id)
            );

            CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category_id);
            CREATE INDEX IF NOT EXISTS idx_incorrect_question ON incorrect_answers(question_id);
            "#,
        )?;
        Ok(())
    }

    // Category operations

    pub fn list_categories(&self) -> DbResult<Vec<Category>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
        let categories = stmt
            .query_map([], parse_category_row)?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(categories)
    }

    /// Every category with the user's success rate, best first.
    ///
    /// `None` (a guest) reports 0% everywhere.
    pub fn category_standings(&self, user: Option<UserId>) -> DbResult<Vec<CategoryStanding>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.name,
                CASE WHEN s.questions_attempted > 0
                     THEN s.correct_answers * 100.0 / s.questions_attempted
                     ELSE 0.0 END AS success_rate
             FROM categories c
             LEFT JOIN user_quiz_stats s ON c.id = s.category_id AND s.user_id = ?1
             ORDER BY success_rate DESC, c.name COLLATE NOCASE",
        )?;

        let standings = stmt
            .query_map(params![user], |row| {
                Ok(CategoryStanding {
                    category: parse_category_row(row)?,
                    success_rate: row.get(2)?,
                })
            })?
            .collect::<SqlResult<Vec<_>>>()?;
        Ok(standings)
    }

    pub fn category_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn category_id_by_name(&self, name: &str) -> DbResult<Option<CategoryId>> {
        let id = self
            .conn
            .query_row("SELECT id FROM categories WHERE name = ?1", params![name], |row| row.get(0))
            .optional()?;
        Ok(id)
    }

    /// Returns `false` when a category with that name already exists.
    pub fn add_category(&self, name: &str) -> DbResult<bool> {
        if self.category_exists(name)? {
            return Ok(false);
        }
        let inserted = self
            .conn
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(inserted > 0)
    }

    /// Returns `false` when the id is unknown or the new name is taken.
    pub fn rename_category(&self, id: CategoryId, new_name: &str) -> DbResult<bool> {
        if let Some(existing) = self.category_id_by_name(new_name)? {
            return Ok(existing == id);
        }
        let updated = self.conn.execute(
            "UPDATE categories SET name = ?2 WHERE id = ?1",
            params![id, new_name],
        )?;
        Ok(updated > 0)
    }

    /// Removes the category along with its questions and stats rows.
    pub fn delete_category(&self, id: CategoryId) -> DbResult<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM incorrect_answers WHERE question_id IN (SELECT id FROM questions WHERE category_id = ?1)",
            params![id],
        )?;
        tx.execute("DELETE FROM questions WHERE category_id = ?1", params![id])?;
        tx.execute("DELETE FROM user_quiz_stats WHERE category_id = ?1", params![id])?;
        let deleted = tx.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(deleted > 0)
    }

    // Question operations

    pub fn add_question(&self, category: CategoryId, question: &NewQuestion) -> DbResult<QuestionId> {
        let known: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE id = ?1",
            params![category],
            |row| row.get(0),
        )?;
        if known == 0 {
            return Err(DbError::NotFound(format!("category {}", category)));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO questions (category_id, question_text, correct_answer) VALUES (?1, ?2, ?3)",
            params![category, question.text, question.correct_answer],
        )?;
        let question_id = tx.last_insert_rowid();
        for answer in &question.incorrect_answers {
            tx.execute(
                "INSERT INTO incorrect_answers (question_id, answer_text) VALUES (?1, ?2)",
                params![question_id, answer],
            )?;
        }
        tx.commit()?;
        Ok(question_id)
    }

    pub fn question_count(&self, category: CategoryId) -> DbResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM questions WHERE category_id = ?1",
            params![category],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn incorrect_answers(&self, question: QuestionId) -> DbResult<[String; 2]> {
        let mut stmt = self.conn.prepare(
            "SELECT answer_text FROM incorrect_answers WHERE question_id = ?1 ORDER BY id LIMIT 2",
        )?;
        let answers = stmt
            .query_map(params![question], |row| row.get::<_, String>(0))?
            .collect::<SqlResult<Vec<_>>>()?;
        <[String; 2]>::try_from(answers).map_err(|found| {
            DbError::Invalid(format!(
                "question {} has {} incorrect answers, expected 2",
                question,
                found.len()
            ))
        })
    }

    // User operations

    /// Returns `false` when the username is already registered.
    pub fn insert_user(
        &self,
        username: &str,
        password_hash: &str,
        salt: &str,
        is_admin: bool,
    ) -> DbResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO users (username, password_hash, salt, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, password_hash, salt, is_admin, Utc::now().to_rfc3339()],
        )?;
        Ok(inserted > 0)
    }

    pub fn find_credentials(&self, username: &str) -> DbResult<Option<StoredCredentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, password_hash, salt FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(StoredCredentials {
                        user: User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            is_admin: row.get(2)?,
                        },
                        password_hash: row.get(3)?,
                        salt: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    // Statistics

    pub fn user_stat(&self, user: UserId, category: CategoryId) -> DbResult<Option<Tally>> {
        let tally = self
            .conn
            .query_row(
                "SELECT questions_attempted, correct_answers FROM user_quiz_stats
                 WHERE user_id = ?1 AND category_id = ?2",
                params![user, category],
                |row| {
                    Ok(Tally {
                        attempted: row.get(0)?,
                        correct: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(tally)
    }

    /// Fill an empty database with the starter question bank.
    ///
    /// Returns the number of questions inserted.
    pub fn seed_sample_questions(&self) -> DbResult<usize> {
        let existing: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(0);
        }

        let mut inserted = 0;
        for (name, questions) in crate::seed::SAMPLE_BANK {
            self.add_category(name)?;
            let id = self
                .category_id_by_name(name)?
                .ok_or_else(|| DbError::NotFound(format!("category {}", name)))?;
            for (text, correct, wrong_a, wrong_b) in questions.iter() {
                self.add_question(
                    id,
                    &NewQuestion {
                        text: text.to_string(),
                        correct_answer: correct.to_string(),
                        incorrect_answers: [wrong_a.to_string(), wrong_b.to_string()],
                    },
                )?;
                inserted += 1;
            }
        }
        tracing::info!(questions = inserted, "seeded sample question bank");
        Ok(inserted)
    }
}

impl QuizStore for Database {
    fn fetch_questions(&self, category: CategoryId, limit: usize) -> DbResult<Vec<Question>> {
        let mut stmt = self.conn.prepare(
            "SELECT q.id, q.category_id, q.question_text, q.correct_answer FROM questions q
             WHERE q.category_id = ?1
               AND (SELECT COUNT(*) FROM incorrect_answers a WHERE a.question_id = q.id) >= 2
             ORDER BY RANDOM()
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![category, limit as i64], |row| {
                Ok((
                    row.get::<_, QuestionId>(0)?,
                    row.get::<_, CategoryId>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        let mut questions = Vec::with_capacity(rows.len());
        for (id, category_id, text, correct_answer) in rows {
            questions.push(Question {
                id,
                category_id,
                text,
                correct_answer,
                incorrect_answers: self.incorrect_answers(id)?,
            });
        }

        tracing::debug!(category, limit, fetched = questions.len(), "fetched questions");
        Ok(questions)
    }

    fn read_scalar(&self, sql: &str, params: &[&dyn ToSql]) -> DbResult<Option<i64>> {
        let value = self
            .conn
            .query_row(sql, params, |row| row.get::<_, Option<i64>>(0))
            .optional()?;
        Ok(value.flatten())
    }

    fn write_rows(&self, sql: &str, params: &[&dyn ToSql]) -> DbResult<bool> {
        let affected = self.conn.execute(sql, params)?;
        Ok(affected > 0)
    }
}

fn parse_category_row(row: &rusqlite::Row) -> SqlResult<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
