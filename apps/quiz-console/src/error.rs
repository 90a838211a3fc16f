//! Quiz error types.

use crate::db::DbError;
use thiserror::Error;

/// Errors that abort a quiz session.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The caller selected no categories.
    #[error("At least one category must be selected")]
    NoCategories,

    /// None of the selected categories had questions to ask.
    #[error("No questions available in the selected categories")]
    NoQuestions,

    /// Storage failure while building the question list.
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

/// Result type for quiz operations.
pub type QuizResult<T> = Result<T, QuizError>;
