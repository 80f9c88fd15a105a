//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{ConfigError, Difficulty, QuestionError, QuestionId};
use exam_core::scoring::GradeScaleError;

/// Errors emitted while loading or building a question bank.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question id {0} appears more than once in the bank")]
    DuplicateId(QuestionId),
    #[error("record {index} has the wrong shape: {source}")]
    Shape {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("record {index} is invalid: {source}")]
    Invalid {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error("question bank json is not an array: {0}")]
    Json(#[from] serde_json::Error),
    #[error("remote question bank is not configured")]
    Disabled,
    #[error("question bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by the question selector under `FillPolicy::Strict`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SelectionError {
    #[error("category {category:?} has {available} questions, {requested} requested")]
    InsufficientCategory {
        category: String,
        requested: usize,
        available: usize,
    },
    #[error("{difficulty} pool has {available} questions, {requested} requested")]
    InsufficientDifficulty {
        difficulty: Difficulty,
        requested: usize,
        available: usize,
    },
    #[error("bank has {available} questions, {requested} requested")]
    InsufficientBank { requested: usize, available: usize },
}

/// Errors emitted by exam sessions and the exam runner.
///
/// Rejected user actions (answering after completion, stepping back from the
/// first question) are not errors; they come back as `Outcome::Ignored`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session is not completed yet")]
    NotCompleted,
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    GradeScale(#[from] GradeScaleError),
}
