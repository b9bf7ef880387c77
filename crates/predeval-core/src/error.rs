use std::fmt;

use thiserror::Error;

/// Fatal outcomes of an evaluation. Non-finite scores are not errors; the
/// extractor drops them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("prediction for row_id {row_id} (0-based) while dataset has only {dataset_size} instances")]
    RowOutOfRange { row_id: usize, dataset_size: usize },

    #[error("prediction count does not match: {0}")]
    CountMismatch(String),

    #[error("invalid split assignment: {0}")]
    InvalidSplits(String),

    #[error("evaluation already aborted by an earlier error")]
    Aborted,
}

/// Coarse classification of [`EvalError`] for callers deciding whether to
/// retry, skip, or record a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Schema,
    RowOutOfRange,
    CountMismatch,
    InvalidSplits,
    Aborted,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Schema => "schema_error",
            ErrorKind::RowOutOfRange => "row_out_of_range",
            ErrorKind::CountMismatch => "count_mismatch",
            ErrorKind::InvalidSplits => "invalid_splits",
            ErrorKind::Aborted => "aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EvalError {
    pub fn schema(msg: impl Into<String>) -> Self {
        EvalError::Schema(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Schema(_) => ErrorKind::Schema,
            EvalError::RowOutOfRange { .. } => ErrorKind::RowOutOfRange,
            EvalError::CountMismatch(_) => ErrorKind::CountMismatch,
            EvalError::InvalidSplits(_) => ErrorKind::InvalidSplits,
            EvalError::Aborted => ErrorKind::Aborted,
        }
    }
}

pub type Result<T, E = EvalError> = std::result::Result<T, E>;
