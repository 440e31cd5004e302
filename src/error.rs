//! Unified error types for the import and planning layers.

use thiserror::Error;

/// Errors raised while recognizing or parsing a statement file.
#[derive(Error, Debug)]
pub enum StatementError {
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("Text decoding failed: {0}")]
    Decode(String),
    #[error("Backup file rejected: {0}")]
    Backup(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by a single template attempt.
///
/// These are expected-failure signals inside the template-try loop, not
/// caller-visible errors: the parser logs them and moves to the next template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("invalid row pattern: {0}")]
    Pattern(String),
    #[error("Zeile {line}: expected {expected} fields, got {got}")]
    FieldCount {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("Zeile {line}: no row pattern matched")]
    RowMismatch { line: usize },
    #[error("Zeile {line}: invalid value for {field}: {value}")]
    BadValue {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Errors raised by the budget planning service and its repository.
#[derive(Error, Debug)]
pub enum PlanningError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Persistence error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for PlanningError {
    fn from(err: rusqlite::Error) -> Self {
        PlanningError::Storage(err.to_string())
    }
}

/// Errors raised by the draft staging and booking services.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Persistence error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}
