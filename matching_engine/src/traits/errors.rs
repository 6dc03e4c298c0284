use thiserror::Error;

/// The error type shared by every matching engine API and backend.
///
/// The first three variants are caller errors and are always raised before anything is written. `DatabaseError` wraps
/// whatever the backend reported; nothing is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MatchingEngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for MatchingEngineError {
    fn from(e: sqlx::Error) -> Self {
        MatchingEngineError::DatabaseError(e.to_string())
    }
}

impl MatchingEngineError {
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_state<S: Into<String>>(msg: S) -> Self {
        Self::InvalidState(msg.into())
    }
}
