//! Review and storage error types.
//!
//! Defined here so the session engine can classify failures (user-visible,
//! retryable) without string matching, and so every store backend reports
//! errors in one shape.

use thiserror::Error;

use crate::model::OwnerId;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record to update or delete does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Persisted data could not be decoded into a valid record.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The underlying storage engine failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A lock guarding the backend was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Wrap any backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        StoreError::Backend(Box::new(err))
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Why a session operation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidState {
    /// The owner has no session in progress.
    NoActiveSession,
    /// Every question of the session has been answered.
    AlreadyCompleted,
    /// The session still has unanswered questions.
    NotFinished,
}

impl std::fmt::Display for InvalidState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidState::NoActiveSession => write!(f, "no active session"),
            InvalidState::AlreadyCompleted => write!(f, "session already completed"),
            InvalidState::NotFinished => write!(f, "session has unanswered questions"),
        }
    }
}

/// Why a word was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidWord {
    #[error("original word cannot be empty")]
    EmptyOriginal,
    #[error("translation cannot be empty")]
    EmptyTranslation,
    #[error("{field} is longer than {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Errors surfaced by the review engine.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Nothing is due for this owner.
    #[error("no items available for review (owner {owner})")]
    NoItemsAvailable { owner: OwnerId },

    /// The requested transition is not valid for the owner's session.
    #[error("invalid session state: {0}")]
    InvalidSessionState(InvalidState),

    /// A store read or write failed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),
}

impl ReviewError {
    /// Returns `true` if the caller may retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReviewError::PersistenceFailure(_))
    }

    /// Returns `true` if the error should be shown to the learner as-is.
    pub fn is_user_visible(&self) -> bool {
        !self.is_retryable()
    }
}
