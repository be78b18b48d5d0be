use thiserror::Error;

use crate::db::models::TestAttempt;
use crate::repositories::StoreError;

pub(crate) const TIME_IS_UP: &str = "Time is up";
pub(crate) const ALREADY_SUBMITTED: &str = "Attempt has already been submitted";

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    InvalidState(String),
    /// Finalize lost the race or was repeated; carries the stored result.
    #[error("attempt {} was already submitted", .0.id)]
    AlreadySubmitted(Box<TestAttempt>),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttemptError {
    pub(crate) fn time_is_up() -> Self {
        Self::InvalidState(TIME_IS_UP.to_string())
    }

    pub(crate) fn already_submitted_state() -> Self {
        Self::InvalidState(ALREADY_SUBMITTED.to_string())
    }
}

