pub(crate) mod access;
pub(crate) mod attempts;
pub(crate) mod catalog;
pub(crate) mod health;

use thiserror::Error;

pub(crate) use access::{AccessDirectory, PgAccessDirectory};
pub(crate) use attempts::{AttemptRepository, PgAttemptRepository};
pub(crate) use catalog::{PgQuestionCatalog, QuestionCatalog};

/// Failure of the backing store. Every write path is transactional, so a `StoreError`
/// never leaves partial state behind.
#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
