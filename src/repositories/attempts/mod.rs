mod commands;
mod queries;
mod types;

use async_trait::async_trait;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AttemptAnswer, PendingAttempt, TestAttempt};

use super::StoreError;

pub(crate) use types::{
    AnswerUpsert, AnswerWrite, ClosedReason, CompletionOutcome, CreateOutcome, Grader,
    NewAttempt,
};

/// Persistence boundary for attempts and their answers.
#[async_trait]
pub(crate) trait AttemptRepository: Send + Sync {
    async fn get_by_id(&self, attempt_id: &str) -> Result<Option<TestAttempt>, StoreError>;

    async fn find_active_attempt(
        &self,
        student_id: &str,
        test_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<TestAttempt>, StoreError>;

    /// Every unsubmitted attempt of the pair, most recent first, with answered counts.
    async fn list_stale_or_completable(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<Vec<PendingAttempt>, StoreError>;

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<CreateOutcome, StoreError>;

    async fn upsert_answer(&self, write: AnswerUpsert) -> Result<AnswerWrite, StoreError>;

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<AttemptAnswer>, StoreError>;

    /// Completes the attempt exactly once. `grade` runs on the answers read under the row
    /// lock; its flags and totals are written in the same transaction.
    async fn mark_completed(
        &self,
        attempt_id: &str,
        submitted_at: PrimitiveDateTime,
        grade: &Grader<'_>,
    ) -> Result<CompletionOutcome, StoreError>;

    async fn list_expired_in_progress(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, StoreError>;

    async fn list_by_student(
        &self,
        student_id: &str,
        test_id: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, StoreError>;

    async fn count_by_student(
        &self,
        student_id: &str,
        test_id: Option<&str>,
    ) -> Result<i64, StoreError>;
}

pub(crate) struct PgAttemptRepository {
    pool: PgPool,
}

impl PgAttemptRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptRepository for PgAttemptRepository {
    async fn get_by_id(&self, attempt_id: &str) -> Result<Option<TestAttempt>, StoreError> {
        Ok(queries::find_by_id(&self.pool, attempt_id).await?)
    }

    async fn find_active_attempt(
        &self,
        student_id: &str,
        test_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<Option<TestAttempt>, StoreError> {
        Ok(queries::find_live(&self.pool, student_id, test_id, now).await?)
    }

    async fn list_stale_or_completable(
        &self,
        student_id: &str,
        test_id: &str,
    ) -> Result<Vec<PendingAttempt>, StoreError> {
        Ok(queries::list_in_progress_with_counts(&self.pool, student_id, test_id).await?)
    }

    async fn create_attempt(&self, attempt: NewAttempt) -> Result<CreateOutcome, StoreError> {
        Ok(commands::create_attempt(&self.pool, attempt).await?)
    }

    async fn upsert_answer(&self, write: AnswerUpsert) -> Result<AnswerWrite, StoreError> {
        Ok(commands::upsert_answer(&self.pool, write).await?)
    }

    async fn list_answers(&self, attempt_id: &str) -> Result<Vec<AttemptAnswer>, StoreError> {
        Ok(queries::list_answers(&self.pool, attempt_id).await?)
    }

    async fn mark_completed(
        &self,
        attempt_id: &str,
        submitted_at: PrimitiveDateTime,
        grade: &Grader<'_>,
    ) -> Result<CompletionOutcome, StoreError> {
        Ok(commands::mark_completed(&self.pool, attempt_id, submitted_at, grade).await?)
    }

    async fn list_expired_in_progress(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, StoreError> {
        Ok(queries::list_expired_in_progress(&self.pool, now, limit).await?)
    }

    async fn list_by_student(
        &self,
        student_id: &str,
        test_id: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<Vec<TestAttempt>, StoreError> {
        Ok(queries::list_by_student(&self.pool, student_id, test_id, skip, limit).await?)
    }

    async fn count_by_student(
        &self,
        student_id: &str,
        test_id: Option<&str>,
    ) -> Result<i64, StoreError> {
        Ok(queries::count_by_student(&self.pool, student_id, test_id).await?)
    }
}
