use sqlx::{PgPool, Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::{AttemptAnswer, PendingAttempt, TestAttempt};
use crate::db::types::AttemptStatus;

use super::types::{ANSWER_COLUMNS, COLUMNS};

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!("SELECT {COLUMNS} FROM test_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Most recent in-progress attempt of the pair whose window is still open.
pub(crate) async fn find_live(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    test_id: &str,
    now: PrimitiveDateTime,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts \
         WHERE student_id = $1 AND test_id = $2 AND status = $3 \
           AND submitted_at IS NULL AND expires_at > $4 \
         ORDER BY started_at DESC \
         LIMIT 1"
    ))
    .bind(student_id)
    .bind(test_id)
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_in_progress_with_counts(
    pool: &PgPool,
    student_id: &str,
    test_id: &str,
) -> Result<Vec<PendingAttempt>, sqlx::Error> {
    sqlx::query_as::<_, PendingAttempt>(&format!(
        "SELECT {COLUMNS}, \
            (SELECT COUNT(*) FROM attempt_answers \
             WHERE attempt_answers.attempt_id = test_attempts.id \
               AND attempt_answers.selected_option_id IS NOT NULL) AS answered_count \
         FROM test_attempts \
         WHERE student_id = $1 AND test_id = $2 AND status = $3 AND submitted_at IS NULL \
         ORDER BY started_at DESC"
    ))
    .bind(student_id)
    .bind(test_id)
    .bind(AttemptStatus::InProgress)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_answers(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AttemptAnswer>, sqlx::Error> {
    sqlx::query_as::<_, AttemptAnswer>(&format!(
        "SELECT {ANSWER_COLUMNS} FROM attempt_answers \
         WHERE attempt_id = $1 \
         ORDER BY answered_at, question_id"
    ))
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_expired_in_progress(
    pool: &PgPool,
    now: PrimitiveDateTime,
    limit: i64,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts \
         WHERE status = $1 AND submitted_at IS NULL AND expires_at <= $2 \
         ORDER BY expires_at \
         LIMIT $3"
    ))
    .bind(AttemptStatus::InProgress)
    .bind(now)
    .bind(limit.clamp(1, 10_000))
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_by_student(
    pool: &PgPool,
    student_id: &str,
    test_id: Option<&str>,
    skip: i64,
    limit: i64,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM test_attempts WHERE student_id = "
    ));
    builder.push_bind(student_id);

    if let Some(test_id) = test_id {
        builder.push(" AND test_id = ");
        builder.push_bind(test_id);
    }

    builder.push(" ORDER BY started_at DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<TestAttempt>().fetch_all(pool).await
}

pub(crate) async fn count_by_student(
    pool: &PgPool,
    student_id: &str,
    test_id: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM test_attempts WHERE student_id = ");
    builder.push_bind(student_id);

    if let Some(test_id) = test_id {
        builder.push(" AND test_id = ");
        builder.push_bind(test_id);
    }

    builder.build_query_scalar::<i64>().fetch_one(pool).await
}
