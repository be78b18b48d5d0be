use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{AttemptAnswer, TestAttempt};
use crate::db::types::AttemptStatus;

use super::queries;
use super::types::{
    AnswerUpsert, AnswerWrite, ClosedReason, CompletionOutcome, CreateOutcome, Grader,
    NewAttempt, ANSWER_COLUMNS, COLUMNS,
};

/// Inserts a new attempt unless a live one already exists for the pair.
///
/// Creation is serialized per (student, test) with a transaction-scoped advisory lock, so
/// two concurrent starts can never both insert.
pub(crate) async fn create_attempt(
    pool: &PgPool,
    attempt: NewAttempt,
) -> Result<CreateOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let lock_key = format!("test_attempt:{}:{}", attempt.student_id, attempt.test_id);
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(&lock_key)
        .execute(&mut *tx)
        .await?;

    if let Some(existing) =
        queries::find_live(&mut *tx, &attempt.student_id, &attempt.test_id, attempt.started_at)
            .await?
    {
        tx.commit().await?;
        return Ok(CreateOutcome::Existing(existing));
    }

    let created = sqlx::query_as::<_, TestAttempt>(&format!(
        "INSERT INTO test_attempts (
            id, test_id, student_id, status, started_at, expires_at,
            submitted_at, score, correct_answers, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL, NULL, $5, $5)
        RETURNING {COLUMNS}"
    ))
    .bind(&attempt.id)
    .bind(&attempt.test_id)
    .bind(&attempt.student_id)
    .bind(AttemptStatus::InProgress)
    .bind(attempt.started_at)
    .bind(attempt.expires_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(CreateOutcome::Created(created))
}

/// Writes one answer while holding a share lock on the attempt row.
///
/// Finalize takes `FOR UPDATE` on the same row, so an answer either commits before the
/// attempt is completed or observes it as submitted.
pub(crate) async fn upsert_answer(
    pool: &PgPool,
    write: AnswerUpsert,
) -> Result<AnswerWrite, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let gate = sqlx::query_as::<_, (AttemptStatus, Option<PrimitiveDateTime>, PrimitiveDateTime)>(
        "SELECT status, submitted_at, expires_at FROM test_attempts WHERE id = $1 FOR SHARE",
    )
    .bind(&write.attempt_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((status, submitted_at, expires_at)) = gate else {
        return Ok(AnswerWrite::Missing);
    };
    if status == AttemptStatus::Completed || submitted_at.is_some() {
        return Ok(AnswerWrite::Closed(ClosedReason::Submitted));
    }
    if write.answered_at >= expires_at {
        return Ok(AnswerWrite::Closed(ClosedReason::Expired));
    }

    let saved = sqlx::query_as::<_, AttemptAnswer>(&format!(
        "INSERT INTO attempt_answers (
            attempt_id, question_id, selected_option_id, is_correct, answered_at
        )
        VALUES ($1, $2, $3, NULL, $4)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET selected_option_id = EXCLUDED.selected_option_id,
            answered_at = EXCLUDED.answered_at
        RETURNING {ANSWER_COLUMNS}"
    ))
    .bind(&write.attempt_id)
    .bind(&write.question_id)
    .bind(&write.selected_option_id)
    .bind(write.answered_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(AnswerWrite::Saved(saved))
}

/// The finalize transaction: lock, re-check, score, persist flags and result together.
pub(crate) async fn mark_completed(
    pool: &PgPool,
    attempt_id: &str,
    submitted_at: PrimitiveDateTime,
    grade: &Grader<'_>,
) -> Result<CompletionOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let locked = sqlx::query_as::<_, TestAttempt>(&format!(
        "SELECT {COLUMNS} FROM test_attempts WHERE id = $1 FOR UPDATE"
    ))
    .bind(attempt_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(attempt) = locked else {
        return Ok(CompletionOutcome::Missing);
    };
    if attempt.is_submitted() {
        return Ok(CompletionOutcome::AlreadySubmitted(attempt));
    }

    let answers = queries::list_answers(&mut *tx, attempt_id).await?;
    let report = grade(&answers);

    if !answers.is_empty() {
        let question_ids: Vec<String> =
            answers.iter().map(|answer| answer.question_id.clone()).collect();
        let flags: Vec<Option<bool>> =
            answers.iter().map(|answer| report.flag_for(&answer.question_id)).collect();

        sqlx::query(
            "UPDATE attempt_answers AS a
             SET is_correct = v.is_correct
             FROM UNNEST($2::varchar[], $3::bool[]) AS v(question_id, is_correct)
             WHERE a.attempt_id = $1 AND a.question_id = v.question_id",
        )
        .bind(attempt_id)
        .bind(&question_ids)
        .bind(&flags)
        .execute(&mut *tx)
        .await?;
    }

    let completed = sqlx::query_as::<_, TestAttempt>(&format!(
        "UPDATE test_attempts
         SET status = $2,
             submitted_at = $3,
             score = $4,
             correct_answers = $5,
             updated_at = $3
         WHERE id = $1 AND submitted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(attempt_id)
    .bind(AttemptStatus::Completed)
    .bind(submitted_at)
    .bind(report.score_percent)
    .bind(report.correct_count)
    .fetch_optional(&mut *tx)
    .await?;

    match completed {
        Some(attempt) => {
            tx.commit().await?;
            Ok(CompletionOutcome::Completed { attempt, report })
        }
        None => {
            tx.rollback().await?;
            match queries::find_by_id(pool, attempt_id).await? {
                Some(current) => Ok(CompletionOutcome::AlreadySubmitted(current)),
                None => Ok(CompletionOutcome::Missing),
            }
        }
    }
}
