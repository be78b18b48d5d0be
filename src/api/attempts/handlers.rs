use axum::{
    extract::{Path, Query, State},
    Json,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::api::pagination::PaginatedResponse;
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::schemas::attempt::{
    ActiveAttemptResponse, AttemptQuestionResponse, AttemptResultResponse, AttemptStateResponse,
    AttemptSummaryResponse, AttemptViewQuery, CompletedAttemptResponse, ListAttemptsQuery,
    SaveAnswerRequest, SaveAnswerResponse, StartAttemptResponse, SubmitAttemptResponse,
};
use crate::services::attempt_lifecycle::AttemptView;
use crate::services::expiry;

pub(super) async fn start_attempt(
    Path(test_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    let now = primitive_now_utc();
    let started = state.lifecycle().start(&student, &test_id, now).await?;
    let attempt = started.attempt;

    Ok(Json(StartAttemptResponse {
        remaining_seconds: expiry::remaining_seconds(attempt.expires_at, now),
        started_at: format_primitive(attempt.started_at),
        expires_at: format_primitive(attempt.expires_at),
        attempt_id: attempt.id,
        resumed: started.resumed,
        max_questions: started.max_questions,
    }))
}

pub(super) async fn get_active_attempt(
    Path(test_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<ActiveAttemptResponse>, ApiError> {
    let now = primitive_now_utc();
    let active = state.lifecycle().active(&student.id, &test_id, now).await?;
    let attempt = active.attempt;

    Ok(Json(ActiveAttemptResponse {
        remaining_seconds: expiry::remaining_seconds(attempt.expires_at, now),
        started_at: format_primitive(attempt.started_at),
        expires_at: format_primitive(attempt.expires_at),
        attempt_id: attempt.id,
        answered_count: active.answered_count,
        max_questions: active.max_questions,
    }))
}

/// Rate-limit bucket scoped to the caller and the attempt.
pub(super) fn answer_rate_key(student_id: &str, attempt_id: &str) -> String {
    format!("rate:answers:{student_id}:{attempt_id}")
}

pub(super) async fn save_answer(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SaveAnswerRequest>,
) -> Result<Json<SaveAnswerResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let limits = state.settings().attempts();
    let allowed = state
        .redis()
        .rate_limit(
            &answer_rate_key(&student.id, &attempt_id),
            limits.answer_rate_limit,
            limits.answer_rate_window_seconds,
        )
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, attempt_id = %attempt_id, "Answer rate limit check failed");
            true
        });
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many answer saves, slow down"));
    }

    let answer = state
        .answer_store()
        .save_answer(
            &student.id,
            &attempt_id,
            &payload.question_id,
            payload.selected_option_id.as_deref(),
            primitive_now_utc(),
        )
        .await?;

    Ok(Json(SaveAnswerResponse { saved: true, answered_at: format_primitive(answer.answered_at) }))
}

pub(super) async fn get_attempt(
    Path(attempt_id): Path<String>,
    Query(params): Query<AttemptViewQuery>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptStateResponse>, ApiError> {
    let view = state
        .lifecycle()
        .view(&student.id, &attempt_id, params.index, primitive_now_utc())
        .await?;
    let status = view.status();

    let response = match view {
        AttemptView::InProgress(view) => AttemptStateResponse::InProgress(AttemptQuestionResponse {
            attempt_id: view.attempt.id,
            status,
            index: view.index,
            question: view.question.map(Into::into),
            selected_option_id: view.selected_option_id,
            remaining_seconds: view.remaining_seconds,
            answered_count: view.answered_count,
            max_questions: view.max_questions,
        }),
        AttemptView::Completed { attempt, max_questions } => {
            AttemptStateResponse::Completed(CompletedAttemptResponse {
                status,
                result: SubmitAttemptResponse::from_attempt(&attempt, max_questions),
            })
        }
    };

    Ok(Json(response))
}

pub(super) async fn submit_attempt(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    let finalized =
        state.lifecycle().submit(&student.id, &attempt_id, primitive_now_utc()).await?;

    Ok(Json(SubmitAttemptResponse::from_attempt(&finalized.attempt, finalized.max_questions)))
}

pub(super) async fn get_attempt_result(
    Path(attempt_id): Path<String>,
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptResultResponse>, ApiError> {
    let result = state.lifecycle().result(&student.id, &attempt_id).await?;

    Ok(Json(AttemptResultResponse {
        result: SubmitAttemptResponse::from_attempt(&result.attempt, result.max_questions),
        questions: result.questions,
    }))
}

pub(super) async fn list_attempts(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
    Query(params): Query<ListAttemptsQuery>,
) -> Result<Json<PaginatedResponse<AttemptSummaryResponse>>, ApiError> {
    let skip = params.skip.max(0);
    let limit = params.limit.clamp(1, 1000);

    let (items, total_count) = state
        .lifecycle()
        .history(&student.id, params.test_id.as_deref(), skip, limit)
        .await?;

    Ok(Json(PaginatedResponse {
        items: items.into_iter().map(Into::into).collect(),
        total_count,
        skip,
        limit,
    }))
}
