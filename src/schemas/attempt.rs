use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::pagination::default_limit;
use crate::core::time::format_primitive;
use crate::db::models::{Question, TestAttempt};
use crate::db::types::{AttemptStatus, QuestionType};
use crate::services::scoring::QuestionScore;

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) started_at: String,
    pub(crate) resumed: bool,
    pub(crate) expires_at: String,
    pub(crate) remaining_seconds: i64,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActiveAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) remaining_seconds: i64,
    pub(crate) answered_count: i64,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SaveAnswerRequest {
    #[validate(length(min = 1, max = 36))]
    pub(crate) question_id: String,
    /// `null` clears the current selection.
    #[serde(default)]
    #[validate(length(min = 1, max = 36))]
    pub(crate) selected_option_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAnswerResponse {
    pub(crate) saved: bool,
    pub(crate) answered_at: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptViewQuery {
    pub(crate) index: Option<usize>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OptionPayload {
    pub(crate) id: String,
    pub(crate) label: String,
}

/// A question as shown to the student: no correctness flags.
#[derive(Debug, Serialize)]
pub(crate) struct QuestionPayload {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) options: Vec<OptionPayload>,
}

impl From<Question> for QuestionPayload {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            question_type: question.question_type,
            prompt: question.prompt,
            options: question
                .options
                .into_iter()
                .map(|option| OptionPayload { id: option.id, label: option.label })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptQuestionResponse {
    pub(crate) attempt_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) index: usize,
    pub(crate) question: Option<QuestionPayload>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) remaining_seconds: i64,
    pub(crate) answered_count: i64,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) attempt_id: String,
    pub(crate) score: i32,
    pub(crate) correct_answers: i32,
    pub(crate) max_questions: i32,
    pub(crate) submitted_at: Option<String>,
}

impl SubmitAttemptResponse {
    pub(crate) fn from_attempt(attempt: &TestAttempt, max_questions: i32) -> Self {
        Self {
            attempt_id: attempt.id.clone(),
            score: attempt.score.unwrap_or_default(),
            correct_answers: attempt.correct_answers.unwrap_or_default(),
            max_questions,
            submitted_at: attempt.submitted_at.map(format_primitive),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletedAttemptResponse {
    pub(crate) status: AttemptStatus,
    #[serde(flatten)]
    pub(crate) result: SubmitAttemptResponse,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum AttemptStateResponse {
    InProgress(AttemptQuestionResponse),
    Completed(CompletedAttemptResponse),
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResultResponse {
    #[serde(flatten)]
    pub(crate) result: SubmitAttemptResponse,
    pub(crate) questions: Vec<QuestionScore>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListAttemptsQuery {
    pub(crate) test_id: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptSummaryResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: String,
    pub(crate) expires_at: String,
    pub(crate) submitted_at: Option<String>,
    pub(crate) score: Option<i32>,
    pub(crate) correct_answers: Option<i32>,
}

impl From<TestAttempt> for AttemptSummaryResponse {
    fn from(attempt: TestAttempt) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            status: attempt.status,
            started_at: format_primitive(attempt.started_at),
            expires_at: format_primitive(attempt.expires_at),
            submitted_at: attempt.submitted_at.map(format_primitive),
            score: attempt.score,
            correct_answers: attempt.correct_answers,
        }
    }
}
