use time::PrimitiveDateTime;

use crate::db::models::{AttemptAnswer, TestAttempt};
use crate::services::scoring::ScoreReport;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, status, started_at, expires_at, submitted_at, \
    score, correct_answers, created_at, updated_at";

pub(crate) const ANSWER_COLUMNS: &str =
    "attempt_id, question_id, selected_option_id, is_correct, answered_at";

#[derive(Debug, Clone)]
pub(crate) struct NewAttempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
}

#[derive(Debug, Clone)]
pub(crate) enum CreateOutcome {
    Created(TestAttempt),
    /// A live attempt for the same (student, test) won the race; nothing was inserted.
    Existing(TestAttempt),
}

#[derive(Debug, Clone)]
pub(crate) struct AnswerUpsert {
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) answered_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClosedReason {
    Submitted,
    Expired,
}

#[derive(Debug, Clone)]
pub(crate) enum AnswerWrite {
    Saved(AttemptAnswer),
    Closed(ClosedReason),
    Missing,
}

#[derive(Debug, Clone)]
pub(crate) enum CompletionOutcome {
    Completed { attempt: TestAttempt, report: ScoreReport },
    AlreadySubmitted(TestAttempt),
    Missing,
}

/// Scores the answers read inside the finalize transaction.
pub(crate) type Grader<'a> = dyn Fn(&[AttemptAnswer]) -> ScoreReport + Send + Sync + 'a;
