use std::sync::Arc;

use time::PrimitiveDateTime;

use crate::db::models::AttemptAnswer;
use crate::repositories::attempts::{AnswerUpsert, AnswerWrite, ClosedReason};
use crate::repositories::{AttemptRepository, QuestionCatalog};
use crate::services::attempt_error::AttemptError;
use crate::services::expiry;

/// Per-question answer writes for in-progress attempts.
#[derive(Clone)]
pub(crate) struct AnswerStore {
    attempts: Arc<dyn AttemptRepository>,
    catalog: Arc<dyn QuestionCatalog>,
}

impl AnswerStore {
    pub(crate) fn new(attempts: Arc<dyn AttemptRepository>, catalog: Arc<dyn QuestionCatalog>) -> Self {
        Self { attempts, catalog }
    }

    /// Upserts the selection for one question. `None` clears it.
    pub(crate) async fn save_answer(
        &self,
        student_id: &str,
        attempt_id: &str,
        question_id: &str,
        selected_option_id: Option<&str>,
        now: PrimitiveDateTime,
    ) -> Result<AttemptAnswer, AttemptError> {
        let attempt = self
            .attempts
            .get_by_id(attempt_id)
            .await?
            .filter(|attempt| attempt.student_id == student_id)
            .ok_or(AttemptError::NotFound("Attempt"))?;

        if attempt.is_submitted() {
            return Err(AttemptError::already_submitted_state());
        }
        if expiry::is_expired(attempt.expires_at, now) {
            return Err(AttemptError::time_is_up());
        }

        let test = self
            .catalog
            .find_test(&attempt.test_id)
            .await?
            .ok_or(AttemptError::NotFound("Test"))?;
        let question = test.find_question(question_id).ok_or(AttemptError::NotFound("Question"))?;

        if let Some(option_id) = selected_option_id {
            if !question.has_option(option_id) {
                return Err(AttemptError::Validation(
                    "Selected option does not belong to this question".to_string(),
                ));
            }
        }

        let write = AnswerUpsert {
            attempt_id: attempt.id.clone(),
            question_id: question.id.clone(),
            selected_option_id: selected_option_id.map(str::to_string),
            answered_at: now,
        };

        match self.attempts.upsert_answer(write).await? {
            AnswerWrite::Saved(answer) => {
                metrics::counter!("attempt_answers_saved_total").increment(1);
                Ok(answer)
            }
            AnswerWrite::Closed(ClosedReason::Submitted) => {
                Err(AttemptError::already_submitted_state())
            }
            AnswerWrite::Closed(ClosedReason::Expired) => Err(AttemptError::time_is_up()),
            AnswerWrite::Missing => Err(AttemptError::NotFound("Attempt")),
        }
    }
}
