use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{AttemptStatus, QuestionType, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A test as the catalog hands it out: metadata plus its ordered questions.
#[derive(Debug, Clone)]
pub(crate) struct TestDefinition {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) max_questions: i32,
    pub(crate) questions: Vec<Question>,
}

impl TestDefinition {
    /// The questions that count towards completion and the score, in display order.
    pub(crate) fn scored_questions(&self) -> &[Question] {
        let limit = usize::try_from(self.max_questions.max(0)).unwrap_or(0);
        &self.questions[..self.questions.len().min(limit)]
    }

    pub(crate) fn find_question(&self, question_id: &str) -> Option<&Question> {
        self.scored_questions().iter().find(|question| question.id == question_id)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) question_type: QuestionType,
    pub(crate) prompt: String,
    pub(crate) order_index: i32,
    pub(crate) options: Vec<QuestionOption>,
}

impl Question {
    pub(crate) fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|option| option.id == option_id)
    }

    pub(crate) fn is_correct_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|option| option.is_correct && option.id == option_id)
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionOption {
    pub(crate) id: String,
    pub(crate) label: String,
    pub(crate) is_correct: bool,
    pub(crate) order_index: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestAttempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) status: AttemptStatus,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) score: Option<i32>,
    pub(crate) correct_answers: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl TestAttempt {
    pub(crate) fn is_submitted(&self) -> bool {
        self.submitted_at.is_some() || self.status == AttemptStatus::Completed
    }
}

/// An in-progress attempt together with how many questions already carry a selection.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct PendingAttempt {
    #[sqlx(flatten)]
    pub(crate) attempt: TestAttempt,
    pub(crate) answered_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptAnswer {
    pub(crate) attempt_id: String,
    pub(crate) question_id: String,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) answered_at: PrimitiveDateTime,
}
