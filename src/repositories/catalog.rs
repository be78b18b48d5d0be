use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use crate::db::models::{Question, QuestionOption, TestDefinition};
use crate::db::types::QuestionType;

use super::StoreError;

/// Read-only view of authored tests. Authoring lives elsewhere.
#[async_trait]
pub(crate) trait QuestionCatalog: Send + Sync {
    async fn find_test(&self, test_id: &str) -> Result<Option<TestDefinition>, StoreError>;
}

pub(crate) struct PgQuestionCatalog {
    pool: PgPool,
}

impl PgQuestionCatalog {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TestRow {
    id: String,
    course_id: String,
    title: String,
    duration_minutes: i32,
    total_marks: i32,
    max_questions: i32,
}

#[derive(FromRow)]
struct QuestionRow {
    id: String,
    question_type: QuestionType,
    prompt: String,
    order_index: i32,
}

#[derive(FromRow)]
struct OptionRow {
    question_id: String,
    #[sqlx(flatten)]
    option: QuestionOption,
}

#[async_trait]
impl QuestionCatalog for PgQuestionCatalog {
    async fn find_test(&self, test_id: &str) -> Result<Option<TestDefinition>, StoreError> {
        let Some(test) = sqlx::query_as::<_, TestRow>(
            "SELECT id, course_id, title, duration_minutes, total_marks, max_questions
             FROM tests WHERE id = $1",
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionRow>(
            "SELECT id, question_type, prompt, order_index
             FROM questions WHERE test_id = $1
             ORDER BY order_index, id",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, OptionRow>(
            "SELECT o.question_id, o.id, o.label, o.is_correct, o.order_index
             FROM question_options o
             JOIN questions q ON q.id = o.question_id
             WHERE q.test_id = $1
             ORDER BY o.order_index, o.id",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<String, Vec<QuestionOption>> = HashMap::new();
        for row in options {
            by_question.entry(row.question_id).or_default().push(row.option);
        }

        let questions = questions
            .into_iter()
            .map(|row| Question {
                options: by_question.remove(&row.id).unwrap_or_default(),
                id: row.id,
                question_type: row.question_type,
                prompt: row.prompt,
                order_index: row.order_index,
            })
            .collect();

        Ok(Some(TestDefinition {
            id: test.id,
            course_id: test.course_id,
            title: test.title,
            duration_minutes: test.duration_minutes,
            total_marks: test.total_marks,
            max_questions: test.max_questions,
            questions,
        }))
    }
}
