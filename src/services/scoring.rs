use serde::Serialize;

use crate::db::models::{AttemptAnswer, Question, TestDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum QuestionOutcome {
    Correct,
    Incorrect,
    Skipped,
    NotAutoScored,
}

impl QuestionOutcome {
    /// Value persisted into `attempt_answers.is_correct` at finalize.
    pub(crate) fn stored_flag(self) -> Option<bool> {
        match self {
            Self::Correct => Some(true),
            Self::Incorrect | Self::Skipped => Some(false),
            Self::NotAutoScored => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct QuestionScore {
    pub(crate) question_id: String,
    pub(crate) outcome: QuestionOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreReport {
    pub(crate) correct_count: i32,
    pub(crate) incorrect_count: i32,
    pub(crate) skipped_count: i32,
    pub(crate) score_percent: i32,
    pub(crate) per_question: Vec<QuestionScore>,
}

impl ScoreReport {
    /// Flag to store for an answer row. Rows outside the scored list never count.
    pub(crate) fn flag_for(&self, question_id: &str) -> Option<bool> {
        self.per_question
            .iter()
            .find(|item| item.question_id == question_id)
            .map_or(Some(false), |item| item.outcome.stored_flag())
    }
}

/// Scores an attempt against the test's first `max_questions` questions.
///
/// The denominator is `max_questions` even when the test carries fewer questions, so an
/// under-filled test can never yield 100 for a partial set of answers.
pub(crate) fn score(test: &TestDefinition, answers: &[AttemptAnswer]) -> ScoreReport {
    let mut report = ScoreReport {
        correct_count: 0,
        incorrect_count: 0,
        skipped_count: 0,
        score_percent: 0,
        per_question: Vec::with_capacity(test.scored_questions().len()),
    };

    for question in test.scored_questions() {
        let answer = answers.iter().find(|answer| answer.question_id == question.id);
        let outcome = grade_question(question, answer);

        match outcome {
            QuestionOutcome::Correct => report.correct_count += 1,
            QuestionOutcome::Incorrect => report.incorrect_count += 1,
            QuestionOutcome::Skipped => report.skipped_count += 1,
            QuestionOutcome::NotAutoScored => {}
        }

        report.per_question.push(QuestionScore { question_id: question.id.clone(), outcome });
    }

    report.score_percent = percentage(report.correct_count, test.max_questions);
    report
}

fn grade_question(question: &Question, answer: Option<&AttemptAnswer>) -> QuestionOutcome {
    if !question.question_type.is_auto_scored() {
        return QuestionOutcome::NotAutoScored;
    }

    match answer.and_then(|answer| answer.selected_option_id.as_deref()) {
        None => QuestionOutcome::Skipped,
        Some(option_id) if question.is_correct_option(option_id) => QuestionOutcome::Correct,
        Some(_) => QuestionOutcome::Incorrect,
    }
}

/// Rebuilds an outcome from what finalize stored, without looking at the options again.
pub(crate) fn stored_outcome(question: &Question, answer: Option<&AttemptAnswer>) -> QuestionOutcome {
    if !question.question_type.is_auto_scored() {
        return QuestionOutcome::NotAutoScored;
    }

    match answer {
        Some(answer) if answer.selected_option_id.is_some() => match answer.is_correct {
            Some(true) => QuestionOutcome::Correct,
            Some(false) => QuestionOutcome::Incorrect,
            None => QuestionOutcome::NotAutoScored,
        },
        _ => QuestionOutcome::Skipped,
    }
}

/// `round(100 * correct / total)` with halves rounded up; `0` when there is nothing to score.
pub(crate) fn percentage(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }

    let total = i64::from(total);
    let correct = i64::from(correct).clamp(0, total);
    ((200 * correct + total) / (2 * total)) as i32
}
