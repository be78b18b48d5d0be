use std::collections::HashMap;
use std::sync::Arc;

use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{AttemptAnswer, Question, TestAttempt, TestDefinition, User};
use crate::db::types::{AttemptStatus, UserRole};
use crate::repositories::attempts::{CompletionOutcome, CreateOutcome, NewAttempt};
use crate::repositories::{AccessDirectory, AttemptRepository, QuestionCatalog};
use crate::services::attempt_error::AttemptError;
use crate::services::expiry;
use crate::services::scoring::{self, QuestionScore};

/// Who asked for an attempt to be finalized. Only used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeTrigger {
    Manual,
    CleanupOnStart,
    LazyExpiry,
    Sweep,
}

impl FinalizeTrigger {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::CleanupOnStart => "cleanup_on_start",
            Self::LazyExpiry => "lazy_expiry",
            Self::Sweep => "sweep",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: TestAttempt,
    pub(crate) resumed: bool,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct FinalizedAttempt {
    pub(crate) attempt: TestAttempt,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct ActiveAttempt {
    pub(crate) attempt: TestAttempt,
    pub(crate) answered_count: i64,
    pub(crate) max_questions: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct QuestionView {
    pub(crate) attempt: TestAttempt,
    pub(crate) index: usize,
    pub(crate) question: Option<Question>,
    pub(crate) selected_option_id: Option<String>,
    pub(crate) answered_count: i64,
    pub(crate) max_questions: i32,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Clone)]
pub(crate) enum AttemptView {
    InProgress(QuestionView),
    Completed { attempt: TestAttempt, max_questions: i32 },
}

#[derive(Debug, Clone)]
pub(crate) struct AttemptResult {
    pub(crate) attempt: TestAttempt,
    pub(crate) max_questions: i32,
    pub(crate) questions: Vec<QuestionScore>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SweepReport {
    pub(crate) finalized: usize,
    pub(crate) already_submitted: usize,
}

/// The attempt state machine: start or resume, lazy expiry, and the single finalize path.
#[derive(Clone)]
pub(crate) struct AttemptLifecycle {
    attempts: Arc<dyn AttemptRepository>,
    catalog: Arc<dyn QuestionCatalog>,
    access: Arc<dyn AccessDirectory>,
}

impl AttemptLifecycle {
    pub(crate) fn new(
        attempts: Arc<dyn AttemptRepository>,
        catalog: Arc<dyn QuestionCatalog>,
        access: Arc<dyn AccessDirectory>,
    ) -> Self {
        Self { attempts, catalog, access }
    }

    /// Resumes the live attempt for `(student, test)` or creates one.
    ///
    /// Leftover in-progress attempts that expired, that already carry an answer for
    /// every question, or that are older than the live one being resumed are finalized
    /// on the way.
    pub(crate) async fn start(
        &self,
        student: &User,
        test_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<StartedAttempt, AttemptError> {
        let test = self.load_test(test_id).await?;
        self.ensure_can_take(student, &test).await?;

        let pending = self.attempts.list_stale_or_completable(&student.id, &test.id).await?;
        let mut resumable: Option<TestAttempt> = None;
        for candidate in pending {
            let expired = expiry::is_expired(candidate.attempt.expires_at, now);
            let fully_answered = test.max_questions > 0
                && candidate.answered_count >= i64::from(test.max_questions);

            // Only the most recent live attempt survives; older live duplicates are closed too.
            if expired || fully_answered || resumable.is_some() {
                self.complete_leftover(&candidate.attempt, &test, now).await?;
                continue;
            }
            resumable = Some(candidate.attempt);
        }

        if let Some(attempt) = resumable {
            tracing::info!(
                attempt_id = %attempt.id,
                student_id = %student.id,
                test_id = %test.id,
                "Resuming attempt"
            );
            metrics::counter!("attempts_resumed_total").increment(1);
            return Ok(StartedAttempt { attempt, resumed: true, max_questions: test.max_questions });
        }

        let new_attempt = NewAttempt {
            id: Uuid::new_v4().to_string(),
            test_id: test.id.clone(),
            student_id: student.id.clone(),
            started_at: now,
            expires_at: expiry::expires_at(now, test.duration_minutes),
        };

        match self.attempts.create_attempt(new_attempt).await? {
            CreateOutcome::Created(attempt) => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    student_id = %student.id,
                    test_id = %test.id,
                    expires_at = %attempt.expires_at,
                    "Attempt started"
                );
                metrics::counter!("attempts_started_total").increment(1);
                Ok(StartedAttempt { attempt, resumed: false, max_questions: test.max_questions })
            }
            CreateOutcome::Existing(attempt) => {
                metrics::counter!("attempts_resumed_total").increment(1);
                Ok(StartedAttempt { attempt, resumed: true, max_questions: test.max_questions })
            }
        }
    }

    /// Live attempt of the student for the test, without creating or finalizing anything.
    pub(crate) async fn active(
        &self,
        student_id: &str,
        test_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<ActiveAttempt, AttemptError> {
        let test = self.load_test(test_id).await?;
        let attempt = self
            .attempts
            .find_active_attempt(student_id, &test.id, now)
            .await?
            .ok_or(AttemptError::NotFound("Active attempt"))?;
        let answered_count = self.answered_count(&attempt.id).await?;

        Ok(ActiveAttempt { attempt, answered_count, max_questions: test.max_questions })
    }

    /// The one finalize entry point for requests that name an attempt.
    ///
    /// Returns `AttemptError::AlreadySubmitted` with the stored row when the attempt was
    /// completed before this call got the lock.
    pub(crate) async fn finalize(
        &self,
        student_id: &str,
        attempt_id: &str,
        trigger: FinalizeTrigger,
        now: PrimitiveDateTime,
    ) -> Result<FinalizedAttempt, AttemptError> {
        let attempt = self.owned_attempt(student_id, attempt_id).await?;
        if attempt.is_submitted() {
            return Err(AttemptError::AlreadySubmitted(Box::new(attempt)));
        }

        let test = self.load_test(&attempt.test_id).await?;
        self.complete(&attempt, &test, trigger, now).await
    }

    /// Explicit submit. A repeated or losing submit reads back the stored result.
    pub(crate) async fn submit(
        &self,
        student_id: &str,
        attempt_id: &str,
        now: PrimitiveDateTime,
    ) -> Result<FinalizedAttempt, AttemptError> {
        match self.finalize(student_id, attempt_id, FinalizeTrigger::Manual, now).await {
            Err(AttemptError::AlreadySubmitted(stored)) => {
                let test = self.load_test(&stored.test_id).await?;
                Ok(FinalizedAttempt { attempt: *stored, max_questions: test.max_questions })
            }
            other => other,
        }
    }

    /// Current question for an in-progress attempt, or the result once it is completed.
    ///
    /// Reading an expired attempt finalizes it first.
    pub(crate) async fn view(
        &self,
        student_id: &str,
        attempt_id: &str,
        index: Option<usize>,
        now: PrimitiveDateTime,
    ) -> Result<AttemptView, AttemptError> {
        let attempt = self.owned_attempt(student_id, attempt_id).await?;
        let test = self.load_test(&attempt.test_id).await?;

        if attempt.is_submitted() {
            return Ok(AttemptView::Completed { attempt, max_questions: test.max_questions });
        }

        if expiry::is_expired(attempt.expires_at, now) {
            let attempt = match self.complete(&attempt, &test, FinalizeTrigger::LazyExpiry, now).await
            {
                Ok(finalized) => finalized.attempt,
                Err(AttemptError::AlreadySubmitted(stored)) => *stored,
                Err(err) => return Err(err),
            };
            return Ok(AttemptView::Completed { attempt, max_questions: test.max_questions });
        }

        let answers = self.attempts.list_answers(&attempt.id).await?;
        let questions = test.scored_questions();
        let selected: HashMap<&str, &str> = answers
            .iter()
            .filter_map(|answer| {
                answer
                    .selected_option_id
                    .as_deref()
                    .map(|option_id| (answer.question_id.as_str(), option_id))
            })
            .collect();

        let index = match index {
            Some(index) if index >= questions.len().max(1) => {
                return Err(AttemptError::Validation(format!(
                    "Question index {index} is out of range"
                )));
            }
            Some(index) => index,
            None => questions
                .iter()
                .position(|question| !selected.contains_key(question.id.as_str()))
                .unwrap_or_else(|| questions.len().saturating_sub(1)),
        };

        let question = questions.get(index).cloned();
        let selected_option_id = question
            .as_ref()
            .and_then(|question| selected.get(question.id.as_str()))
            .map(|option_id| option_id.to_string());

        Ok(AttemptView::InProgress(QuestionView {
            remaining_seconds: expiry::remaining_seconds(attempt.expires_at, now),
            answered_count: selected.len() as i64,
            max_questions: test.max_questions,
            attempt,
            index,
            question,
            selected_option_id,
        }))
    }

    /// Per-question breakdown of a completed attempt, read from the stored flags.
    pub(crate) async fn result(
        &self,
        student_id: &str,
        attempt_id: &str,
    ) -> Result<AttemptResult, AttemptError> {
        let attempt = self.owned_attempt(student_id, attempt_id).await?;
        if !attempt.is_submitted() {
            return Err(AttemptError::InvalidState(
                "Attempt has not been submitted yet".to_string(),
            ));
        }

        let test = self.load_test(&attempt.test_id).await?;
        let answers = self.attempts.list_answers(&attempt.id).await?;
        let questions = test
            .scored_questions()
            .iter()
            .map(|question| {
                let answer = answers.iter().find(|answer| answer.question_id == question.id);
                QuestionScore {
                    question_id: question.id.clone(),
                    outcome: scoring::stored_outcome(question, answer),
                }
            })
            .collect();

        Ok(AttemptResult { attempt, max_questions: test.max_questions, questions })
    }

    pub(crate) async fn history(
        &self,
        student_id: &str,
        test_id: Option<&str>,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<TestAttempt>, i64), AttemptError> {
        let items = self.attempts.list_by_student(student_id, test_id, skip, limit).await?;
        let total = self.attempts.count_by_student(student_id, test_id).await?;
        Ok((items, total))
    }

    /// Finalizes up to `limit` in-progress attempts whose window has closed.
    pub(crate) async fn sweep_expired(
        &self,
        now: PrimitiveDateTime,
        limit: i64,
    ) -> Result<SweepReport, AttemptError> {
        let expired = self.attempts.list_expired_in_progress(now, limit).await?;
        let mut tests: HashMap<String, TestDefinition> = HashMap::new();
        let mut report = SweepReport::default();

        for attempt in expired {
            if !tests.contains_key(&attempt.test_id) {
                let test = self.load_test(&attempt.test_id).await?;
                tests.insert(test.id.clone(), test);
            }
            let Some(test) = tests.get(&attempt.test_id) else {
                continue;
            };

            match self.complete(&attempt, test, FinalizeTrigger::Sweep, now).await {
                Ok(_) => report.finalized += 1,
                Err(AttemptError::AlreadySubmitted(_)) => report.already_submitted += 1,
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    async fn complete(
        &self,
        attempt: &TestAttempt,
        test: &TestDefinition,
        trigger: FinalizeTrigger,
        now: PrimitiveDateTime,
    ) -> Result<FinalizedAttempt, AttemptError> {
        let grade = |answers: &[AttemptAnswer]| scoring::score(test, answers);

        match self.attempts.mark_completed(&attempt.id, now, &grade).await? {
            CompletionOutcome::Completed { attempt, report } => {
                tracing::info!(
                    attempt_id = %attempt.id,
                    student_id = %attempt.student_id,
                    test_id = %attempt.test_id,
                    trigger = trigger.as_str(),
                    score = report.score_percent,
                    correct = report.correct_count,
                    incorrect = report.incorrect_count,
                    skipped = report.skipped_count,
                    "Attempt finalized"
                );
                metrics::counter!("attempts_finalized_total", "trigger" => trigger.as_str())
                    .increment(1);
                Ok(FinalizedAttempt { attempt, max_questions: test.max_questions })
            }
            CompletionOutcome::AlreadySubmitted(stored) => {
                tracing::debug!(
                    attempt_id = %stored.id,
                    trigger = trigger.as_str(),
                    "Finalize found attempt already submitted"
                );
                metrics::counter!("attempt_finalize_conflicts_total").increment(1);
                Err(AttemptError::AlreadySubmitted(Box::new(stored)))
            }
            CompletionOutcome::Missing => Err(AttemptError::NotFound("Attempt")),
        }
    }

    async fn complete_leftover(
        &self,
        attempt: &TestAttempt,
        test: &TestDefinition,
        now: PrimitiveDateTime,
    ) -> Result<(), AttemptError> {
        match self.complete(attempt, test, FinalizeTrigger::CleanupOnStart, now).await {
            Ok(_) | Err(AttemptError::AlreadySubmitted(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn ensure_can_take(&self, student: &User, test: &TestDefinition) -> Result<(), AttemptError> {
        if !student.is_active || student.role != UserRole::Student {
            return Err(AttemptError::Unauthorized("Only active students can take tests".to_string()));
        }
        if !self.access.is_enrolled(&student.id, &test.course_id).await? {
            return Err(AttemptError::Unauthorized(
                "Student is not enrolled in this course".to_string(),
            ));
        }
        Ok(())
    }

    async fn owned_attempt(
        &self,
        student_id: &str,
        attempt_id: &str,
    ) -> Result<TestAttempt, AttemptError> {
        self.attempts
            .get_by_id(attempt_id)
            .await?
            .filter(|attempt| attempt.student_id == student_id)
            .ok_or(AttemptError::NotFound("Attempt"))
    }

    async fn load_test(&self, test_id: &str) -> Result<TestDefinition, AttemptError> {
        self.catalog.find_test(test_id).await?.ok_or(AttemptError::NotFound("Test"))
    }

    async fn answered_count(&self, attempt_id: &str) -> Result<i64, AttemptError> {
        let answers = self.attempts.list_answers(attempt_id).await?;
        Ok(answers.iter().filter(|answer| answer.selected_option_id.is_some()).count() as i64)
    }
}

impl AttemptView {
    pub(crate) fn status(&self) -> AttemptStatus {
        match self {
            Self::InProgress(view) => view.attempt.status,
            Self::Completed { .. } => AttemptStatus::Completed,
        }
    }
}
