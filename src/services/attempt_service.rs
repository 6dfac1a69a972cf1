use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::dto::attempt_dto::UpsertAnswerRequest;
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::assessment::{Assessment, AssessmentKind, OwnerType};
use crate::models::attempt::{Attempt, AttemptStatus};
use crate::services::grading_service::GradingService;
use crate::services::metrics_service::MetricsService;
use crate::services::progress_service::{ProgressService, PropagationOutcome};
use crate::store::{AttemptPatch, AttemptStore, CatalogStore};

/// Governs the attempt lifecycle: in_progress -> submitted | expired,
/// both terminal. Expiry is detected lazily on access, never by a
/// background timer.
#[derive(Clone)]
pub struct AttemptService {
    catalog: Arc<dyn CatalogStore>,
    attempts: Arc<dyn AttemptStore>,
    progress: ProgressService,
    metrics: MetricsService,
}

#[derive(Debug, Clone, Copy)]
pub struct AttemptSummary {
    pub total_questions: usize,
    pub correct: usize,
}

impl AttemptService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        attempts: Arc<dyn AttemptStore>,
        progress: ProgressService,
        metrics: MetricsService,
    ) -> Self {
        Self {
            catalog,
            attempts,
            progress,
            metrics,
        }
    }

    pub async fn start_attempt(&self, user_id: Uuid, assessment_id: Uuid) -> Result<Attempt> {
        let assessment = self.catalog.get_assessment(assessment_id).await?;

        if let Some(max_attempts) = assessment.max_attempts {
            if max_attempts > 0 {
                // Every prior attempt counts, expired ones included.
                let used = self.attempts.count_attempts(assessment_id, user_id).await?;
                if used >= i64::from(max_attempts) {
                    return Err(Error::LimitExceeded(format!(
                        "Assessment allows at most {} attempts",
                        max_attempts
                    )));
                }
            }
        }

        let now = self.attempts.now();
        let attempt = Attempt {
            id: Uuid::new_v4(),
            assessment_id,
            user_id,
            status: AttemptStatus::InProgress,
            started_at: now,
            submitted_at: None,
            // Snapshot so later catalog edits leave this attempt alone.
            time_limit_s: assessment.time_limit_s,
            score_raw: None,
            score_percent: None,
            is_passed: None,
            created_at: now,
            updated_at: now,
        };
        self.attempts.create_attempt(&attempt).await?;

        info!(attempt_id = %attempt.id, %user_id, %assessment_id, "attempt started");
        Ok(attempt)
    }

    pub async fn get_attempt(&self, user_id: Uuid, attempt_id: Uuid) -> Result<Attempt> {
        self.attempts.get_attempt(attempt_id, user_id).await
    }

    pub async fn upsert_answer(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
        req: UpsertAnswerRequest,
    ) -> Result<Answer> {
        let attempt = self.attempts.get_attempt(attempt_id, user_id).await?;
        self.ensure_editable(&attempt).await?;

        let selected = req
            .selected_choice_ids
            .map(|ids| GradingService::normalize_selection(ids.iter().map(String::as_str)))
            .filter(|ids| !ids.is_empty());
        let text = req
            .text_answer
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if selected.is_some() && text.is_some() {
            return Err(Error::BadRequest(
                "Provide either selected_choice_ids or text_answer, not both".to_string(),
            ));
        }
        if selected.is_none() && text.is_none() {
            return Err(Error::BadRequest(
                "Answer payload is empty".to_string(),
            ));
        }

        let now = self.attempts.now();
        let answer = Answer {
            id: Uuid::new_v4(),
            attempt_id,
            question_id: req.question_id,
            selected_choice_ids: selected,
            text_answer: text,
            // Graded at submission, not here.
            is_correct: None,
            created_at: now,
            updated_at: now,
        };
        self.attempts.upsert_answer(&answer).await
    }

    pub async fn submit_attempt(
        &self,
        user_id: Uuid,
        attempt_id: Uuid,
    ) -> Result<(Attempt, AttemptSummary)> {
        let attempt = self.attempts.get_attempt(attempt_id, user_id).await?;
        self.ensure_editable(&attempt).await?;

        let assessment = self.catalog.get_assessment(attempt.assessment_id).await?;
        let questions = self
            .catalog
            .list_questions_with_correct_choices(attempt.assessment_id)
            .await?;
        let answers = self.attempts.list_answers(attempt_id).await?;

        let graded = GradingService::grade_attempt(&questions, &answers);

        let now = self.attempts.now();
        for result in &graded.results {
            let Some(answer) = answers.iter().find(|a| a.question_id == result.question_id)
            else {
                continue;
            };
            let mut answer = answer.clone();
            answer.is_correct = Some(result.is_correct);
            answer.updated_at = now;
            self.attempts.upsert_answer(&answer).await?;
        }

        let is_passed = graded.score_percent >= f64::from(assessment.pass_score);
        let updated = self
            .attempts
            .transition_attempt(
                attempt.id,
                AttemptStatus::InProgress,
                AttemptPatch {
                    status: Some(AttemptStatus::Submitted),
                    submitted_at: Some(now),
                    score_raw: Some(graded.score_raw),
                    score_percent: Some(graded.score_percent),
                    is_passed: Some(is_passed),
                },
            )
            .await?;

        info!(
            attempt_id = %updated.id,
            %user_id,
            score_percent = graded.score_percent,
            is_passed,
            "attempt submitted"
        );

        self.run_post_submit(&assessment, &updated).await;

        Ok((
            updated,
            AttemptSummary {
                total_questions: graded.total_questions,
                correct: graded.correct_count,
            },
        ))
    }

    /// InvalidState on terminal attempts; lazily expires an overrun
    /// in-progress attempt, persisting the transition before failing.
    async fn ensure_editable(&self, attempt: &Attempt) -> Result<()> {
        if attempt.status.is_terminal() {
            return Err(Error::InvalidState(format!(
                "Attempt is {}, not editable",
                attempt.status.as_str()
            )));
        }

        if let Some(limit) = attempt.time_limit_s {
            if limit > 0 {
                let elapsed = (self.attempts.now() - attempt.started_at).num_seconds();
                if elapsed > i64::from(limit) {
                    if let Err(err) = self
                        .attempts
                        .transition_attempt(
                            attempt.id,
                            AttemptStatus::InProgress,
                            AttemptPatch {
                                status: Some(AttemptStatus::Expired),
                                ..AttemptPatch::default()
                            },
                        )
                        .await
                    {
                        error!(attempt_id = %attempt.id, error = ?err, "failed to persist expiry");
                    } else {
                        warn!(attempt_id = %attempt.id, elapsed, limit, "attempt expired");
                    }
                    return Err(Error::Expired("Attempt time limit exceeded".to_string()));
                }
            }
        }
        Ok(())
    }

    /// Post-submit side effects. Failures here are logged and swallowed:
    /// once grading has been persisted the submission must not fail over
    /// a downstream enrollment or analytics write.
    async fn run_post_submit(&self, assessment: &Assessment, attempt: &Attempt) {
        if assessment.owner_type != OwnerType::Course {
            return;
        }
        let course_id = assessment.owner_id;
        let user_id = attempt.user_id;
        let passed = attempt.is_passed.unwrap_or(false);
        let now = self.attempts.now();

        let mut newly_completed = false;
        if assessment.kind == AssessmentKind::Post {
            match self
                .progress
                .apply_posttest_outcome(user_id, course_id, passed, now)
                .await
            {
                Ok(outcome) => newly_completed = outcome == PropagationOutcome::CourseCompleted,
                Err(err) => {
                    error!(
                        attempt_id = %attempt.id, %user_id, %course_id, error = ?err,
                        "enrollment propagation failed"
                    );
                }
            }
        }

        if let Err(err) = self
            .metrics
            .on_attempt_submitted(
                user_id,
                course_id,
                attempt.score_percent.unwrap_or(0.0),
                passed,
                attempt.elapsed_seconds(),
                now,
            )
            .await
        {
            error!(
                attempt_id = %attempt.id, %user_id, %course_id, error = ?err,
                "learning metric update failed"
            );
        }

        if newly_completed {
            if let Err(err) = self
                .metrics
                .on_course_completed(user_id, course_id, 0, now)
                .await
            {
                error!(
                    attempt_id = %attempt.id, %user_id, %course_id, error = ?err,
                    "course completion update failed"
                );
            }
        }
    }
}
