//! In-memory store backend.
//!
//! Implements every store port over a single mutex-guarded state with a
//! manually controlled clock, which is what lets the attempt lifecycle
//! be tested deterministically (time-limit expiry in particular)
//! without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::assessment::Assessment;
use crate::models::attempt::{Attempt, AttemptStatus};
use crate::models::choice::Choice;
use crate::models::enrollment::Enrollment;
use crate::models::metrics::{CourseOutcome, LearningMetric};
use crate::models::question::Question;
use crate::store::{AttemptPatch, AttemptStore, CatalogStore, EnrollmentStore, GradableQuestion, MetricsStore};

#[derive(Default)]
struct State {
    assessments: HashMap<Uuid, Assessment>,
    questions: Vec<Question>,
    choices: Vec<Choice>,
    attempts: HashMap<Uuid, Attempt>,
    answers: Vec<Answer>,
    enrollments: Vec<Enrollment>,
    metrics: Vec<LearningMetric>,
    outcomes: HashMap<Uuid, CourseOutcome>,
}

pub struct MemoryStore {
    state: Mutex<State>,
    clock: Mutex<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock: Mutex::new(Utc::now()),
        }
    }

    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.clock.lock().unwrap() = now;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut clock = self.clock.lock().unwrap();
        *clock += Duration::seconds(secs);
    }

    pub fn insert_assessment(&self, assessment: Assessment) {
        let mut state = self.state.lock().unwrap();
        state.assessments.insert(assessment.id, assessment);
    }

    pub fn insert_question(&self, question: Question, choices: Vec<Choice>) {
        let mut state = self.state.lock().unwrap();
        state.questions.push(question);
        state.choices.extend(choices);
    }

    pub fn insert_enrollment(&self, enrollment: Enrollment) {
        let mut state = self.state.lock().unwrap();
        state.enrollments.push(enrollment);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment> {
        let state = self.state.lock().unwrap();
        state
            .assessments
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))
    }

    async fn list_questions_with_correct_choices(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<GradableQuestion>> {
        let state = self.state.lock().unwrap();
        let mut questions: Vec<&Question> = state
            .questions
            .iter()
            .filter(|q| q.assessment_id == assessment_id)
            .collect();
        questions.sort_by_key(|q| (q.seq, q.id));

        Ok(questions
            .into_iter()
            .map(|q| {
                let mut correct: Vec<&Choice> = state
                    .choices
                    .iter()
                    .filter(|c| c.question_id == q.id && c.is_correct)
                    .collect();
                correct.sort_by_key(|c| (c.seq, c.id));
                GradableQuestion {
                    question_id: q.id,
                    kind: q.kind,
                    points: q.points,
                    correct_choice_ids: correct.iter().map(|c| c.id.to_string()).collect(),
                }
            })
            .collect())
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    fn now(&self) -> DateTime<Utc> {
        *self.clock.lock().unwrap()
    }

    async fn count_attempts(&self, assessment_id: Uuid, user_id: Uuid) -> Result<i64> {
        let state = self.state.lock().unwrap();
        Ok(state
            .attempts
            .values()
            .filter(|a| a.assessment_id == assessment_id && a.user_id == user_id)
            .count() as i64)
    }

    async fn create_attempt(&self, attempt: &Attempt) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.attempts.insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn get_attempt(&self, id: Uuid, user_id: Uuid) -> Result<Attempt> {
        let state = self.state.lock().unwrap();
        state
            .attempts
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    async fn transition_attempt(
        &self,
        id: Uuid,
        expected: AttemptStatus,
        patch: AttemptPatch,
    ) -> Result<Attempt> {
        let now = self.now();
        let mut state = self.state.lock().unwrap();
        let attempt = state
            .attempts
            .get_mut(&id)
            .filter(|a| a.status == expected)
            .ok_or_else(|| Error::InvalidState("Attempt is not editable".to_string()))?;

        if let Some(status) = patch.status {
            attempt.status = status;
        }
        if let Some(submitted_at) = patch.submitted_at {
            attempt.submitted_at = Some(submitted_at);
        }
        if let Some(score_raw) = patch.score_raw {
            attempt.score_raw = Some(score_raw);
        }
        if let Some(score_percent) = patch.score_percent {
            attempt.score_percent = Some(score_percent);
        }
        if let Some(is_passed) = patch.is_passed {
            attempt.is_passed = Some(is_passed);
        }
        attempt.updated_at = now;
        Ok(attempt.clone())
    }

    async fn upsert_answer(&self, answer: &Answer) -> Result<Answer> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .answers
            .iter_mut()
            .find(|a| a.attempt_id == answer.attempt_id && a.question_id == answer.question_id)
        {
            // Overwrite in place, keeping the original row identity.
            existing.selected_choice_ids = answer.selected_choice_ids.clone();
            existing.text_answer = answer.text_answer.clone();
            existing.is_correct = answer.is_correct;
            existing.updated_at = answer.updated_at;
            return Ok(existing.clone());
        }
        state.answers.push(answer.clone());
        Ok(answer.clone())
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .answers
            .iter()
            .filter(|a| a.attempt_id == attempt_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn get_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let state = self.state.lock().unwrap();
        state
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Enrollment not found".to_string()))
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .enrollments
            .iter_mut()
            .find(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id)
        {
            *existing = enrollment.clone();
        } else {
            state.enrollments.push(enrollment.clone());
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsStore for MemoryStore {
    async fn get_learning_metric(&self, user_id: Uuid, course_id: Uuid) -> Result<LearningMetric> {
        let state = self.state.lock().unwrap();
        state
            .metrics
            .iter()
            .find(|m| m.user_id == user_id && m.course_id == course_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Learning metric not found".to_string()))
    }

    async fn upsert_learning_metric(&self, metric: &LearningMetric) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .metrics
            .iter_mut()
            .find(|m| m.user_id == metric.user_id && m.course_id == metric.course_id)
        {
            *existing = metric.clone();
        } else {
            state.metrics.push(metric.clone());
        }
        Ok(())
    }

    async fn get_course_outcome(&self, course_id: Uuid) -> Result<CourseOutcome> {
        let state = self.state.lock().unwrap();
        state
            .outcomes
            .get(&course_id)
            .cloned()
            .ok_or_else(|| Error::NotFound("Course outcome not found".to_string()))
    }

    async fn upsert_course_outcome(&self, outcome: &CourseOutcome) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.outcomes.insert(outcome.course_id, outcome.clone());
        Ok(())
    }
}
