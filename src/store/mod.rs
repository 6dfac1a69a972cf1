use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::answer::Answer;
use crate::models::assessment::Assessment;
use crate::models::attempt::{Attempt, AttemptStatus};
use crate::models::enrollment::Enrollment;
use crate::models::metrics::{CourseOutcome, LearningMetric};
use crate::models::question::QuestionType;

pub mod memory;
pub mod postgres;

/// One question flattened with its correct-choice set, as the grading
/// engine consumes it.
#[derive(Debug, Clone)]
pub struct GradableQuestion {
    pub question_id: Uuid,
    pub kind: QuestionType,
    pub points: i32,
    pub correct_choice_ids: Vec<String>,
}

/// Field-by-field attempt update; None leaves the column unchanged.
#[derive(Debug, Clone, Default)]
pub struct AttemptPatch {
    pub status: Option<AttemptStatus>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score_raw: Option<i32>,
    pub score_percent: Option<f64>,
    pub is_passed: Option<bool>,
}

/// Read-only access to assessment definitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment>;

    /// Questions of an assessment with their correct-choice sets,
    /// ordered by question sequence.
    async fn list_questions_with_correct_choices(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<GradableQuestion>>;
}

/// Persistence for attempts and their answers, plus the clock used to
/// stamp lifecycle transitions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttemptStore: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Counts attempts of every status for (assessment, user).
    async fn count_attempts(&self, assessment_id: Uuid, user_id: Uuid) -> Result<i64>;

    async fn create_attempt(&self, attempt: &Attempt) -> Result<()>;

    /// Owner-scoped lookup; an attempt belonging to another user is
    /// indistinguishable from a missing one.
    async fn get_attempt(&self, id: Uuid, user_id: Uuid) -> Result<Attempt>;

    /// Applies the patch only if the attempt currently has `expected`
    /// status. Fails `InvalidState` when no row matches, which is what
    /// guards against a double submit racing past the status check.
    async fn transition_attempt(
        &self,
        id: Uuid,
        expected: AttemptStatus,
        patch: AttemptPatch,
    ) -> Result<Attempt>;

    /// Insert-or-overwrite keyed by (attempt_id, question_id).
    async fn upsert_answer(&self, answer: &Answer) -> Result<Answer>;

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn get_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment>;

    /// Update-if-exists keyed by (user_id, course_id).
    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsStore: Send + Sync {
    async fn get_learning_metric(&self, user_id: Uuid, course_id: Uuid) -> Result<LearningMetric>;

    async fn upsert_learning_metric(&self, metric: &LearningMetric) -> Result<()>;

    async fn get_course_outcome(&self, course_id: Uuid) -> Result<CourseOutcome>;

    async fn upsert_course_outcome(&self, outcome: &CourseOutcome) -> Result<()>;
}
