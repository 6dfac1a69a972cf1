use serde::{Deserialize, Serialize};

use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::metrics::{CompletionStatus, CourseOutcome, LearningMetric};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentResponse {
    pub course_id: uuid::Uuid,
    pub status: EnrollmentStatus,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_accessed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub progress_percent: f64,
}

impl From<Enrollment> for EnrollmentResponse {
    fn from(e: Enrollment) -> Self {
        Self {
            course_id: e.course_id,
            status: e.status,
            started_at: e.started_at,
            completed_at: e.completed_at,
            last_accessed_at: e.last_accessed_at,
            progress_percent: e.progress_percent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningMetricResponse {
    pub course_id: uuid::Uuid,
    pub avg_score: f64,
    pub last_score: Option<f64>,
    pub attempts_count: i32,
    pub pass_count: i32,
    pub total_time_seconds: i64,
    pub completion_status: CompletionStatus,
}

impl From<LearningMetric> for LearningMetricResponse {
    fn from(m: LearningMetric) -> Self {
        Self {
            course_id: m.course_id,
            avg_score: m.avg_score,
            last_score: m.last_score,
            attempts_count: m.attempts_count,
            pass_count: m.pass_count,
            total_time_seconds: m.total_time_seconds,
            completion_status: m.completion_status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutcomeResponse {
    pub course_id: uuid::Uuid,
    pub total_enrollments: i32,
    pub total_completed: i32,
    /// Smoothed approximations; exact numbers need a batch recompute.
    pub avg_score: f64,
    pub pass_rate: f64,
    pub median_time_seconds: i64,
}

impl From<CourseOutcome> for CourseOutcomeResponse {
    fn from(o: CourseOutcome) -> Self {
        Self {
            course_id: o.course_id,
            total_enrollments: o.total_enrollments,
            total_completed: o.total_completed,
            avg_score: o.avg_score,
            pass_rate: o.pass_rate,
            median_time_seconds: o.median_time_seconds,
        }
    }
}
