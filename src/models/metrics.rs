use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-user, per-course rolling statistics derived from attempts.
/// `avg_score` is an exact running mean over aggregated attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningMetric {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub avg_score: f64,
    pub last_score: Option<f64>,
    pub attempts_count: i32,
    pub pass_count: i32,
    pub total_time_seconds: i64,
    pub completion_status: CompletionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearningMetric {
    /// Share of aggregated attempts that passed, as a percentage.
    pub fn pass_pct(&self) -> f64 {
        if self.attempts_count == 0 {
            return 0.0;
        }
        f64::from(self.pass_count) / f64::from(self.attempts_count) * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    NotEnrolled,
    InProgress,
    Completed,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::NotEnrolled => "not_enrolled",
            CompletionStatus::InProgress => "in_progress",
            CompletionStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_enrolled" => Some(CompletionStatus::NotEnrolled),
            "in_progress" => Some(CompletionStatus::InProgress),
            "completed" => Some(CompletionStatus::Completed),
            _ => None,
        }
    }
}

/// Per-course aggregate statistics across all users' attempts.
/// `avg_score` and `pass_rate` are two-point smoothed approximations,
/// not a population recompute; exact numbers need an offline batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseOutcome {
    pub course_id: Uuid,
    pub total_enrollments: i32,
    pub total_completed: i32,
    pub avg_score: f64,
    pub pass_rate: f64,
    pub median_time_seconds: i64,
    pub updated_at: DateTime<Utc>,
}
