use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::metrics::{CompletionStatus, CourseOutcome, LearningMetric};
use crate::store::MetricsStore;

/// Incremental learning statistics.
///
/// The per-user metric keeps an exact running mean over aggregated
/// attempts. The per-course outcome is only nudged with two-point
/// smoothing (`new = (old + incoming) / 2`) so a submission never scans
/// other users' metrics; exact course numbers need an offline batch
/// recompute.
#[derive(Clone)]
pub struct MetricsService {
    metrics: Arc<dyn MetricsStore>,
}

impl MetricsService {
    pub fn new(metrics: Arc<dyn MetricsStore>) -> Self {
        Self { metrics }
    }

    pub async fn on_attempt_submitted(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        score: f64,
        passed: bool,
        time_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let existing = match self.metrics.get_learning_metric(user_id, course_id).await {
            Ok(metric) => Some(metric),
            Err(Error::NotFound(_)) => None,
            Err(err) => return Err(err),
        };

        let Some(mut metric) = existing else {
            let metric = LearningMetric {
                id: Uuid::new_v4(),
                user_id,
                course_id,
                avg_score: score,
                last_score: Some(score),
                attempts_count: 1,
                pass_count: if passed { 1 } else { 0 },
                total_time_seconds: time_seconds,
                completion_status: CompletionStatus::InProgress,
                created_at: now,
                updated_at: now,
            };
            return self.metrics.upsert_learning_metric(&metric).await;
        };

        let prev_attempts = metric.attempts_count;
        let next_attempts = prev_attempts + 1;
        metric.avg_score =
            (metric.avg_score * f64::from(prev_attempts) + score) / f64::from(next_attempts);
        metric.attempts_count = next_attempts;
        metric.last_score = Some(score);
        if passed {
            metric.pass_count += 1;
        }
        metric.total_time_seconds += time_seconds;
        metric.updated_at = now;
        self.metrics.upsert_learning_metric(&metric).await?;

        let outcome = match self.metrics.get_course_outcome(course_id).await {
            Ok(outcome) => Some(outcome),
            Err(Error::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        let Some(mut outcome) = outcome else {
            let outcome = CourseOutcome {
                course_id,
                total_enrollments: 0,
                total_completed: 0,
                avg_score: metric.avg_score,
                pass_rate: 0.0,
                median_time_seconds: 0,
                updated_at: now,
            };
            return self.metrics.upsert_course_outcome(&outcome).await;
        };

        outcome.avg_score = (outcome.avg_score + metric.avg_score) / 2.0;
        outcome.pass_rate = ((outcome.pass_rate + metric.pass_pct()) / 2.0).min(100.0);
        outcome.updated_at = now;
        self.metrics.upsert_course_outcome(&outcome).await
    }

    /// Fires when a passed course post-test completes an enrollment for
    /// the first time.
    pub async fn on_course_completed(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        time_seconds: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let existing = match self.metrics.get_learning_metric(user_id, course_id).await {
            Ok(metric) => Some(metric),
            Err(Error::NotFound(_)) => None,
            Err(err) => return Err(err),
        };

        let metric = match existing {
            Some(mut metric) => {
                metric.completion_status = CompletionStatus::Completed;
                metric.total_time_seconds += time_seconds;
                metric.updated_at = now;
                metric
            }
            None => LearningMetric {
                id: Uuid::new_v4(),
                user_id,
                course_id,
                avg_score: 0.0,
                last_score: None,
                attempts_count: 0,
                pass_count: 0,
                total_time_seconds: time_seconds,
                completion_status: CompletionStatus::Completed,
                created_at: now,
                updated_at: now,
            },
        };
        self.metrics.upsert_learning_metric(&metric).await?;

        let outcome = match self.metrics.get_course_outcome(course_id).await {
            Ok(outcome) => Some(outcome),
            Err(Error::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        let Some(mut outcome) = outcome else {
            let outcome = CourseOutcome {
                course_id,
                total_enrollments: 0,
                total_completed: 1,
                avg_score: metric.avg_score,
                pass_rate: metric.pass_pct(),
                median_time_seconds: metric.total_time_seconds,
                updated_at: now,
            };
            return self.metrics.upsert_course_outcome(&outcome).await;
        };

        outcome.total_completed += 1;
        if outcome.avg_score == 0.0 {
            outcome.avg_score = metric.avg_score;
        } else {
            outcome.avg_score = (outcome.avg_score + metric.avg_score) / 2.0;
        }
        outcome.pass_rate = ((outcome.pass_rate + metric.pass_pct()) / 2.0).min(100.0);
        outcome.updated_at = now;
        self.metrics.upsert_course_outcome(&outcome).await
    }

    pub async fn learning_metric(&self, user_id: Uuid, course_id: Uuid) -> Result<LearningMetric> {
        self.metrics.get_learning_metric(user_id, course_id).await
    }

    pub async fn course_outcome(&self, course_id: Uuid) -> Result<CourseOutcome> {
        self.metrics.get_course_outcome(course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::AttemptStore;

    #[tokio::test]
    async fn first_attempt_creates_metric_without_outcome() {
        let store = Arc::new(MemoryStore::new());
        let svc = MetricsService::new(store.clone());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();

        svc.on_attempt_submitted(user_id, course_id, 70.0, false, 120, store.now())
            .await
            .unwrap();

        let metric = svc.learning_metric(user_id, course_id).await.unwrap();
        assert_eq!(metric.attempts_count, 1);
        assert_eq!(metric.avg_score, 70.0);
        assert_eq!(metric.last_score, Some(70.0));
        assert_eq!(metric.pass_count, 0);
        assert_eq!(metric.total_time_seconds, 120);
        assert!(matches!(
            svc.course_outcome(course_id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn running_mean_is_exact() {
        let store = Arc::new(MemoryStore::new());
        let svc = MetricsService::new(store.clone());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();

        for score in [60.0, 80.0, 100.0] {
            svc.on_attempt_submitted(user_id, course_id, score, score >= 80.0, 30, store.now())
                .await
                .unwrap();
        }

        let metric = svc.learning_metric(user_id, course_id).await.unwrap();
        assert_eq!(metric.attempts_count, 3);
        assert!((metric.avg_score - 80.0).abs() < 1e-9);
        assert_eq!(metric.pass_count, 2);
        assert_eq!(metric.total_time_seconds, 90);
        assert_eq!(metric.last_score, Some(100.0));
    }

    #[tokio::test]
    async fn course_outcome_uses_two_point_smoothing() {
        let store = Arc::new(MemoryStore::new());
        let svc = MetricsService::new(store.clone());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();

        svc.on_attempt_submitted(user_id, course_id, 50.0, false, 0, store.now())
            .await
            .unwrap();
        // Second attempt materializes the outcome from the user's mean.
        svc.on_attempt_submitted(user_id, course_id, 100.0, true, 0, store.now())
            .await
            .unwrap();
        let outcome = svc.course_outcome(course_id).await.unwrap();
        assert!((outcome.avg_score - 75.0).abs() < 1e-9);
        assert_eq!(outcome.pass_rate, 0.0);

        // Third attempt smooths: avg = (75 + 250/3) / 2, rate = (0 + 200/3) / 2.
        svc.on_attempt_submitted(user_id, course_id, 100.0, true, 0, store.now())
            .await
            .unwrap();
        let outcome = svc.course_outcome(course_id).await.unwrap();
        let user_avg = 250.0 / 3.0;
        assert!((outcome.avg_score - (75.0 + user_avg) / 2.0).abs() < 1e-9);
        assert!((outcome.pass_rate - (200.0 / 3.0) / 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn completion_hook_flips_status_and_counts() {
        let store = Arc::new(MemoryStore::new());
        let svc = MetricsService::new(store.clone());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();

        svc.on_attempt_submitted(user_id, course_id, 90.0, true, 45, store.now())
            .await
            .unwrap();
        svc.on_course_completed(user_id, course_id, 0, store.now())
            .await
            .unwrap();

        let metric = svc.learning_metric(user_id, course_id).await.unwrap();
        assert_eq!(metric.completion_status, CompletionStatus::Completed);
        assert_eq!(metric.attempts_count, 1);

        let outcome = svc.course_outcome(course_id).await.unwrap();
        assert_eq!(outcome.total_completed, 1);
        assert_eq!(outcome.avg_score, 90.0);
        assert_eq!(outcome.pass_rate, 100.0);
    }
}
