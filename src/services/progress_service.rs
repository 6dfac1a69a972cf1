use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::store::EnrollmentStore;

/// Maps a course post-test outcome onto the learner's enrollment.
#[derive(Clone)]
pub struct ProgressService {
    enrollments: Arc<dyn EnrollmentStore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// No enrollment row existed; a post-test result never creates one.
    Skipped,
    Updated,
    /// The pass set `completed_at` for the first time.
    CourseCompleted,
}

impl ProgressService {
    pub fn new(enrollments: Arc<dyn EnrollmentStore>) -> Self {
        Self { enrollments }
    }

    pub async fn apply_posttest_outcome(
        &self,
        user_id: Uuid,
        course_id: Uuid,
        passed: bool,
        now: DateTime<Utc>,
    ) -> Result<PropagationOutcome> {
        let mut enrollment = match self.enrollments.get_enrollment(user_id, course_id).await {
            Ok(enrollment) => enrollment,
            Err(Error::NotFound(_)) => {
                debug!(%user_id, %course_id, "no enrollment for post-test outcome, skipping");
                return Ok(PropagationOutcome::Skipped);
            }
            Err(err) => return Err(err),
        };

        enrollment.last_accessed_at = Some(now);
        if enrollment.started_at.is_none() {
            enrollment.started_at = Some(now);
        }

        let mut newly_completed = false;
        if passed {
            enrollment.status = EnrollmentStatus::Passed;
            if enrollment.completed_at.is_none() {
                enrollment.completed_at = Some(now);
                newly_completed = true;
            }
            // Progress only ever rises; a pass cannot lower it.
            if enrollment.progress_percent < 100.0 {
                enrollment.progress_percent = 100.0;
            }
        } else {
            // A failed post-test does not erase lesson progress.
            enrollment.status = EnrollmentStatus::Failed;
        }
        enrollment.updated_at = now;

        self.enrollments.upsert_enrollment(&enrollment).await?;

        Ok(if newly_completed {
            PropagationOutcome::CourseCompleted
        } else {
            PropagationOutcome::Updated
        })
    }

    pub async fn enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        self.enrollments.get_enrollment(user_id, course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::AttemptStore;

    fn enrollment(user_id: Uuid, course_id: Uuid, progress: f64) -> Enrollment {
        let now = Utc::now();
        Enrollment {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            status: EnrollmentStatus::InProgress,
            started_at: Some(now),
            completed_at: None,
            last_accessed_at: None,
            progress_percent: progress,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn pass_marks_enrollment_passed_and_completes_once() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();
        store.insert_enrollment(enrollment(user_id, course_id, 40.0));

        let svc = ProgressService::new(store.clone());
        let now = store.now();

        let outcome = svc
            .apply_posttest_outcome(user_id, course_id, true, now)
            .await
            .unwrap();
        assert_eq!(outcome, PropagationOutcome::CourseCompleted);

        let updated = svc.enrollment(user_id, course_id).await.unwrap();
        assert_eq!(updated.status, EnrollmentStatus::Passed);
        assert_eq!(updated.completed_at, Some(now));
        assert_eq!(updated.progress_percent, 100.0);

        // A second pass keeps the original completion timestamp.
        store.advance_secs(60);
        let outcome = svc
            .apply_posttest_outcome(user_id, course_id, true, store.now())
            .await
            .unwrap();
        assert_eq!(outcome, PropagationOutcome::Updated);
        let again = svc.enrollment(user_id, course_id).await.unwrap();
        assert_eq!(again.completed_at, Some(now));
    }

    #[tokio::test]
    async fn fail_keeps_progress_untouched() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();
        store.insert_enrollment(enrollment(user_id, course_id, 62.5));

        let svc = ProgressService::new(store.clone());
        let outcome = svc
            .apply_posttest_outcome(user_id, course_id, false, store.now())
            .await
            .unwrap();
        assert_eq!(outcome, PropagationOutcome::Updated);

        let updated = svc.enrollment(user_id, course_id).await.unwrap();
        assert_eq!(updated.status, EnrollmentStatus::Failed);
        assert_eq!(updated.progress_percent, 62.5);
        assert!(updated.completed_at.is_none());
    }

    #[tokio::test]
    async fn missing_enrollment_is_never_created() {
        let store = Arc::new(MemoryStore::new());
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();

        let svc = ProgressService::new(store.clone());
        let outcome = svc
            .apply_posttest_outcome(user_id, course_id, true, store.now())
            .await
            .unwrap();
        assert_eq!(outcome, PropagationOutcome::Skipped);
        assert!(matches!(
            svc.enrollment(user_id, course_id).await,
            Err(Error::NotFound(_))
        ));
    }
}
