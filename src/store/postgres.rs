use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::assessment::{Assessment, AssessmentKind, OwnerType};
use crate::models::attempt::{Attempt, AttemptStatus};
use crate::models::enrollment::{Enrollment, EnrollmentStatus};
use crate::models::metrics::{CompletionStatus, CourseOutcome, LearningMetric};
use crate::models::question::QuestionType;
use crate::store::{AttemptPatch, AttemptStore, CatalogStore, EnrollmentStore, GradableQuestion, MetricsStore};
use crate::utils::time;

// Choice-id sets cross this adapter as CSV text; the rest of the
// application only ever sees the canonical Vec<String> form.
fn join_csv(ids: &[String]) -> String {
    ids.join(",")
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_assessment(row: &PgRow) -> Result<Assessment> {
    let owner_type: String = row.try_get("owner_type")?;
    let kind: String = row.try_get("kind")?;
    Ok(Assessment {
        id: row.try_get("id")?,
        owner_type: OwnerType::parse(&owner_type)
            .ok_or_else(|| Error::Internal(format!("unknown owner_type: {}", owner_type)))?,
        owner_id: row.try_get("owner_id")?,
        kind: AssessmentKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("unknown assessment kind: {}", kind)))?,
        title: row.try_get("title")?,
        pass_score: row.try_get("pass_score")?,
        max_attempts: row.try_get("max_attempts")?,
        time_limit_s: row.try_get("time_limit_s")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_assessment(&self, id: Uuid) -> Result<Assessment> {
        let row = sqlx::query(
            r#"SELECT id, owner_type, owner_id, kind, title, pass_score,
                      max_attempts, time_limit_s, created_at, updated_at
               FROM assessments WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Assessment not found".to_string()))?;

        map_assessment(&row)
    }

    async fn list_questions_with_correct_choices(
        &self,
        assessment_id: Uuid,
    ) -> Result<Vec<GradableQuestion>> {
        let rows = sqlx::query(
            r#"
            SELECT q.id, q.kind, q.points,
                   COALESCE(
                       string_agg(c.id::text, ',' ORDER BY c.seq, c.id)
                           FILTER (WHERE c.is_correct),
                       ''
                   ) AS correct_csv
            FROM assessment_questions q
            LEFT JOIN assessment_choices c ON c.question_id = q.id
            WHERE q.assessment_id = $1
            GROUP BY q.id, q.kind, q.points, q.seq
            ORDER BY q.seq, q.id
            "#,
        )
        .bind(assessment_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let kind: String = row.try_get("kind")?;
                let correct_csv: String = row.try_get("correct_csv")?;
                Ok(GradableQuestion {
                    question_id: row.try_get("id")?,
                    kind: QuestionType::parse(&kind),
                    points: row.try_get("points")?,
                    correct_choice_ids: split_csv(&correct_csv),
                })
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_attempt(row: &PgRow) -> Result<Attempt> {
    let status: String = row.try_get("status")?;
    Ok(Attempt {
        id: row.try_get("id")?,
        assessment_id: row.try_get("assessment_id")?,
        user_id: row.try_get("user_id")?,
        status: AttemptStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown attempt status: {}", status)))?,
        started_at: row.try_get("started_at")?,
        submitted_at: row.try_get("submitted_at")?,
        time_limit_s: row.try_get("time_limit_s")?,
        score_raw: row.try_get("score_raw")?,
        score_percent: row.try_get("score_percent")?,
        is_passed: row.try_get("is_passed")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_answer(row: &PgRow) -> Result<Answer> {
    let csv: Option<String> = row.try_get("selected_choice_ids")?;
    Ok(Answer {
        id: row.try_get("id")?,
        attempt_id: row.try_get("attempt_id")?,
        question_id: row.try_get("question_id")?,
        selected_choice_ids: csv.map(|s| split_csv(&s)).filter(|ids| !ids.is_empty()),
        text_answer: row.try_get("text_answer")?,
        is_correct: row.try_get("is_correct")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    fn now(&self) -> DateTime<Utc> {
        time::now()
    }

    async fn count_attempts(&self, assessment_id: Uuid, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM assessment_attempts
               WHERE assessment_id = $1 AND user_id = $2"#,
        )
        .bind(assessment_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn create_attempt(&self, attempt: &Attempt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO assessment_attempts (
                id, assessment_id, user_id, status, started_at, submitted_at,
                time_limit_s, score_raw, score_percent, is_passed, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.assessment_id)
        .bind(attempt.user_id)
        .bind(attempt.status.as_str())
        .bind(attempt.started_at)
        .bind(attempt.submitted_at)
        .bind(attempt.time_limit_s)
        .bind(attempt.score_raw)
        .bind(attempt.score_percent)
        .bind(attempt.is_passed)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_attempt(&self, id: Uuid, user_id: Uuid) -> Result<Attempt> {
        let row = sqlx::query(
            r#"SELECT * FROM assessment_attempts WHERE id = $1 AND user_id = $2"#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))?;

        map_attempt(&row)
    }

    async fn transition_attempt(
        &self,
        id: Uuid,
        expected: AttemptStatus,
        patch: AttemptPatch,
    ) -> Result<Attempt> {
        // Conditional update: the WHERE clause on the current status is
        // what makes two racing submits resolve to exactly one winner.
        let row = sqlx::query(
            r#"
            UPDATE assessment_attempts
            SET status = COALESCE($3, status),
                submitted_at = COALESCE($4, submitted_at),
                score_raw = COALESCE($5, score_raw),
                score_percent = COALESCE($6, score_percent),
                is_passed = COALESCE($7, is_passed),
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected.as_str())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.submitted_at)
        .bind(patch.score_raw)
        .bind(patch.score_percent)
        .bind(patch.is_passed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::InvalidState("Attempt is not editable".to_string()))?;

        map_attempt(&row)
    }

    async fn upsert_answer(&self, answer: &Answer) -> Result<Answer> {
        let row = sqlx::query(
            r#"
            INSERT INTO assessment_answers (
                id, attempt_id, question_id, selected_choice_ids, text_answer,
                is_correct, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (attempt_id, question_id) DO UPDATE
            SET selected_choice_ids = EXCLUDED.selected_choice_ids,
                text_answer = EXCLUDED.text_answer,
                is_correct = EXCLUDED.is_correct,
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
        )
        .bind(answer.id)
        .bind(answer.attempt_id)
        .bind(answer.question_id)
        .bind(answer.selected_choice_ids.as_deref().map(join_csv))
        .bind(answer.text_answer.as_deref())
        .bind(answer.is_correct)
        .bind(answer.created_at)
        .bind(answer.updated_at)
        .fetch_one(&self.pool)
        .await?;

        map_answer(&row)
    }

    async fn list_answers(&self, attempt_id: Uuid) -> Result<Vec<Answer>> {
        let rows = sqlx::query(
            r#"SELECT * FROM assessment_answers WHERE attempt_id = $1 ORDER BY created_at, question_id"#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_answer).collect()
    }
}

#[derive(Clone)]
pub struct PgEnrollmentStore {
    pool: PgPool,
}

impl PgEnrollmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_enrollment(row: &PgRow) -> Result<Enrollment> {
    let status: String = row.try_get("status")?;
    Ok(Enrollment {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        course_id: row.try_get("course_id")?,
        status: EnrollmentStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("unknown enrollment status: {}", status)))?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        last_accessed_at: row.try_get("last_accessed_at")?,
        progress_percent: row.try_get("progress_percent")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl EnrollmentStore for PgEnrollmentStore {
    async fn get_enrollment(&self, user_id: Uuid, course_id: Uuid) -> Result<Enrollment> {
        let row = sqlx::query(
            r#"SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Enrollment not found".to_string()))?;

        map_enrollment(&row)
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (
                id, user_id, course_id, status, started_at, completed_at,
                last_accessed_at, progress_percent, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id, course_id) DO UPDATE
            SET status = EXCLUDED.status,
                started_at = EXCLUDED.started_at,
                completed_at = EXCLUDED.completed_at,
                last_accessed_at = EXCLUDED.last_accessed_at,
                progress_percent = EXCLUDED.progress_percent,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(enrollment.id)
        .bind(enrollment.user_id)
        .bind(enrollment.course_id)
        .bind(enrollment.status.as_str())
        .bind(enrollment.started_at)
        .bind(enrollment.completed_at)
        .bind(enrollment.last_accessed_at)
        .bind(enrollment.progress_percent)
        .bind(enrollment.created_at)
        .bind(enrollment.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMetricsStore {
    pool: PgPool,
}

impl PgMetricsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_learning_metric(row: &PgRow) -> Result<LearningMetric> {
    let completion_status: String = row.try_get("completion_status")?;
    Ok(LearningMetric {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        course_id: row.try_get("course_id")?,
        avg_score: row.try_get("avg_score")?,
        last_score: row.try_get("last_score")?,
        attempts_count: row.try_get("attempts_count")?,
        pass_count: row.try_get("pass_count")?,
        total_time_seconds: row.try_get("total_time_seconds")?,
        completion_status: CompletionStatus::parse(&completion_status).ok_or_else(|| {
            Error::Internal(format!("unknown completion status: {}", completion_status))
        })?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_course_outcome(row: &PgRow) -> Result<CourseOutcome> {
    Ok(CourseOutcome {
        course_id: row.try_get("course_id")?,
        total_enrollments: row.try_get("total_enrollments")?,
        total_completed: row.try_get("total_completed")?,
        avg_score: row.try_get("avg_score")?,
        pass_rate: row.try_get("pass_rate")?,
        median_time_seconds: row.try_get("median_time_seconds")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MetricsStore for PgMetricsStore {
    async fn get_learning_metric(&self, user_id: Uuid, course_id: Uuid) -> Result<LearningMetric> {
        let row = sqlx::query(
            r#"SELECT * FROM learning_metrics WHERE user_id = $1 AND course_id = $2"#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("Learning metric not found".to_string()))?;

        map_learning_metric(&row)
    }

    async fn upsert_learning_metric(&self, metric: &LearningMetric) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO learning_metrics (
                id, user_id, course_id, avg_score, last_score, attempts_count,
                pass_count, total_time_seconds, completion_status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (user_id, course_id) DO UPDATE
            SET avg_score = EXCLUDED.avg_score,
                last_score = EXCLUDED.last_score,
                attempts_count = EXCLUDED.attempts_count,
                pass_count = EXCLUDED.pass_count,
                total_time_seconds = EXCLUDED.total_time_seconds,
                completion_status = EXCLUDED.completion_status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(metric.id)
        .bind(metric.user_id)
        .bind(metric.course_id)
        .bind(metric.avg_score)
        .bind(metric.last_score)
        .bind(metric.attempts_count)
        .bind(metric.pass_count)
        .bind(metric.total_time_seconds)
        .bind(metric.completion_status.as_str())
        .bind(metric.created_at)
        .bind(metric.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_course_outcome(&self, course_id: Uuid) -> Result<CourseOutcome> {
        let row = sqlx::query(r#"SELECT * FROM course_outcomes WHERE course_id = $1"#)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Course outcome not found".to_string()))?;

        map_course_outcome(&row)
    }

    async fn upsert_course_outcome(&self, outcome: &CourseOutcome) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO course_outcomes (
                course_id, total_enrollments, total_completed, avg_score,
                pass_rate, median_time_seconds, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (course_id) DO UPDATE
            SET total_enrollments = EXCLUDED.total_enrollments,
                total_completed = EXCLUDED.total_completed,
                avg_score = EXCLUDED.avg_score,
                pass_rate = EXCLUDED.pass_rate,
                median_time_seconds = EXCLUDED.median_time_seconds,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(outcome.course_id)
        .bind(outcome.total_enrollments)
        .bind(outcome.total_completed)
        .bind(outcome.avg_score)
        .bind(outcome.pass_rate)
        .bind(outcome.median_time_seconds)
        .bind(outcome.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{join_csv, split_csv};

    #[test]
    fn split_csv_drops_blanks_and_trims() {
        assert_eq!(split_csv("a, b ,,c"), vec!["a", "b", "c"]);
        assert_eq!(split_csv(""), Vec::<String>::new());
    }

    #[test]
    fn join_then_split_is_identity_for_clean_ids() {
        let ids = vec!["one".to_string(), "two".to_string()];
        assert_eq!(split_csv(&join_csv(&ids)), ids);
    }
}
