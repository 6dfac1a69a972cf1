use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::attempt::{Attempt, AttemptStatus};
use crate::services::attempt_service::AttemptSummary;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertAnswerRequest {
    pub question_id: uuid::Uuid,
    /// Choice questions; set-compared at grading time.
    #[validate(length(max = 64))]
    pub selected_choice_ids: Option<Vec<String>>,
    /// short_text questions only.
    #[validate(length(max = 10000))]
    pub text_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResponse {
    pub id: uuid::Uuid,
    pub assessment_id: uuid::Uuid,
    pub status: AttemptStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub time_limit_s: Option<i32>,
    pub score_raw: Option<i32>,
    pub score_percent: Option<f64>,
    pub is_passed: Option<bool>,
}

impl From<Attempt> for AttemptResponse {
    fn from(attempt: Attempt) -> Self {
        Self {
            id: attempt.id,
            assessment_id: attempt.assessment_id,
            status: attempt.status,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            time_limit_s: attempt.time_limit_s,
            score_raw: attempt.score_raw,
            score_percent: attempt.score_percent,
            is_passed: attempt.is_passed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question_id: uuid::Uuid,
    pub selected_choice_ids: Option<Vec<String>>,
    pub text_answer: Option<String>,
    pub is_correct: Option<bool>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<crate::models::answer::Answer> for AnswerResponse {
    fn from(answer: crate::models::answer::Answer) -> Self {
        Self {
            question_id: answer.question_id,
            selected_choice_ids: answer.selected_choice_ids,
            text_answer: answer.text_answer,
            is_correct: answer.is_correct,
            updated_at: answer.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSummary {
    pub total_questions: usize,
    pub correct: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptResponse {
    pub attempt: AttemptResponse,
    pub summary: SubmitSummary,
}

impl SubmitAttemptResponse {
    pub fn new(attempt: Attempt, summary: AttemptSummary) -> Self {
        Self {
            attempt: attempt.into(),
            summary: SubmitSummary {
                total_questions: summary.total_questions,
                correct: summary.correct,
            },
        }
    }
}
