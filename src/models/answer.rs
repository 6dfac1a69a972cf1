use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A learner's answer to one question, unique per (attempt, question).
/// Re-answering before submission overwrites the previous value.
///
/// `selected_choice_ids` holds the canonical choice-id set (trimmed,
/// deduplicated, sorted); the CSV encoding exists only inside the
/// Postgres adapter. `text_answer` is used by short_text questions and
/// the two are mutually exclusive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_choice_ids: Option<Vec<String>>,
    pub text_answer: Option<String>,
    /// None until grading; set exactly once at submission.
    pub is_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
