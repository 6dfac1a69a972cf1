use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A quiz, pre-test or post-test definition. Authored by the content
/// service; this backend only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub id: Uuid,
    pub owner_type: OwnerType,
    pub owner_id: Uuid,
    pub kind: AssessmentKind,
    pub title: String,
    /// Percentage threshold compared against the computed score.
    pub pass_score: i32,
    pub max_attempts: Option<i32>,
    pub time_limit_s: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    Course,
    Module,
    Lesson,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Course => "course",
            OwnerType::Module => "module",
            OwnerType::Lesson => "lesson",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "course" => Some(OwnerType::Course),
            "module" => Some(OwnerType::Module),
            "lesson" => Some(OwnerType::Lesson),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Pre,
    Post,
    Quiz,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Pre => "pre",
            AssessmentKind::Post => "post",
            AssessmentKind::Quiz => "quiz",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pre" => Some(AssessmentKind::Pre),
            "post" => Some(AssessmentKind::Post),
            "quiz" => Some(AssessmentKind::Quiz),
            _ => None,
        }
    }
}
