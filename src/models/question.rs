use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub assessment_id: Uuid,
    pub kind: QuestionType,
    pub stem: String,
    pub explanation: Option<String>,
    /// Positive weight added to the raw score when answered correctly.
    pub points: i32,
    /// Ordering key; not required unique but gives a deterministic sort.
    pub seq: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    ShortText,
    /// Fail-safe decode of a type this engine does not recognize;
    /// such questions always grade incorrect.
    Unknown,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortText => "short_text",
            QuestionType::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "single_choice" => QuestionType::SingleChoice,
            "multiple_choice" => QuestionType::MultipleChoice,
            "true_false" => QuestionType::TrueFalse,
            "short_text" => QuestionType::ShortText,
            _ => QuestionType::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::QuestionType;

    #[test]
    fn unrecognized_kind_decodes_to_unknown() {
        assert_eq!(QuestionType::parse("essay"), QuestionType::Unknown);
        assert_eq!(QuestionType::parse("single_choice"), QuestionType::SingleChoice);
        assert_eq!(QuestionType::Unknown.as_str(), "unknown");
    }
}
