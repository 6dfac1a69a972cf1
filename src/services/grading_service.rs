use crate::models::answer::Answer;
use crate::models::question::QuestionType;
use crate::store::GradableQuestion;
use uuid::Uuid;

/// Pure scoring logic. No I/O: callers load questions and answers, this
/// module decides correctness and aggregates.
pub struct GradingService;

#[derive(Debug, Clone)]
pub struct GradedAnswer {
    pub question_id: Uuid,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct GradedAttempt {
    /// One entry per answered question; unanswered questions are
    /// skipped, never penalized beyond not earning points.
    pub results: Vec<GradedAnswer>,
    pub score_raw: i32,
    pub max_points: i32,
    pub score_percent: f64,
    pub total_questions: usize,
    pub correct_count: usize,
}

impl GradingService {
    /// Canonical choice-id set: trimmed, blanks dropped, sorted, deduped.
    /// Comparison stays case-sensitive; ids are UUID-like opaque strings.
    pub fn normalize_selection<'a, I>(ids: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out: Vec<String> = ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Whether one answer is correct for its question.
    ///
    /// Choice questions use set equality between the selected and the
    /// correct choice-id sets; all-or-nothing, no partial credit.
    /// short_text is never auto-graded and unknown types fail safe, so
    /// both always grade incorrect.
    pub fn grade_question(question: &GradableQuestion, answer: &Answer) -> bool {
        match question.kind {
            QuestionType::SingleChoice | QuestionType::TrueFalse | QuestionType::MultipleChoice => {
                let Some(selected) = answer.selected_choice_ids.as_ref() else {
                    return false;
                };
                let selected = Self::normalize_selection(selected.iter().map(String::as_str));
                if selected.is_empty() {
                    return false;
                }
                let correct = Self::normalize_selection(
                    question.correct_choice_ids.iter().map(String::as_str),
                );
                selected == correct
            }
            QuestionType::ShortText => false,
            QuestionType::Unknown => false,
        }
    }

    /// Scores a whole answer set against the assessment's questions.
    /// `score_percent` is 0 when the assessment has no points to earn.
    pub fn grade_attempt(questions: &[GradableQuestion], answers: &[Answer]) -> GradedAttempt {
        let mut results = Vec::new();
        let mut score_raw = 0;
        let mut max_points = 0;
        let mut correct_count = 0;

        for question in questions {
            max_points += question.points;
            let Some(answer) = answers.iter().find(|a| a.question_id == question.question_id)
            else {
                continue;
            };
            let is_correct = Self::grade_question(question, answer);
            if is_correct {
                score_raw += question.points;
                correct_count += 1;
            }
            results.push(GradedAnswer {
                question_id: question.question_id,
                is_correct,
            });
        }

        let score_percent = if max_points > 0 {
            f64::from(score_raw) / f64::from(max_points) * 100.0
        } else {
            0.0
        };

        GradedAttempt {
            results,
            score_raw,
            max_points,
            score_percent,
            total_questions: questions.len(),
            correct_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(kind: QuestionType, points: i32, correct: &[&str]) -> GradableQuestion {
        GradableQuestion {
            question_id: Uuid::new_v4(),
            kind,
            points,
            correct_choice_ids: correct.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn choice_answer(question_id: Uuid, selected: &[&str]) -> Answer {
        let now = Utc::now();
        Answer {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            question_id,
            selected_choice_ids: Some(selected.iter().map(|s| s.to_string()).collect()),
            text_answer: None,
            is_correct: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn single_choice_matches_exact_set() {
        let q = question(QuestionType::SingleChoice, 2, &["a"]);
        assert!(GradingService::grade_question(&q, &choice_answer(q.question_id, &["a"])));
        assert!(!GradingService::grade_question(&q, &choice_answer(q.question_id, &["b"])));
    }

    #[test]
    fn selection_order_and_duplicates_are_irrelevant() {
        let q = question(QuestionType::MultipleChoice, 1, &["a", "b"]);
        assert!(GradingService::grade_question(&q, &choice_answer(q.question_id, &["b", "a"])));
        assert!(GradingService::grade_question(
            &q,
            &choice_answer(q.question_id, &["a", "b", "a"])
        ));
    }

    #[test]
    fn partial_selection_earns_nothing() {
        let q = question(QuestionType::MultipleChoice, 1, &["a", "b"]);
        assert!(!GradingService::grade_question(&q, &choice_answer(q.question_id, &["a"])));
        assert!(!GradingService::grade_question(
            &q,
            &choice_answer(q.question_id, &["a", "b", "c"])
        ));
    }

    #[test]
    fn choice_ids_are_trimmed_before_comparison() {
        let q = question(QuestionType::TrueFalse, 1, &["yes-id"]);
        assert!(GradingService::grade_question(
            &q,
            &choice_answer(q.question_id, &["  yes-id "])
        ));
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let q = question(QuestionType::SingleChoice, 1, &["Abc"]);
        assert!(!GradingService::grade_question(&q, &choice_answer(q.question_id, &["abc"])));
    }

    #[test]
    fn empty_selection_is_incorrect() {
        let q = question(QuestionType::SingleChoice, 1, &["a"]);
        assert!(!GradingService::grade_question(&q, &choice_answer(q.question_id, &[])));

        let mut no_selection = choice_answer(q.question_id, &[]);
        no_selection.selected_choice_ids = None;
        assert!(!GradingService::grade_question(&q, &no_selection));
    }

    #[test]
    fn short_text_is_never_auto_graded() {
        let q = question(QuestionType::ShortText, 5, &[]);
        let now = Utc::now();
        let answer = Answer {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            question_id: q.question_id,
            selected_choice_ids: None,
            text_answer: Some("a thoughtful essay".to_string()),
            is_correct: None,
            created_at: now,
            updated_at: now,
        };
        assert!(!GradingService::grade_question(&q, &answer));
    }

    #[test]
    fn unknown_question_type_fails_safe() {
        let q = question(QuestionType::Unknown, 1, &["a"]);
        assert!(!GradingService::grade_question(&q, &choice_answer(q.question_id, &["a"])));
    }

    #[test]
    fn aggregate_scores_and_percent() {
        let q1 = question(QuestionType::SingleChoice, 2, &["a"]);
        let q2 = question(QuestionType::SingleChoice, 2, &["b"]);
        let questions = vec![q1.clone(), q2.clone()];

        let both = vec![
            choice_answer(q1.question_id, &["a"]),
            choice_answer(q2.question_id, &["b"]),
        ];
        let graded = GradingService::grade_attempt(&questions, &both);
        assert_eq!(graded.score_raw, 4);
        assert_eq!(graded.score_percent, 100.0);
        assert_eq!(graded.correct_count, 2);
        assert_eq!(graded.total_questions, 2);

        let one = vec![
            choice_answer(q1.question_id, &["a"]),
            choice_answer(q2.question_id, &["a"]),
        ];
        let graded = GradingService::grade_attempt(&questions, &one);
        assert_eq!(graded.score_raw, 2);
        assert_eq!(graded.score_percent, 50.0);
        assert_eq!(graded.correct_count, 1);
    }

    #[test]
    fn unanswered_questions_only_cost_points() {
        let q1 = question(QuestionType::SingleChoice, 3, &["a"]);
        let q2 = question(QuestionType::SingleChoice, 1, &["b"]);
        let answers = vec![choice_answer(q1.question_id, &["a"])];
        let graded = GradingService::grade_attempt(&[q1, q2], &answers);
        assert_eq!(graded.score_raw, 3);
        assert_eq!(graded.score_percent, 75.0);
        assert_eq!(graded.results.len(), 1);
    }

    #[test]
    fn no_questions_means_zero_percent() {
        let graded = GradingService::grade_attempt(&[], &[]);
        assert_eq!(graded.score_raw, 0);
        assert_eq!(graded.score_percent, 0.0);
        assert_eq!(graded.total_questions, 0);
    }
}
