use std::sync::{Arc, Once};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value as JsonValue;
use tower::ServiceExt;
use uuid::Uuid;

use lms_backend::middleware::auth::Claims;
use lms_backend::models::assessment::{Assessment, AssessmentKind, OwnerType};
use lms_backend::models::choice::Choice;
use lms_backend::models::enrollment::{Enrollment, EnrollmentStatus};
use lms_backend::models::question::{Question, QuestionType};
use lms_backend::store::memory::MemoryStore;
use lms_backend::AppState;

pub const TEST_JWT_SECRET: &str = "test_secret_key";

static INIT: Once = Once::new();

pub fn init_test_config() {
    INIT.call_once(|| {
        std::env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
        std::env::set_var("DATABASE_URL", "postgres://localhost/unused");
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
        std::env::set_var("DATABASE_MAX_CONNECTIONS", "5");
        let _ = lms_backend::config::init_config();
    });
}

/// App wired to a single in-memory store so every port shares one state
/// and one controllable clock.
pub fn test_state() -> (Arc<MemoryStore>, AppState) {
    init_test_config();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::with_stores(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    );
    (store, state)
}

pub struct SeededQuestion {
    pub question: Question,
    pub correct_choice: Uuid,
    pub wrong_choice: Uuid,
}

pub struct SeededAssessment {
    pub assessment: Assessment,
    pub questions: Vec<SeededQuestion>,
}

pub fn seed_assessment(
    store: &MemoryStore,
    owner_type: OwnerType,
    kind: AssessmentKind,
    pass_score: i32,
    question_count: usize,
    points: i32,
) -> SeededAssessment {
    let now = Utc::now();
    let assessment = Assessment {
        id: Uuid::new_v4(),
        owner_type,
        owner_id: Uuid::new_v4(),
        kind,
        title: "Seeded assessment".to_string(),
        pass_score,
        max_attempts: None,
        time_limit_s: None,
        created_at: now,
        updated_at: now,
    };
    store.insert_assessment(assessment.clone());

    let questions = (0..question_count)
        .map(|i| {
            let question = Question {
                id: Uuid::new_v4(),
                assessment_id: assessment.id,
                kind: QuestionType::SingleChoice,
                stem: format!("Question {}", i + 1),
                explanation: None,
                points,
                seq: i as i32 + 1,
                created_at: now,
                updated_at: now,
            };
            let choices: Vec<Choice> = (0..3)
                .map(|c| Choice {
                    id: Uuid::new_v4(),
                    question_id: question.id,
                    label: format!("Choice {}", c + 1),
                    is_correct: c == 0,
                    seq: c,
                    created_at: now,
                    updated_at: now,
                })
                .collect();
            let correct_choice = choices[0].id;
            let wrong_choice = choices[1].id;
            store.insert_question(question.clone(), choices);
            SeededQuestion {
                question,
                correct_choice,
                wrong_choice,
            }
        })
        .collect();

    SeededAssessment {
        assessment,
        questions,
    }
}

pub fn seed_enrollment(store: &MemoryStore, user_id: Uuid, course_id: Uuid, progress: f64) {
    let now = Utc::now();
    store.insert_enrollment(Enrollment {
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
    });
}

pub fn bearer_token(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        role: None,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("encode token")
}

pub async fn send_request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request"),
        None => builder.body(Body::empty()).expect("build request"),
    };

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse body")
    };
    (status, json)
}
