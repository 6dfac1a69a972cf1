use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::AppState;

pub mod attempt;
pub mod health;
pub mod learning;

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/api/assessments/:id/attempts",
            post(attempt::start_attempt),
        )
        .route("/api/attempts/:id", get(attempt::get_attempt))
        .route("/api/attempts/:id/answers", patch(attempt::upsert_answer))
        .route("/api/attempts/:id/submit", post(attempt::submit_attempt))
        .route(
            "/api/learning/courses/:course_id/enrollment",
            get(learning::get_my_enrollment),
        )
        .route(
            "/api/learning/courses/:course_id/metric",
            get(learning::get_my_learning_metric),
        )
        .route(
            "/api/learning/courses/:course_id/outcome",
            get(learning::get_course_outcome),
        )
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
        .with_state(state)
}
