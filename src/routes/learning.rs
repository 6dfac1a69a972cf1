use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;

use crate::dto::learning_dto::{CourseOutcomeResponse, EnrollmentResponse, LearningMetricResponse};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn get_my_enrollment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let enrollment = state
        .progress_service
        .enrollment(user_id, course_id)
        .await?;
    Ok(Json(EnrollmentResponse::from(enrollment)).into_response())
}

#[axum::debug_handler]
pub async fn get_my_learning_metric(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let metric = state
        .metrics_service
        .learning_metric(user_id, course_id)
        .await?;
    Ok(Json(LearningMetricResponse::from(metric)).into_response())
}

#[axum::debug_handler]
pub async fn get_course_outcome(
    State(state): State<AppState>,
    Path(course_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let outcome = state.metrics_service.course_outcome(course_id).await?;
    Ok(Json(CourseOutcomeResponse::from(outcome)).into_response())
}
