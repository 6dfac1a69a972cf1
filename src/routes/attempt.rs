use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AnswerResponse, AttemptResponse, SubmitAttemptResponse, UpsertAnswerRequest,
};
use crate::middleware::auth::Claims;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/api/assessments/{id}/attempts",
    params(
        ("id" = Uuid, Path, description = "Assessment ID")
    ),
    responses(
        (status = 201, description = "Attempt started", body = Json<AttemptResponse>),
        (status = 404, description = "Assessment not found"),
        (status = 409, description = "Attempt limit reached")
    )
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(assessment_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let attempt = state
        .attempt_service
        .start_attempt(user_id, assessment_id)
        .await?;
    Ok((StatusCode::CREATED, Json(AttemptResponse::from(attempt))).into_response())
}

#[utoipa::path(
    get,
    path = "/api/attempts/{id}",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt details", body = Json<AttemptResponse>),
        (status = 404, description = "Attempt not found")
    )
)]
#[axum::debug_handler]
pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let attempt = state
        .attempt_service
        .get_attempt(user_id, attempt_id)
        .await?;
    Ok(Json(AttemptResponse::from(attempt)).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/attempts/{id}/answers",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    request_body = UpsertAnswerRequest,
    responses(
        (status = 200, description = "Answer saved", body = Json<AnswerResponse>),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt already finalized"),
        (status = 410, description = "Attempt time limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn upsert_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<UpsertAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let user_id = claims.user_id()?;
    let answer = state
        .attempt_service
        .upsert_answer(user_id, attempt_id, req)
        .await?;
    Ok(Json(AnswerResponse::from(answer)).into_response())
}

#[utoipa::path(
    post,
    path = "/api/attempts/{id}/submit",
    params(
        ("id" = Uuid, Path, description = "Attempt ID")
    ),
    responses(
        (status = 200, description = "Attempt graded and finalized", body = Json<SubmitAttemptResponse>),
        (status = 404, description = "Attempt not found"),
        (status = 409, description = "Attempt already finalized"),
        (status = 410, description = "Attempt time limit exceeded")
    )
)]
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let user_id = claims.user_id()?;
    let (attempt, summary) = state
        .attempt_service
        .submit_attempt(user_id, attempt_id)
        .await?;
    Ok(Json(SubmitAttemptResponse::new(attempt, summary)).into_response())
}
