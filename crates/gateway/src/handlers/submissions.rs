//! Submission intake, listing and status handlers

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::{detached, ApiResponse};
use crate::middleware::admin_key::check_admin_key;
use crate::AppState;
use editorial_common::{
    db::models::Submission,
    errors::Result,
    services::{NewSubmission, StatusUpdate, SubmissionFilter},
    Actor,
};

/// Accept a new submission and run auto-assignment
pub async fn create_submission(
    State(state): State<AppState>,
    Json(request): Json<NewSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>)> {
    let editorial = state.editorial.clone();
    let outcome = detached(async move { editorial.submit(request).await }).await?;

    tracing::info!(
        submission_id = %outcome.value.id,
        status = %outcome.value.status,
        partial = outcome.is_partial(),
        "Submission accepted"
    );

    Ok((StatusCode::CREATED, Json(outcome.into())))
}

pub async fn list_submissions(
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<ApiResponse<Vec<Submission>>>> {
    let submissions = state.editorial.list_submissions(&filter).await?;
    Ok(Json(ApiResponse::ok(submissions)))
}

pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Submission>>> {
    let submission = state.editorial.get_submission(&id).await?;
    Ok(Json(ApiResponse::ok(submission)))
}

/// Move a submission to a new status on behalf of `editorId`.
///
/// Acting as a reserved principal (`admin`, `system`) needs the admin key.
pub async fn update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ApiResponse<Submission>>> {
    let reserved = update
        .editor_id
        .as_deref()
        .map(str::trim)
        .and_then(Actor::reserved);
    if let Some(actor) = reserved {
        check_admin_key(&state, &headers).inspect_err(|_| {
            tracing::warn!(actor = actor.id(), "Reserved principal claimed without admin key");
        })?;
    }

    let editorial = state.editorial.clone();
    let outcome = detached(async move { editorial.update_status(update).await }).await?;
    Ok(Json(outcome.into()))
}

/// Retry assignment for submissions held without a copy editor
pub async fn assign_pending(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Submission>>>> {
    let editorial = state.editorial.clone();
    let outcome = detached(async move { editorial.assign_pending().await }).await?;
    Ok(Json(outcome.into()))
}
