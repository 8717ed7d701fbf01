//! Form intake webhook

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use super::{detached, ApiResponse};
use crate::AppState;
use editorial_common::{db::models::Submission, errors::Result};

/// Accepts the raw form payload, flat or nested under `formData`
pub async fn google_form(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<ApiResponse<Submission>>)> {
    let editorial = state.editorial.clone();
    let outcome = detached(async move { editorial.submit_form(&payload).await }).await?;

    tracing::info!(
        submission_id = %outcome.value.id,
        form_response_id = ?outcome.value.form_response_id,
        "Form submission accepted"
    );

    Ok((StatusCode::CREATED, Json(outcome.into())))
}
