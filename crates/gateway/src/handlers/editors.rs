//! Editor management and access-code login

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{detached, ApiResponse};
use crate::AppState;
use editorial_common::{
    db::models::PublicEditor,
    errors::Result,
    services::{CreatedEditor, EditorPatch, NewEditor, UpdatedEditor},
    Actor,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub access_code: String,
}

pub async fn list_editors(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<PublicEditor>>>> {
    let editors = state.editorial.list_editors().await?;
    Ok(Json(ApiResponse::ok(editors)))
}

/// Create an editor; the response is the only place the access code appears
pub async fn create_editor(
    State(state): State<AppState>,
    Json(request): Json<NewEditor>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedEditor>>)> {
    let editorial = state.editorial.clone();
    let created =
        detached(async move { editorial.create_editor(request, &Actor::Admin).await }).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn update_editor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<EditorPatch>,
) -> Result<Json<ApiResponse<UpdatedEditor>>> {
    let editorial = state.editorial.clone();
    let updated =
        detached(async move { editorial.update_editor(&id, patch, &Actor::Admin).await }).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

pub async fn deactivate_editor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublicEditor>>> {
    let editorial = state.editorial.clone();
    let editor =
        detached(async move { editorial.deactivate_editor(&id, &Actor::Admin).await }).await?;
    Ok(Json(ApiResponse::ok(editor)))
}

pub async fn authenticate(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<PublicEditor>>> {
    let editor = state.editorial.authenticate(&request.access_code).await?;
    tracing::info!(editor_id = %editor.id, "Editor authenticated");
    Ok(Json(ApiResponse::ok(editor)))
}
