//! Team management handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::{detached, ApiResponse};
use crate::AppState;
use editorial_common::{
    db::models::{Team, TeamSummary},
    errors::Result,
    services::{NewTeam, TeamPatch},
    Actor,
};

/// Teams with member and workload counts
pub async fn list_teams(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<TeamSummary>>>> {
    let teams = state.editorial.list_teams().await?;
    Ok(Json(ApiResponse::ok(teams)))
}

pub async fn create_team(
    State(state): State<AppState>,
    Json(request): Json<NewTeam>,
) -> Result<(StatusCode, Json<ApiResponse<Team>>)> {
    let editorial = state.editorial.clone();
    let team = detached(async move { editorial.create_team(request, &Actor::Admin).await }).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(team))))
}

pub async fn update_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TeamPatch>,
) -> Result<Json<ApiResponse<Team>>> {
    let editorial = state.editorial.clone();
    let team =
        detached(async move { editorial.update_team(&id, patch, &Actor::Admin).await }).await?;
    Ok(Json(ApiResponse::ok(team)))
}

pub async fn deactivate_team(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Team>>> {
    let editorial = state.editorial.clone();
    let team =
        detached(async move { editorial.deactivate_team(&id, &Actor::Admin).await }).await?;
    Ok(Json(ApiResponse::ok(team)))
}
