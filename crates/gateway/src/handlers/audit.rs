//! Audit log handler

use axum::{
    extract::{Query, State},
    Json,
};

use super::ApiResponse;
use crate::AppState;
use editorial_common::{audit::AuditQuery, db::models::AuditLogEntry, errors::Result};

/// Newest-first audit entries, e.g. `?action=STATUS_CHANGED&submissionId=sub-1&limit=50`
pub async fn audit_log(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<Vec<AuditLogEntry>>>> {
    let entries = state.editorial.audit_log(&query).await?;
    Ok(Json(ApiResponse::ok(entries)))
}
