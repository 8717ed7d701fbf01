//! Admin key guard for board-management routes

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use editorial_common::{auth::admin_key_matches, AppError};

use crate::AppState;

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Check `headers` carry the configured admin key
pub fn check_admin_key(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let presented = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if admin_key_matches(state.config.auth.admin_key.as_deref(), presented) {
        Ok(())
    } else {
        Err(AppError::Unauthorized {
            message: "Missing or invalid admin key".to_string(),
        })
    }
}

/// Reject the request unless it carries the configured admin key
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if let Err(err) = check_admin_key(&state, request.headers()) {
        tracing::warn!(path = %request.uri().path(), "Admin key missing or invalid");
        return Err(err);
    }

    Ok(next.run(request).await)
}
