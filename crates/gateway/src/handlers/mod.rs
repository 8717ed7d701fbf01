//! API handlers module

pub mod audit;
pub mod editors;
pub mod health;
pub mod submissions;
pub mod teams;
pub mod webhooks;

use std::future::Future;

use editorial_common::notify::DeliveryWarning;
use editorial_common::{AppError, Outcome};
use serde::Serialize;

/// Success envelope shared by every data-returning route
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    /// Undelivered notifications; the operation itself succeeded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DeliveryWarning>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            warnings: Vec::new(),
        }
    }
}

impl<T> From<Outcome<T>> for ApiResponse<T> {
    fn from(outcome: Outcome<T>) -> Self {
        Self {
            success: true,
            data: outcome.value,
            warnings: outcome.warnings,
        }
    }
}

/// Run a write sequence on its own task.
///
/// The request timeout or a dropped connection cancels only the wait, so a
/// stored record always gets its audit entry and follow-up writes.
pub async fn detached<T, F>(operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation).await.map_err(|e| AppError::Internal {
        message: format!("Workflow task failed: {}", e),
    })?
}
