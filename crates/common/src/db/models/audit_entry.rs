//! Audit log entry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Action tag of an audit entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SubmissionCreated,
    SubmissionAssigned,
    StatusChanged,
    EditorAdded,
    EditorUpdated,
    EditorRemoved,
    AccessCodeRegenerated,
    TeamAdded,
    TeamUpdated,
    TeamRemoved,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::SubmissionCreated => "SUBMISSION_CREATED",
            AuditAction::SubmissionAssigned => "SUBMISSION_ASSIGNED",
            AuditAction::StatusChanged => "STATUS_CHANGED",
            AuditAction::EditorAdded => "EDITOR_ADDED",
            AuditAction::EditorUpdated => "EDITOR_UPDATED",
            AuditAction::EditorRemoved => "EDITOR_REMOVED",
            AuditAction::AccessCodeRegenerated => "ACCESS_CODE_REGENERATED",
            AuditAction::TeamAdded => "TEAM_ADDED",
            AuditAction::TeamUpdated => "TEAM_UPDATED",
            AuditAction::TeamRemoved => "TEAM_REMOVED",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of a state-changing action
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,

    pub action: AuditAction,

    #[serde(default)]
    pub details: Map<String, Value>,

    pub performed_by: String,

    pub timestamp: DateTime<Utc>,

    pub description: String,
}

impl AuditLogEntry {
    /// String value of a details key
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).and_then(Value::as_str)
    }
}
