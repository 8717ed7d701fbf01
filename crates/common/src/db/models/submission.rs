//! Submission document and its lifecycle status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::editor::EditorRole;
use crate::errors::AppError;

/// Submission status enum
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    CeReview,
    AeReview,
    SeReview,
    Approved,
    AuthorRevision,
    Published,
    Rejected,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 8] = [
        SubmissionStatus::Submitted,
        SubmissionStatus::CeReview,
        SubmissionStatus::AeReview,
        SubmissionStatus::SeReview,
        SubmissionStatus::Approved,
        SubmissionStatus::AuthorRevision,
        SubmissionStatus::Published,
        SubmissionStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::CeReview => "ce_review",
            SubmissionStatus::AeReview => "ae_review",
            SubmissionStatus::SeReview => "se_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::AuthorRevision => "author_revision",
            SubmissionStatus::Published => "published",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    /// Publication and rejection end the lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Published | SubmissionStatus::Rejected)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                AppError::invalid("newStatus", format!("Unknown submission status: {}", s))
            })
    }
}

/// How the submission entered the pipeline
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    #[default]
    Api,
    GoogleForm,
}

/// One uploaded revision of the manuscript
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub version: u32,
    pub document_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Editor feedback recorded alongside a status change
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub editor_id: String,
    pub editor_name: String,
    pub status: SubmissionStatus,
    pub feedback: String,
    pub timestamp: DateTime<Utc>,
}

/// External plagiarism or AI-check report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRef {
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,

    pub title: String,

    pub author_name: String,

    pub author_email: String,

    #[serde(default)]
    pub author_affiliation: String,

    #[serde(rename = "abstract", default)]
    pub abstract_text: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub document_url: String,

    /// Append-only
    #[serde(default)]
    pub versions: Vec<DocumentVersion>,

    pub status: SubmissionStatus,

    #[serde(default)]
    pub team_id: Option<String>,

    #[serde(rename = "assignedCE", default)]
    pub assigned_ce: Option<String>,

    #[serde(rename = "assignedAE", default)]
    pub assigned_ae: Option<String>,

    #[serde(rename = "assignedSE", default)]
    pub assigned_se: Option<String>,

    /// Append-only
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,

    #[serde(default)]
    pub plagiarism_report: Option<ReportRef>,

    #[serde(default)]
    pub ai_check_report: Option<ReportRef>,

    #[serde(default)]
    pub source: SubmissionSource,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_response_id: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Set once, on the first transition into `published`
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,

    /// Id of the last status change or assignment written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_change_id: Option<String>,
}

fn default_category() -> String {
    "General".to_string()
}

impl Submission {
    /// Editor assigned to the stage handled by `role`
    pub fn assignee_for(&self, role: EditorRole) -> Option<&str> {
        match role {
            EditorRole::CopyEditor => self.assigned_ce.as_deref(),
            EditorRole::AssociateEditor => self.assigned_ae.as_deref(),
            EditorRole::SeniorEditor => self.assigned_se.as_deref(),
            EditorRole::ManagingEditor | EditorRole::Admin => None,
        }
    }

    /// Whether `editor_id` holds any of the three assignment slots
    pub fn involves_editor(&self, editor_id: &str) -> bool {
        [&self.assigned_ce, &self.assigned_ae, &self.assigned_se]
            .iter()
            .any(|slot| slot.as_deref() == Some(editor_id))
    }

    /// Still waiting for the assignment engine
    pub fn is_unassigned(&self) -> bool {
        self.status == SubmissionStatus::Submitted && self.assigned_ce.is_none()
    }
}
