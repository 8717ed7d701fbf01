//! Submission lifecycle state machine
//!
//! ```text
//! submitted --> ce_review --> ae_review --> se_review --> approved --> published
//!                  ^ |             |             |
//!                  | +-------------+-------------+--> author_revision
//!                  +-------------------------------------+
//! ```
//!
//! `rejected` is reachable from every non-terminal status; `published` and
//! `rejected` are terminal. Re-applying the current status is accepted and
//! only re-stamps the submission.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::auth::Actor;
use crate::db::models::{Editor, EditorRole, FeedbackEntry, ReportRef, Submission, SubmissionStatus};
use crate::errors::{AppError, Result};
use crate::notify::{EditorAction, Notification};

use SubmissionStatus::*;

/// Targets reachable from `from`, excluding the self-transition
pub fn allowed_targets(from: SubmissionStatus) -> &'static [SubmissionStatus] {
    match from {
        Submitted => &[CeReview, Rejected],
        CeReview => &[AeReview, AuthorRevision, Rejected],
        AeReview => &[SeReview, AuthorRevision, Rejected],
        SeReview => &[Approved, AuthorRevision, Rejected],
        Approved => &[Published, Rejected],
        AuthorRevision => &[CeReview, Rejected],
        Published | Rejected => &[],
    }
}

pub fn can_transition(from: SubmissionStatus, to: SubmissionStatus) -> bool {
    from == to || allowed_targets(from).contains(&to)
}

pub fn validate_transition(from: SubmissionStatus, to: SubmissionStatus) -> Result<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Statuses in which an editor holding `role` owns the submission
fn owned_stages(role: EditorRole) -> &'static [SubmissionStatus] {
    match role {
        EditorRole::CopyEditor => &[CeReview, AuthorRevision],
        EditorRole::AssociateEditor => &[AeReview],
        EditorRole::SeniorEditor => &[SeReview, Approved],
        EditorRole::ManagingEditor | EditorRole::Admin => &[],
    }
}

/// Check that `actor` may move `submission` out of its current status
pub fn authorize(actor: &Actor, submission: &Submission) -> Result<()> {
    if actor.is_elevated() {
        return Ok(());
    }

    let editor = actor.editor().ok_or_else(|| AppError::Forbidden {
        message: format!("{} may not change submission status", actor.id()),
    })?;

    let assigned = submission.assignee_for(editor.role) == Some(editor.id.as_str());
    if !assigned {
        return Err(AppError::Forbidden {
            message: format!(
                "Editor {} is not the assigned {} of submission {}",
                editor.id, editor.role, submission.id
            ),
        });
    }

    if !owned_stages(editor.role).contains(&submission.status) {
        return Err(AppError::Forbidden {
            message: format!(
                "A {} cannot act on a submission in {}",
                editor.role, submission.status
            ),
        });
    }

    Ok(())
}

/// Requested status change with its optional attachments
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub new_status: SubmissionStatus,

    #[serde(default)]
    pub feedback: Option<String>,

    #[serde(default, alias = "plagiarismReport")]
    pub plagiarism_report_url: Option<String>,

    #[serde(default, alias = "aiCheckReport")]
    pub ai_check_report_url: Option<String>,
}

impl TransitionRequest {
    pub fn to(new_status: SubmissionStatus) -> Self {
        Self {
            new_status,
            feedback: None,
            plagiarism_report_url: None,
            ai_check_report_url: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    fn feedback_text(&self) -> Option<&str> {
        non_blank(self.feedback.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// What `apply_transition` changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedTransition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
}

impl AppliedTransition {
    pub fn description(&self) -> String {
        format!("Status: {} → {}", self.from, self.to)
    }

    /// Entered a new status rather than re-applying the current one
    pub fn is_move(&self) -> bool {
        self.from != self.to
    }
}

/// Validate and apply a transition to `submission` in place
pub fn apply_transition(
    submission: &mut Submission,
    actor: &Actor,
    request: &TransitionRequest,
    now: DateTime<Utc>,
) -> Result<AppliedTransition> {
    let from = submission.status;
    let to = request.new_status;

    validate_transition(from, to)?;
    authorize(actor, submission)?;

    submission.status = to;

    if let Some(text) = request.feedback_text() {
        submission.feedback.push(FeedbackEntry {
            editor_id: actor.id().to_string(),
            editor_name: actor.display_name().to_string(),
            status: to,
            feedback: text.to_string(),
            timestamp: now,
        });
    }

    if let Some(url) = non_blank(request.plagiarism_report_url.as_deref()) {
        submission.plagiarism_report = Some(ReportRef {
            url: url.to_string(),
            uploaded_at: now,
        });
    }

    if let Some(url) = non_blank(request.ai_check_report_url.as_deref()) {
        submission.ai_check_report = Some(ReportRef {
            url: url.to_string(),
            uploaded_at: now,
        });
    }

    if to == Published && submission.published_at.is_none() {
        submission.published_at = Some(now);
    }

    submission.updated_at = now;

    Ok(AppliedTransition { from, to })
}

/// Notifications owed after `transition` was persisted on `submission`
pub fn notifications_for(
    submission: &Submission,
    transition: AppliedTransition,
    feedback: Option<&str>,
    editors: &[Editor],
) -> Vec<Notification> {
    let mut notifications = vec![Notification::StatusUpdate {
        author_email: submission.author_email.clone(),
        author_name: submission.author_name.clone(),
        title: submission.title.clone(),
        status: transition.to,
        feedback: non_blank(feedback).map(str::to_string),
    }];

    if !transition.is_move() {
        return notifications;
    }

    let next = match (transition.from, transition.to) {
        (_, AeReview) => Some((submission.assigned_ae.as_deref(), EditorAction::ReadyForReview)),
        (_, SeReview) => Some((submission.assigned_se.as_deref(), EditorAction::ReadyForReview)),
        (AuthorRevision, CeReview) => {
            Some((submission.assigned_ce.as_deref(), EditorAction::RevisionSubmitted))
        }
        _ => None,
    };

    if let Some((Some(editor_id), action)) = next {
        if let Some(editor) = editors.iter().find(|e| e.id == editor_id) {
            notifications.push(Notification::EditorAction {
                editor_email: editor.email.clone(),
                editor_name: editor.name.clone(),
                title: submission.title.clone(),
                action,
            });
        }
    }

    notifications
}
