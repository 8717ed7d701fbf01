//! Status transitions and auto-assignment

use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::{required, Editorial};
use crate::auth::Actor;
use crate::db::models::{generate_id, AuditAction, Submission, SubmissionStatus};
use crate::db::Change;
use crate::errors::{AppError, Result};
use crate::lifecycle::{apply_transition, notifications_for, TransitionRequest};
use crate::metrics;
use crate::notify::{EditorAction, Notification, Outcome};

/// Status change request as received from an editor
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub submission_id: Option<String>,

    pub editor_id: Option<String>,

    pub new_status: Option<String>,

    pub feedback: Option<String>,

    #[serde(alias = "plagiarismReport")]
    pub plagiarism_report_url: Option<String>,

    #[serde(alias = "aiCheckReport")]
    pub ai_check_report_url: Option<String>,
}

impl Editorial {
    /// Move a submission through the lifecycle on behalf of an editor
    #[instrument(skip(self, update), fields(submission_id = ?update.submission_id))]
    pub async fn update_status(&self, update: StatusUpdate) -> Result<Outcome<Submission>> {
        let submission_id = required("submissionId", update.submission_id.as_deref())?;
        let editor_id = required("editorId", update.editor_id.as_deref())?;
        let new_status: SubmissionStatus =
            required("newStatus", update.new_status.as_deref())?.parse()?;

        let (editors, submissions) =
            futures::try_join!(self.repos.editors.load(), self.repos.submissions.load())?;
        if !submissions.items.iter().any(|s| s.id == submission_id) {
            return Err(AppError::not_found("Submission", submission_id));
        }
        let editors = editors.items;
        let actor = match Actor::reserved(&editor_id) {
            Some(actor) => actor,
            None => super::find_active_editor(&editors, &editor_id)
                .map(|editor| Actor::Editor(editor.to_public()))?,
        };

        let request = TransitionRequest {
            new_status,
            feedback: update.feedback,
            plagiarism_report_url: update.plagiarism_report_url,
            ai_check_report_url: update.ai_check_report_url,
        };

        let change_id = generate_id("chg");
        let mut applied = None;
        let (submission, transition) = self
            .repos
            .submissions
            .mutate(|items| {
                let submission = items
                    .iter_mut()
                    .find(|s| s.id == submission_id)
                    .ok_or_else(|| AppError::not_found("Submission", submission_id.clone()))?;

                // An earlier attempt landed even though its write reported failure
                if let Some(transition) = applied {
                    if submission.last_change_id.as_deref() == Some(change_id.as_str()) {
                        return Ok(Change::unchanged((submission.clone(), transition)));
                    }
                }

                let transition = apply_transition(submission, &actor, &request, Utc::now())?;
                submission.last_change_id = Some(change_id.clone());
                applied = Some(transition);
                let description = transition.description();
                Ok(Change::new((submission.clone(), transition), description))
            })
            .await?;

        metrics::record_transition(transition.from.as_str(), transition.to.as_str());
        info!(
            submission_id = %submission.id,
            from = %transition.from,
            to = %transition.to,
            actor = actor.id(),
            "Submission status changed"
        );

        self.audit
            .record(
                AuditAction::StatusChanged,
                actor.id(),
                json!({
                    "submissionId": submission.id,
                    "oldStatus": transition.from,
                    "newStatus": transition.to,
                    "editorId": actor.id(),
                    "editorName": actor.display_name(),
                }),
                format!("\"{}\" {}", submission.title, transition.description()),
            )
            .await?;

        let notifications =
            notifications_for(&submission, transition, request.feedback.as_deref(), &editors);
        let warnings = self.dispatcher.deliver_all(notifications).await;

        Ok(Outcome::with_warnings(submission, warnings))
    }

    /// Run the assignment engine for a freshly stored submission.
    ///
    /// With no eligible copy editor the submission is returned unchanged and
    /// waits for `assign_pending`.
    pub async fn run_assignment(&self, submission: Submission) -> Result<Outcome<Submission>> {
        let (editors, teams) =
            futures::try_join!(self.repos.editors.load(), self.repos.teams.load())?;
        let (editors, teams) = (editors.items, teams.items);

        let Some(plan) = self.engine.plan(&editors, &teams) else {
            metrics::record_assignment("no_pool");
            warn!(submission_id = %submission.id, "No active copy editor available, submission held");
            return Ok(Outcome::new(submission));
        };

        let description = format!("Auto-assigned to {}", plan.copy_editor.name);
        let change_id = generate_id("chg");
        let assigned = self
            .repos
            .submissions
            .mutate(|items| {
                let Some(stored) = items.iter_mut().find(|s| s.id == submission.id) else {
                    return Err(AppError::not_found("Submission", submission.id.clone()));
                };
                if stored.last_change_id.as_deref() == Some(change_id.as_str()) {
                    return Ok(Change::unchanged(Some(stored.clone())));
                }
                if plan.apply(stored, Utc::now()) {
                    stored.last_change_id = Some(change_id.clone());
                    Ok(Change::new(Some(stored.clone()), description.clone()))
                } else {
                    Ok(Change::unchanged(None))
                }
            })
            .await?;

        let Some(assigned) = assigned else {
            metrics::record_assignment("skipped");
            return self.get_submission(&submission.id).await.map(Outcome::new);
        };
        metrics::record_assignment("assigned");

        info!(
            submission_id = %assigned.id,
            team_id = %plan.team_id,
            copy_editor = %plan.copy_editor.id,
            "Submission assigned"
        );

        self.audit
            .record(
                AuditAction::SubmissionAssigned,
                Actor::System.id(),
                json!({
                    "submissionId": assigned.id,
                    "teamId": plan.team_id,
                    "assignedCE": assigned.assigned_ce,
                    "assignedAE": assigned.assigned_ae,
                    "assignedSE": assigned.assigned_se,
                }),
                description,
            )
            .await?;

        let warnings = self
            .dispatcher
            .deliver(Notification::EditorAction {
                editor_email: plan.copy_editor.email.clone(),
                editor_name: plan.copy_editor.name.clone(),
                title: assigned.title.clone(),
                action: EditorAction::Assigned,
            })
            .await
            .into_iter()
            .collect();

        Ok(Outcome::with_warnings(assigned, warnings))
    }

    /// Assign every submission still waiting for a copy editor
    #[instrument(skip(self))]
    pub async fn assign_pending(&self) -> Result<Outcome<Vec<Submission>>> {
        let pending: Vec<Submission> = self
            .repos
            .submissions
            .load()
            .await?
            .items
            .into_iter()
            .filter(Submission::is_unassigned)
            .collect();

        let mut assigned = Vec::new();
        let mut warnings = Vec::new();
        for submission in pending {
            let outcome = self.run_assignment(submission).await?;
            warnings.extend(outcome.warnings);
            if !outcome.value.is_unassigned() {
                assigned.push(outcome.value);
            }
        }

        info!(count = assigned.len(), "Pending submissions assigned");
        Ok(Outcome::with_warnings(assigned, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{fixture, Fixture};
    use super::*;
    use crate::audit::AuditQuery;
    use crate::db::models::{EditorRole, PublicEditor};

    struct Board {
        f: Fixture,
        ce: PublicEditor,
        ae: PublicEditor,
        se: PublicEditor,
        submission: Submission,
    }

    async fn board() -> Board {
        let f = fixture();
        let team = f.team("T1").await;
        let ce = f.editor("E1", EditorRole::CopyEditor, &team).await;
        let ae = f.editor("E2", EditorRole::AssociateEditor, &team).await;
        let se = f.editor("E3", EditorRole::SeniorEditor, &team).await;
        let submission = f.editorial.submit(Fixture::submission()).await.unwrap().value;
        Board {
            f,
            ce,
            ae,
            se,
            submission,
        }
    }

    fn update(submission: &Submission, editor_id: &str, status: &str) -> StatusUpdate {
        StatusUpdate {
            submission_id: Some(submission.id.clone()),
            editor_id: Some(editor_id.to_string()),
            new_status: Some(status.to_string()),
            ..StatusUpdate::default()
        }
    }

    #[tokio::test]
    async fn test_full_pipeline_to_publication() {
        let b = board().await;
        let editorial = &b.f.editorial;

        editorial.update_status(update(&b.submission, &b.ce.id, "ae_review")).await.unwrap();
        editorial.update_status(update(&b.submission, &b.ae.id, "se_review")).await.unwrap();
        editorial.update_status(update(&b.submission, &b.se.id, "approved")).await.unwrap();
        let published = editorial
            .update_status(update(&b.submission, &b.se.id, "published"))
            .await
            .unwrap()
            .value;

        assert_eq!(published.status, SubmissionStatus::Published);
        let published_at = published.published_at.unwrap();

        let again = editorial
            .update_status(update(&b.submission, "admin", "published"))
            .await
            .unwrap()
            .value;
        assert_eq!(again.published_at, Some(published_at));

        let changes = editorial
            .audit_log(&AuditQuery {
                action: Some(AuditAction::StatusChanged),
                submission_id: Some(b.submission.id.clone()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(changes.len(), 5);
        assert_eq!(changes[0].detail("editorName"), Some("Admin"));
        assert_eq!(changes[4].detail("oldStatus"), Some("ce_review"));
        assert_eq!(changes[4].detail("editorName"), Some("E1"));
    }

    #[tokio::test]
    async fn test_wrong_editor_is_forbidden() {
        let b = board().await;
        let err = b
            .f
            .editorial
            .update_status(update(&b.submission, &b.ae.id, "ae_review"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let stored = b.f.editorial.get_submission(&b.submission.id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::CeReview);
    }

    #[tokio::test]
    async fn test_illegal_transition_leaves_submission_untouched() {
        let b = board().await;
        let err = b
            .f
            .editorial
            .update_status(update(&b.submission, "admin", "published"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        let stored = b.f.editorial.get_submission(&b.submission.id).await.unwrap();
        assert_eq!(stored.updated_at, b.submission.updated_at);
    }

    #[tokio::test]
    async fn test_unknown_submission_and_status() {
        let b = board().await;
        let ghost = Submission {
            id: "sub-ghost".to_string(),
            ..b.submission.clone()
        };
        let err = b.f.editorial.update_status(update(&ghost, "admin", "rejected")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));

        let err = b
            .f
            .editorial
            .update_status(update(&b.submission, "admin", "in_limbo"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = b
            .f
            .editorial
            .update_status(StatusUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "submissionId"));
    }

    #[tokio::test]
    async fn test_unknown_submission_reported_before_unknown_editor() {
        let b = board().await;
        let ghost = Submission {
            id: "sub-ghost".to_string(),
            ..b.submission.clone()
        };
        let err = b
            .f
            .editorial
            .update_status(update(&ghost, "editor-nobody", "rejected"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_unacknowledged_transition_is_applied_once() {
        let b = board().await;
        b.f.store.lose_next_acks(1).await;

        let mut request = update(&b.submission, &b.ce.id, "ae_review");
        request.feedback = Some("Clean copy".to_string());
        let outcome = b.f.editorial.update_status(request).await.unwrap();
        assert_eq!(outcome.value.status, SubmissionStatus::AeReview);

        let stored = b.f.editorial.get_submission(&b.submission.id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::AeReview);
        assert_eq!(stored.feedback.len(), 1);

        let changes = b
            .f
            .editorial
            .audit_log(&AuditQuery {
                action: Some(AuditAction::StatusChanged),
                submission_id: Some(b.submission.id.clone()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].detail("oldStatus"), Some("ce_review"));
    }

    #[tokio::test]
    async fn test_revision_loop_keeps_feedback() {
        let b = board().await;
        let editorial = &b.f.editorial;

        let mut request = update(&b.submission, &b.ce.id, "author_revision");
        request.feedback = Some("Tighten the literature review".to_string());
        editorial.update_status(request).await.unwrap();

        let mut request = update(&b.submission, &b.ce.id, "ce_review");
        request.feedback = Some("Revision received".to_string());
        let sub = editorial.update_status(request).await.unwrap().value;

        assert_eq!(sub.feedback.len(), 2);
        assert_eq!(sub.feedback[0].status, SubmissionStatus::AuthorRevision);
        assert_eq!(sub.feedback[1].editor_name, "E1");
        assert_eq!(sub.assigned_ce.as_deref(), Some(b.ce.id.as_str()));

        let sent = b.f.notifier.sent().await;
        assert!(sent.iter().any(|n| n.kind() == "editor_revision_submitted"));
    }

    #[tokio::test]
    async fn test_notification_failure_is_partial_success() {
        let b = board().await;
        b.f.notifier.fail_for("e2@gnlu.ac.in").await;

        let outcome = b
            .f
            .editorial
            .update_status(update(&b.submission, &b.ce.id, "ae_review"))
            .await
            .unwrap();

        assert_eq!(outcome.value.status, SubmissionStatus::AeReview);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].recipient, "e2@gnlu.ac.in");
        assert_eq!(outcome.warnings[0].kind, "editor_ready_for_review");
    }

    #[tokio::test]
    async fn test_form_webhook_cannot_change_status() {
        let b = board().await;
        let err = b
            .f
            .editorial
            .update_status(update(&b.submission, "google_forms_webhook", "rejected"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_assign_pending_picks_up_held_submissions() {
        let f = fixture();
        let team = f.team("T1").await;
        let held = f.editorial.submit(Fixture::submission()).await.unwrap().value;
        assert!(held.is_unassigned());

        let ce = f.editor("E1", EditorRole::CopyEditor, &team).await;
        let outcome = f.editorial.assign_pending().await.unwrap();
        assert_eq!(outcome.value.len(), 1);
        assert_eq!(outcome.value[0].id, held.id);
        assert_eq!(outcome.value[0].assigned_ce.as_deref(), Some(ce.id.as_str()));
        assert_eq!(outcome.value[0].status, SubmissionStatus::CeReview);

        let again = f.editorial.assign_pending().await.unwrap();
        assert!(again.value.is_empty());
    }

    #[tokio::test]
    async fn test_assignment_runs_once() {
        let b = board().await;
        let outcome = b.f.editorial.run_assignment(b.submission.clone()).await.unwrap();
        assert_eq!(outcome.value.assigned_ce, b.submission.assigned_ce);

        let assigned = b
            .f
            .editorial
            .audit_log(&AuditQuery {
                action: Some(AuditAction::SubmissionAssigned),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(assigned.len(), 1);
    }

    #[test]
    fn test_status_update_accepts_report_aliases() {
        let update: StatusUpdate = serde_json::from_value(json!({
            "submissionId": "sub-1",
            "editorId": "admin",
            "newStatus": "ae_review",
            "plagiarismReport": "https://reports/p.pdf"
        }))
        .unwrap();
        assert_eq!(update.plagiarism_report_url.as_deref(), Some("https://reports/p.pdf"));
        assert!(update.ai_check_report_url.is_none());
    }
}
