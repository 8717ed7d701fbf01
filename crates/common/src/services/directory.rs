//! Editor and team management, access-code authentication

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use super::{required, require_elevated, Editorial};
use crate::auth::{verify_access_code, Actor, HashedAccessCode};
use crate::db::models::{
    generate_id, AuditAction, Editor, EditorRole, PublicEditor, Submission, Team, TeamSummary,
};
use crate::db::Change;
use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewEditor {
    #[validate(length(max = 200))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub role: Option<String>,

    pub team_id: Option<String>,
}

/// A freshly created editor with the only copy of their access code
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEditor {
    #[serde(flatten)]
    pub editor: PublicEditor,
    pub access_code: String,
}

/// Partial editor update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditorPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(email)]
    pub email: Option<String>,

    pub role: Option<String>,

    pub team_id: Option<String>,

    pub active: Option<bool>,

    #[serde(default)]
    pub regenerate_access_code: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatedEditor {
    #[serde(flatten)]
    pub editor: PublicEditor,

    /// Present only when the code was regenerated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    #[validate(length(max = 200))]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeamPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    pub active: Option<bool>,
}

fn require_active_team(teams: &[Team], team_id: Option<&str>) -> Result<()> {
    let team_id = required("teamId", team_id)?;
    if teams.iter().any(|team| team.id == team_id && team.active) {
        Ok(())
    } else {
        Err(AppError::invalid(
            "teamId",
            format!("Team {} does not exist or is inactive", team_id),
        ))
    }
}

/// Trimmed replacement name, rejecting one that is blank after trimming
fn patched_name(name: Option<&str>) -> Result<Option<String>> {
    match name.map(str::trim) {
        Some("") => Err(AppError::invalid("name", "Name cannot be blank")),
        other => Ok(other.map(str::to_string)),
    }
}

fn team_summary(team: Team, editors: &[Editor], submissions: &[Submission]) -> TeamSummary {
    let members = |role: EditorRole| editors.iter().filter(|e| e.serves(role, &team.id)).count();
    let senior_editors = members(EditorRole::SeniorEditor);
    let associate_editors = members(EditorRole::AssociateEditor);
    let copy_editors = members(EditorRole::CopyEditor);

    let team_submissions: Vec<_> = submissions
        .iter()
        .filter(|s| s.team_id.as_deref() == Some(team.id.as_str()))
        .collect();
    let active_submissions = team_submissions.iter().filter(|s| !s.status.is_terminal()).count();

    TeamSummary {
        senior_editors,
        associate_editors,
        copy_editors,
        total_members: senior_editors + associate_editors + copy_editors,
        active_submissions,
        total_submissions: team_submissions.len(),
        team,
    }
}

impl Editorial {
    /// Create an editor and issue their access code
    #[instrument(skip(self, request, actor), fields(actor = actor.id()))]
    pub async fn create_editor(&self, request: NewEditor, actor: &Actor) -> Result<CreatedEditor> {
        require_elevated(actor)?;
        let name = required("name", request.name.as_deref())?;
        let email = required("email", request.email.as_deref())?;
        let role: EditorRole = required("role", request.role.as_deref())?.parse()?;
        request.validate()?;

        let team_id = if role.requires_team() {
            let teams = self.repos.teams.load().await?.items;
            require_active_team(&teams, request.team_id.as_deref())?;
            request.team_id.as_deref().map(|id| id.trim().to_string())
        } else {
            None
        };

        let description = format!("New editor \"{}\" added as {}", name, role);
        let editor_id = generate_id("editor");
        let mut issued: Option<String> = None;
        let (editor, access_code) = self
            .repos
            .editors
            .mutate(|editors| {
                if let (Some(existing), Some(code)) =
                    (editors.iter().find(|e| e.id == editor_id), issued.as_ref())
                {
                    return Ok(Change::unchanged((existing.to_public(), code.clone())));
                }

                let access_code = self.codes.generate_unique(editors);
                let hashed = HashedAccessCode::new(&access_code);
                let now = Utc::now();
                let editor = Editor {
                    id: editor_id.clone(),
                    name: name.clone(),
                    email: email.clone(),
                    role,
                    team_id: team_id.clone(),
                    access_code_hash: hashed.hash,
                    access_code_salt: hashed.salt,
                    active: true,
                    created_at: now,
                    updated_at: now,
                };
                editors.push(editor.clone());
                issued = Some(access_code.clone());
                Ok(Change::new((editor.to_public(), access_code), description.clone()))
            })
            .await?;

        info!(editor_id = %editor.id, role = %editor.role, "Editor created");

        self.audit
            .record(
                AuditAction::EditorAdded,
                actor.id(),
                json!({
                    "editorId": editor.id,
                    "name": editor.name,
                    "role": editor.role,
                    "teamId": editor.team_id,
                }),
                description,
            )
            .await?;

        Ok(CreatedEditor {
            editor,
            access_code,
        })
    }

    /// Apply a partial update, optionally issuing a new access code
    #[instrument(skip(self, patch, actor), fields(actor = actor.id()))]
    pub async fn update_editor(&self, id: &str, patch: EditorPatch, actor: &Actor) -> Result<UpdatedEditor> {
        require_elevated(actor)?;
        patch.validate()?;
        let name = patched_name(patch.name.as_deref())?;
        let role = patch.role.as_deref().map(str::parse::<EditorRole>).transpose()?;
        let teams = self.repos.teams.load().await?.items;

        let (editor, access_code, changes) = self
            .repos
            .editors
            .mutate(|editors| {
                let access_code = patch
                    .regenerate_access_code
                    .then(|| self.codes.generate_unique(editors));

                let editor = editors
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| AppError::not_found("Editor", id))?;

                let mut changes = Vec::new();
                if let Some(name) = &name {
                    editor.name = name.clone();
                    changes.push("name");
                }
                if let Some(email) = patch.email.as_deref().map(str::trim) {
                    editor.email = email.to_string();
                    changes.push("email");
                }
                if let Some(role) = role {
                    editor.role = role;
                    changes.push("role");
                }
                if let Some(team_id) = &patch.team_id {
                    editor.team_id = Some(team_id.trim().to_string());
                    changes.push("teamId");
                }
                if let Some(active) = patch.active {
                    editor.active = active;
                    changes.push("active");
                }

                if editor.role.requires_team() {
                    if role.is_some() || patch.team_id.is_some() {
                        require_active_team(&teams, editor.team_id.as_deref())?;
                    }
                } else {
                    editor.team_id = None;
                }

                if let Some(code) = &access_code {
                    let hashed = HashedAccessCode::new(code);
                    editor.access_code_hash = hashed.hash;
                    editor.access_code_salt = hashed.salt;
                    changes.push("accessCode");
                }

                if changes.is_empty() {
                    return Ok(Change::unchanged((editor.to_public(), None, changes)));
                }

                editor.updated_at = Utc::now();
                let description = format!("Editor \"{}\" updated", editor.name);
                Ok(Change::new((editor.to_public(), access_code.clone(), changes), description))
            })
            .await?;

        if changes.is_empty() {
            return Ok(UpdatedEditor {
                editor,
                access_code: None,
            });
        }

        info!(editor_id = %editor.id, changes = ?changes, "Editor updated");

        self.audit
            .record(
                AuditAction::EditorUpdated,
                actor.id(),
                json!({
                    "editorId": editor.id,
                    "name": editor.name,
                    "changes": changes,
                }),
                format!("Editor \"{}\" updated", editor.name),
            )
            .await?;

        if access_code.is_some() {
            self.audit
                .record(
                    AuditAction::AccessCodeRegenerated,
                    actor.id(),
                    json!({
                        "editorId": editor.id,
                        "name": editor.name,
                    }),
                    format!("Access code regenerated for \"{}\"", editor.name),
                )
                .await?;
        }

        Ok(UpdatedEditor {
            editor,
            access_code,
        })
    }

    /// Logical removal; historical references stay valid
    #[instrument(skip(self, actor), fields(actor = actor.id()))]
    pub async fn deactivate_editor(&self, id: &str, actor: &Actor) -> Result<PublicEditor> {
        require_elevated(actor)?;

        let now = Utc::now();
        let (editor, changed) = self
            .repos
            .editors
            .mutate(|editors| {
                let editor = editors
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| AppError::not_found("Editor", id))?;
                if !editor.active {
                    // Stamped `now` only if our own earlier attempt landed
                    let ours = editor.updated_at == now;
                    return Ok(Change::unchanged((editor.to_public(), ours)));
                }
                editor.active = false;
                editor.updated_at = now;
                let description = format!("Editor \"{}\" deactivated", editor.name);
                Ok(Change::new((editor.to_public(), true), description))
            })
            .await?;

        if changed {
            info!(editor_id = %editor.id, "Editor deactivated");
            self.audit
                .record(
                    AuditAction::EditorRemoved,
                    actor.id(),
                    json!({
                        "editorId": editor.id,
                        "name": editor.name,
                    }),
                    format!("Editor \"{}\" removed", editor.name),
                )
                .await?;
        }

        Ok(editor)
    }

    /// All editors, inactive included, without credentials
    pub async fn list_editors(&self) -> Result<Vec<PublicEditor>> {
        let editors = self.repos.editors.load().await?.items;
        Ok(editors.iter().map(Editor::to_public).collect())
    }

    /// Profile of the active editor holding `code`
    pub async fn authenticate(&self, code: &str) -> Result<PublicEditor> {
        let code = required("accessCode", Some(code))?;
        let editors = self.repos.editors.load().await?.items;
        editors
            .iter()
            .find(|editor| editor.active && verify_access_code(editor, &code))
            .map(Editor::to_public)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Invalid access code".to_string(),
            })
    }

    #[instrument(skip(self, request, actor), fields(actor = actor.id()))]
    pub async fn create_team(&self, request: NewTeam, actor: &Actor) -> Result<Team> {
        require_elevated(actor)?;
        let name = required("name", request.name.as_deref())?;
        request.validate()?;

        let team = Team {
            id: generate_id("team"),
            name,
            active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        let description = format!("New team \"{}\" created", team.name);

        self.repos
            .teams
            .mutate(|teams| {
                if teams.iter().any(|t| t.id == team.id) {
                    return Ok(Change::unchanged(()));
                }
                teams.push(team.clone());
                Ok(Change::new((), description.clone()))
            })
            .await?;

        info!(team_id = %team.id, "Team created");

        self.audit
            .record(
                AuditAction::TeamAdded,
                actor.id(),
                json!({
                    "teamId": team.id,
                    "name": team.name,
                }),
                description,
            )
            .await?;

        Ok(team)
    }

    #[instrument(skip(self, patch, actor), fields(actor = actor.id()))]
    pub async fn update_team(&self, id: &str, patch: TeamPatch, actor: &Actor) -> Result<Team> {
        require_elevated(actor)?;
        patch.validate()?;
        let name = patched_name(patch.name.as_deref())?;

        let (team, changes) = self
            .repos
            .teams
            .mutate(|teams| {
                let team = teams
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| AppError::not_found("Team", id))?;

                let mut changes = Vec::new();
                if let Some(name) = &name {
                    team.name = name.clone();
                    changes.push("name");
                }
                if let Some(active) = patch.active {
                    team.active = active;
                    changes.push("active");
                }
                if changes.is_empty() {
                    return Ok(Change::unchanged((team.clone(), changes)));
                }

                team.updated_at = Some(Utc::now());
                let description = format!("Team \"{}\" updated", team.name);
                Ok(Change::new((team.clone(), changes), description))
            })
            .await?;

        if !changes.is_empty() {
            self.audit
                .record(
                    AuditAction::TeamUpdated,
                    actor.id(),
                    json!({
                        "teamId": team.id,
                        "name": team.name,
                        "changes": changes,
                    }),
                    format!("Team \"{}\" updated", team.name),
                )
                .await?;
        }

        Ok(team)
    }

    /// Deactivated teams drop out of the assignment pool
    #[instrument(skip(self, actor), fields(actor = actor.id()))]
    pub async fn deactivate_team(&self, id: &str, actor: &Actor) -> Result<Team> {
        require_elevated(actor)?;

        let now = Utc::now();
        let (team, changed) = self
            .repos
            .teams
            .mutate(|teams| {
                let team = teams
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or_else(|| AppError::not_found("Team", id))?;
                if !team.active {
                    let ours = team.updated_at == Some(now);
                    return Ok(Change::unchanged((team.clone(), ours)));
                }
                team.active = false;
                team.updated_at = Some(now);
                let description = format!("Team \"{}\" deactivated", team.name);
                Ok(Change::new((team.clone(), true), description))
            })
            .await?;

        if changed {
            info!(team_id = %team.id, "Team deactivated");
            self.audit
                .record(
                    AuditAction::TeamRemoved,
                    actor.id(),
                    json!({
                        "teamId": team.id,
                        "name": team.name,
                    }),
                    format!("Team \"{}\" removed", team.name),
                )
                .await?;
        }

        Ok(team)
    }

    /// Teams with member and workload counts
    pub async fn list_teams(&self) -> Result<Vec<TeamSummary>> {
        let (teams, editors, submissions) = futures::try_join!(
            self.repos.teams.load(),
            self.repos.editors.load(),
            self.repos.submissions.load()
        )?;

        Ok(teams
            .items
            .into_iter()
            .map(|team| team_summary(team, &editors.items, &submissions.items))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{fixture, Fixture};
    use super::*;
    use crate::audit::AuditQuery;
    use crate::db::models::{AuditLogEntry, SubmissionStatus};
    use crate::db::{Collection, DocumentStore};

    fn new_editor(name: &str, role: &str, team_id: Option<&str>) -> NewEditor {
        NewEditor {
            name: Some(name.to_string()),
            email: Some(format!("{}@gnlu.ac.in", name.to_lowercase())),
            role: Some(role.to_string()),
            team_id: team_id.map(str::to_string),
        }
    }

    async fn last_audit(f: &Fixture, action: AuditAction) -> Vec<AuditLogEntry> {
        f.editorial
            .audit_log(&AuditQuery {
                action: Some(action),
                ..AuditQuery::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_created_editor_can_authenticate() {
        let f = fixture();
        let team = f.team("T1").await;
        let created = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", Some(&team.id)), &Actor::Admin)
            .await
            .unwrap();

        assert!(created.access_code.starts_with("gcadr-"));
        assert_eq!(created.access_code.len(), "gcadr-".len() + 8);

        let profile = f.editorial.authenticate(&created.access_code).await.unwrap();
        assert_eq!(profile.id, created.editor.id);

        let err = f.editorial.authenticate("gcadr-wrong000").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));

        // Plaintext code never reaches storage or the audit log
        let stored = f.store.read(Collection::Editors).await.unwrap().documents.to_string();
        assert!(!stored.contains(&created.access_code));
        let added = last_audit(&f, AuditAction::EditorAdded).await;
        assert_eq!(added[0].description, "New editor \"Priya\" added as copy_editor");
        assert_eq!(added[0].detail("teamId"), Some(team.id.as_str()));
    }

    #[tokio::test]
    async fn test_create_editor_validation() {
        let f = fixture();
        let team = f.team("T1").await;

        let err = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", None), &Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MissingField { ref field } if field == "teamId"));

        let err = f
            .editorial
            .create_editor(new_editor("Priya", "editor_in_chief", Some(&team.id)), &Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", Some("team-missing")), &Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let mut bad_email = new_editor("Priya", "copy_editor", Some(&team.id));
        bad_email.email = Some("priya-at-gnlu".to_string());
        let err = f.editorial.create_editor(bad_email, &Actor::Admin).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let managing = f
            .editorial
            .create_editor(new_editor("Meera", "managing_editor", None), &Actor::Admin)
            .await
            .unwrap();
        assert!(managing.editor.team_id.is_none());
    }

    #[tokio::test]
    async fn test_non_elevated_actor_cannot_manage() {
        let f = fixture();
        let team = f.team("T1").await;
        let ce = f.editor("E1", EditorRole::CopyEditor, &team).await;

        let err = f
            .editorial
            .create_team(NewTeam { name: Some("T2".to_string()) }, &Actor::Editor(ce.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let err = f.editorial.deactivate_editor(&ce.id, &Actor::FormWebhook).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_regenerate_access_code() {
        let f = fixture();
        let team = f.team("T1").await;
        let created = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", Some(&team.id)), &Actor::Admin)
            .await
            .unwrap();

        let updated = f
            .editorial
            .update_editor(
                &created.editor.id,
                EditorPatch {
                    name: Some("Priya S.".to_string()),
                    regenerate_access_code: true,
                    ..EditorPatch::default()
                },
                &Actor::Admin,
            )
            .await
            .unwrap();

        let new_code = updated.access_code.unwrap();
        assert_ne!(new_code, created.access_code);
        assert_eq!(updated.editor.name, "Priya S.");
        assert!(f.editorial.authenticate(&created.access_code).await.is_err());
        assert_eq!(
            f.editorial.authenticate(&new_code).await.unwrap().id,
            created.editor.id
        );

        let regenerated = last_audit(&f, AuditAction::AccessCodeRegenerated).await;
        assert_eq!(regenerated.len(), 1);
        let raw = serde_json::to_string(&regenerated[0]).unwrap();
        assert!(!raw.contains(&new_code));
        assert_eq!(last_audit(&f, AuditAction::EditorUpdated).await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_patch_writes_nothing() {
        let f = fixture();
        let team = f.team("T1").await;
        let ce = f.editor("E1", EditorRole::CopyEditor, &team).await;

        let updated = f
            .editorial
            .update_editor(&ce.id, EditorPatch::default(), &Actor::Admin)
            .await
            .unwrap();
        assert_eq!(updated.editor, ce);
        assert!(last_audit(&f, AuditAction::EditorUpdated).await.is_empty());

        let err = f
            .editorial
            .update_editor("editor-ghost", EditorPatch::default(), &Actor::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deactivation_is_logical_and_idempotent() {
        let f = fixture();
        let team = f.team("T1").await;
        let created = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", Some(&team.id)), &Actor::Admin)
            .await
            .unwrap();

        let first = f.editorial.deactivate_editor(&created.editor.id, &Actor::Admin).await.unwrap();
        assert!(!first.active);
        f.editorial.deactivate_editor(&created.editor.id, &Actor::Admin).await.unwrap();

        let editors = f.editorial.list_editors().await.unwrap();
        assert_eq!(editors.len(), 1);
        assert!(!editors[0].active);
        assert_eq!(last_audit(&f, AuditAction::EditorRemoved).await.len(), 1);

        let err = f.editorial.authenticate(&created.access_code).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_deactivated_team_leaves_assignment_pool() {
        let f = fixture();
        let t1 = f.team("T1").await;
        let t2 = f.team("T2").await;
        f.editor("E1", EditorRole::CopyEditor, &t1).await;
        let e4 = f.editor("E4", EditorRole::CopyEditor, &t2).await;

        let removed = f.editorial.deactivate_team(&t1.id, &Actor::Admin).await.unwrap();
        assert!(!removed.active);
        assert_eq!(last_audit(&f, AuditAction::TeamRemoved).await.len(), 1);

        for _ in 0..5 {
            let sub = f.editorial.submit(Fixture::submission()).await.unwrap().value;
            assert_eq!(sub.assigned_ce.as_deref(), Some(e4.id.as_str()));
        }
    }

    #[tokio::test]
    async fn test_update_team() {
        let f = fixture();
        let team = f.team("T1").await;
        let renamed = f
            .editorial
            .update_team(
                &team.id,
                TeamPatch {
                    name: Some("Arbitration Desk".to_string()),
                    active: None,
                },
                &Actor::Admin,
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Arbitration Desk");
        assert!(renamed.updated_at.is_some());

        let updated = last_audit(&f, AuditAction::TeamUpdated).await;
        assert_eq!(updated[0].detail("name"), Some("Arbitration Desk"));
    }

    #[tokio::test]
    async fn test_team_listing_counts() {
        let f = fixture();
        let t1 = f.team("T1").await;
        f.editor("E1", EditorRole::CopyEditor, &t1).await;
        f.editor("E2", EditorRole::AssociateEditor, &t1).await;
        let e3 = f.editor("E3", EditorRole::SeniorEditor, &t1).await;
        f.editor("E5", EditorRole::SeniorEditor, &t1).await;

        let first = f.editorial.submit(Fixture::submission()).await.unwrap().value;
        f.editorial.submit(Fixture::submission()).await.unwrap();
        f.editorial
            .update_status(super::super::StatusUpdate {
                submission_id: Some(first.id.clone()),
                editor_id: Some("admin".to_string()),
                new_status: Some(SubmissionStatus::Rejected.as_str().to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        f.editorial.deactivate_editor(&e3.id, &Actor::Admin).await.unwrap();

        let teams = f.editorial.list_teams().await.unwrap();
        assert_eq!(teams.len(), 1);
        let summary = &teams[0];
        assert_eq!(summary.copy_editors, 1);
        assert_eq!(summary.associate_editors, 1);
        assert_eq!(summary.senior_editors, 1);
        assert_eq!(summary.total_members, 3);
        assert_eq!(summary.total_submissions, 2);
        assert_eq!(summary.active_submissions, 1);
    }

    #[tokio::test]
    async fn test_unacknowledged_creates_are_not_duplicated() {
        let f = fixture();

        // Team write and its audit entry both land without acknowledgement
        f.store.lose_next_acks(2).await;
        let team = f.team("T1").await;
        assert_eq!(f.editorial.list_teams().await.unwrap().len(), 1);
        assert_eq!(last_audit(&f, AuditAction::TeamAdded).await.len(), 1);

        f.store.lose_next_acks(1).await;
        let created = f
            .editorial
            .create_editor(new_editor("Priya", "copy_editor", Some(&team.id)), &Actor::Admin)
            .await
            .unwrap();
        assert_eq!(f.editorial.list_editors().await.unwrap().len(), 1);

        // The code handed back is the one that was stored
        let profile = f.editorial.authenticate(&created.access_code).await.unwrap();
        assert_eq!(profile.id, created.editor.id);
    }

    #[tokio::test]
    async fn test_unacknowledged_deactivation_is_still_audited() {
        let f = fixture();
        let team = f.team("T1").await;
        let editor = f.editor("E1", EditorRole::CopyEditor, &team).await;

        f.store.lose_next_acks(1).await;
        f.editorial.deactivate_editor(&editor.id, &Actor::Admin).await.unwrap();
        assert_eq!(last_audit(&f, AuditAction::EditorRemoved).await.len(), 1);

        f.store.lose_next_acks(1).await;
        let removed = f.editorial.deactivate_team(&team.id, &Actor::Admin).await.unwrap();
        assert!(!removed.active);
        assert_eq!(last_audit(&f, AuditAction::TeamRemoved).await.len(), 1);
    }

    #[tokio::test]
    async fn test_blank_names_rejected_after_trimming() {
        let f = fixture();
        let team = f.team("T1").await;
        let editor = f.editor("E1", EditorRole::CopyEditor, &team).await;

        let err = f
            .editorial
            .update_team(
                &team.id,
                TeamPatch {
                    name: Some("   ".to_string()),
                    active: None,
                },
                &Actor::Admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let err = f
            .editorial
            .update_editor(
                &editor.id,
                EditorPatch {
                    name: Some("  ".to_string()),
                    ..EditorPatch::default()
                },
                &Actor::Admin,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let editors = f.editorial.list_editors().await.unwrap();
        assert_eq!(editors[0].name, "E1");
    }

    #[tokio::test]
    async fn test_blank_access_code() {
        let f = fixture();
        let err = f.editorial.authenticate("  ").await.unwrap_err();
        assert!(matches!(err, AppError::MissingField { .. }));
    }
}
