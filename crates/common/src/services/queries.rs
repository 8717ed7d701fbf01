//! Read-side queries over submissions and the audit log

use serde::Deserialize;

use super::Editorial;
use crate::audit::AuditQuery;
use crate::db::models::{AuditLogEntry, Submission, SubmissionStatus};
use crate::errors::{AppError, Result};

/// Submission listing filters; `all` or absent means unfiltered
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFilter {
    pub status: Option<String>,

    #[serde(alias = "teamId")]
    pub team: Option<String>,

    /// Matches any of the three assignment slots
    #[serde(alias = "editorId")]
    pub editor: Option<String>,
}

fn active_filter(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty() && *v != "all")
}

struct CompiledFilter<'a> {
    status: Option<SubmissionStatus>,
    team: Option<&'a str>,
    editor: Option<&'a str>,
}

impl SubmissionFilter {
    fn compile(&self) -> Result<CompiledFilter<'_>> {
        let status = active_filter(self.status.as_deref())
            .map(|s| {
                s.parse::<SubmissionStatus>()
                    .map_err(|_| AppError::invalid("status", format!("Unknown submission status: {}", s)))
            })
            .transpose()?;

        Ok(CompiledFilter {
            status,
            team: active_filter(self.team.as_deref()),
            editor: active_filter(self.editor.as_deref()),
        })
    }
}

impl CompiledFilter<'_> {
    fn matches(&self, submission: &Submission) -> bool {
        self.status.map_or(true, |status| submission.status == status)
            && self
                .team
                .map_or(true, |team| submission.team_id.as_deref() == Some(team))
            && self
                .editor
                .map_or(true, |editor| submission.involves_editor(editor))
    }
}

impl Editorial {
    /// Submissions matching `filter`, in stored order
    pub async fn list_submissions(&self, filter: &SubmissionFilter) -> Result<Vec<Submission>> {
        let compiled = filter.compile()?;
        let submissions = self.repos.submissions.load().await?.items;
        Ok(submissions
            .into_iter()
            .filter(|submission| compiled.matches(submission))
            .collect())
    }

    pub async fn get_submission(&self, id: &str) -> Result<Submission> {
        self.repos
            .submissions
            .load()
            .await?
            .items
            .into_iter()
            .find(|submission| submission.id == id)
            .ok_or_else(|| AppError::not_found("Submission", id))
    }

    /// Audit entries matching `query`, newest first
    pub async fn audit_log(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        self.audit.query(query).await
    }
}
