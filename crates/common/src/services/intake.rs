//! Submission intake (direct API and form webhook)

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use validator::Validate;

use super::{required, Editorial};
use crate::auth::Actor;
use crate::db::models::{
    generate_id, AuditAction, DocumentVersion, Submission, SubmissionSource, SubmissionStatus,
};
use crate::db::Change;
use crate::errors::{AppError, Result};
use crate::notify::{Notification, Outcome};

/// Keywords as comma-separated text or a list
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum KeywordInput {
    Text(String),
    List(Vec<String>),
}

impl KeywordInput {
    /// Trimmed keywords with empties dropped
    pub fn into_keywords(self) -> Vec<String> {
        let raw: Vec<String> = match self {
            KeywordInput::Text(text) => text.split(',').map(str::to_string).collect(),
            KeywordInput::List(list) => list,
        };
        raw.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Direct intake request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSubmission {
    #[validate(length(max = 500))]
    pub title: Option<String>,

    #[validate(length(max = 200))]
    pub author_name: Option<String>,

    #[validate(email)]
    pub author_email: Option<String>,

    pub author_affiliation: Option<String>,

    #[serde(rename = "abstract")]
    #[validate(length(max = 20000))]
    pub abstract_text: Option<String>,

    pub category: Option<String>,

    pub keywords: Option<KeywordInput>,

    pub document_url: Option<String>,
}

/// Validated intake, ready to persist
struct Draft {
    title: String,
    author_name: String,
    author_email: String,
    author_affiliation: String,
    abstract_text: String,
    category: String,
    keywords: Vec<String>,
    document_url: String,
    source: SubmissionSource,
    form_response_id: Option<String>,
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewSubmission {
    fn into_draft(self) -> Result<Draft> {
        let title = required("title", self.title.as_deref())?;
        let author_name = required("authorName", self.author_name.as_deref())?;
        let author_email = required("authorEmail", self.author_email.as_deref())?;
        let abstract_text = required("abstract", self.abstract_text.as_deref())?;
        let document_url = required("documentUrl", self.document_url.as_deref())?;
        self.validate()?;

        Ok(Draft {
            title,
            author_name,
            author_email,
            author_affiliation: optional(self.author_affiliation).unwrap_or_default(),
            abstract_text,
            category: optional(self.category).unwrap_or_else(|| "General".to_string()),
            keywords: self.keywords.map(KeywordInput::into_keywords).unwrap_or_default(),
            document_url,
            source: SubmissionSource::Api,
            form_response_id: None,
        })
    }
}

/// First non-blank string among the alternative labels of a form field
fn form_field(data: &Value, labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        data.get(*label)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn form_keywords(data: &Value) -> Vec<String> {
    ["Keywords", "keywords"]
        .iter()
        .find_map(|label| data.get(*label))
        .and_then(|value| serde_json::from_value::<KeywordInput>(value.clone()).ok())
        .map(KeywordInput::into_keywords)
        .unwrap_or_default()
}

/// Map a form payload (flat, or nested under `formData`) onto a draft
fn form_draft(payload: &Value) -> Result<Draft> {
    let data = payload.get("formData").filter(|v| v.is_object()).unwrap_or(payload);
    if !data.is_object() {
        return Err(AppError::invalid("formData", "Form payload must be an object"));
    }

    let title = form_field(data, &["Article Title", "title", "Title"]);
    let author_name = form_field(data, &["Author Name", "authorName", "Full Name"]);
    let author_email = form_field(data, &["Email Address", "authorEmail", "Email"]);

    let title = required("title", title.as_deref())?;
    let author_name = required("authorName", author_name.as_deref())?;
    let author_email = required("authorEmail", author_email.as_deref())?;

    let check = NewSubmission {
        author_email: Some(author_email.clone()),
        ..NewSubmission::default()
    };
    check.validate()?;

    Ok(Draft {
        title,
        author_name,
        author_email,
        author_affiliation: form_field(
            data,
            &["Affiliation", "authorAffiliation", "Institution/University"],
        )
        .unwrap_or_default(),
        abstract_text: form_field(data, &["Abstract", "abstract"]).unwrap_or_default(),
        category: form_field(data, &["Category", "category"]).unwrap_or_else(|| "General".to_string()),
        keywords: form_keywords(data),
        document_url: form_field(data, &["Document URL", "documentUrl", "Google Drive Link"])
            .unwrap_or_default(),
        source: SubmissionSource::GoogleForm,
        form_response_id: form_field(data, &["responseId"]),
    })
}

impl Editorial {
    /// Direct intake: persist, audit, acknowledge, then auto-assign
    #[instrument(skip(self, request))]
    pub async fn submit(&self, request: NewSubmission) -> Result<Outcome<Submission>> {
        let draft = request.into_draft()?;
        self.intake(draft, &Actor::System).await
    }

    /// Form webhook intake
    #[instrument(skip(self, payload))]
    pub async fn submit_form(&self, payload: &Value) -> Result<Outcome<Submission>> {
        let draft = form_draft(payload)?;
        self.intake(draft, &Actor::FormWebhook).await
    }

    async fn intake(&self, draft: Draft, actor: &Actor) -> Result<Outcome<Submission>> {
        let now = Utc::now();
        let versions = if draft.document_url.is_empty() {
            Vec::new()
        } else {
            vec![DocumentVersion {
                version: 1,
                document_url: draft.document_url.clone(),
                uploaded_at: now,
            }]
        };

        let submission = Submission {
            id: generate_id("sub"),
            title: draft.title,
            author_name: draft.author_name,
            author_email: draft.author_email,
            author_affiliation: draft.author_affiliation,
            abstract_text: draft.abstract_text,
            category: draft.category,
            keywords: draft.keywords,
            document_url: draft.document_url,
            versions,
            status: SubmissionStatus::Submitted,
            team_id: None,
            assigned_ce: None,
            assigned_ae: None,
            assigned_se: None,
            feedback: Vec::new(),
            plagiarism_report: None,
            ai_check_report: None,
            source: draft.source,
            form_response_id: draft.form_response_id,
            created_at: now,
            updated_at: now,
            published_at: None,
            last_change_id: None,
        };

        let description = format!("New submission: \"{}\"", submission.title);
        self.repos
            .submissions
            .mutate(|items| {
                if items.iter().any(|s| s.id == submission.id) {
                    return Ok(Change::unchanged(()));
                }
                items.push(submission.clone());
                Ok(Change::new((), description.clone()))
            })
            .await?;

        info!(
            submission_id = %submission.id,
            source = ?submission.source,
            "Submission created"
        );

        let mut details = json!({
            "submissionId": submission.id,
            "title": submission.title,
        });
        if submission.source == SubmissionSource::GoogleForm {
            details["source"] = json!("google_form");
        }
        self.audit
            .record(AuditAction::SubmissionCreated, actor.id(), details, description)
            .await?;

        let mut warnings = Vec::new();
        if let Some(warning) = self
            .dispatcher
            .deliver(Notification::SubmissionReceived {
                author_email: submission.author_email.clone(),
                author_name: submission.author_name.clone(),
                title: submission.title.clone(),
                submission_id: submission.id.clone(),
            })
            .await
        {
            warnings.push(warning);
        }

        let assigned = self.run_assignment(submission).await?;
        warnings.extend(assigned.warnings);
        Ok(Outcome::with_warnings(assigned.value, warnings))
    }
}
