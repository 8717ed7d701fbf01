//! Editorial service facade
//!
//! Sequences every workflow operation over the repositories: validate,
//! mutate the primary collection, append the audit entry, then notify.
//! Notification failures come back as warnings on the `Outcome`; store and
//! audit failures are errors.

mod directory;
mod intake;
mod queries;
mod workflow;

pub use directory::{CreatedEditor, EditorPatch, NewEditor, NewTeam, TeamPatch, UpdatedEditor};
pub use intake::{KeywordInput, NewSubmission};
pub use queries::SubmissionFilter;
pub use workflow::StatusUpdate;

use std::sync::Arc;

use crate::assignment::AssignmentEngine;
use crate::audit::AuditRecorder;
use crate::auth::{AccessCodeGenerator, Actor};
use crate::config::AppConfig;
use crate::db::models::Editor;
use crate::db::{DocumentStore, Repositories, RetryPolicy};
use crate::errors::{AppError, Result};
use crate::notify::{Dispatcher, Notifier};

/// Entry point for all workflow operations
pub struct Editorial {
    store: Arc<dyn DocumentStore>,
    repos: Repositories,
    audit: AuditRecorder,
    dispatcher: Dispatcher,
    engine: AssignmentEngine,
    codes: AccessCodeGenerator,
}

impl Editorial {
    pub fn new(store: Arc<dyn DocumentStore>, notifier: Arc<dyn Notifier>, config: &AppConfig) -> Self {
        let repos = Repositories::new(Arc::clone(&store), RetryPolicy::from_config(&config.store));
        let seed = config.workflow.rng_seed;

        Self {
            audit: AuditRecorder::new(repos.audit_log.clone(), config.workflow.audit_log_capacity),
            dispatcher: Dispatcher::new(notifier, config.notifier.timeout()),
            engine: AssignmentEngine::new(seed),
            // Separate stream from the assignment engine
            codes: AccessCodeGenerator::new(
                config.workflow.access_code_prefix.clone(),
                seed.map(|s| s.wrapping_add(1)),
            ),
            repos,
            store,
        }
    }

    /// Check the store is reachable
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Resolve an acting identifier to a principal.
    ///
    /// Reserved identifiers never touch the editor collection; anything else
    /// must name an active editor.
    pub async fn resolve_actor(&self, id: &str) -> Result<Actor> {
        if let Some(actor) = Actor::reserved(id) {
            return Ok(actor);
        }
        let editors = self.repos.editors.load().await?.items;
        find_active_editor(&editors, id).map(|editor| Actor::Editor(editor.to_public()))
    }
}

fn find_active_editor<'a>(editors: &'a [Editor], id: &str) -> Result<&'a Editor> {
    editors
        .iter()
        .find(|editor| editor.id == id && editor.active)
        .ok_or_else(|| AppError::Unauthorized {
            message: format!("Unknown or inactive editor: {}", id),
        })
}

/// Admin-only operations
fn require_elevated(actor: &Actor) -> Result<()> {
    if actor.is_elevated() {
        Ok(())
    } else {
        Err(AppError::Forbidden {
            message: format!("{} is not allowed to manage the editorial board", actor.id()),
        })
    }
}

/// Trimmed value of a required text field
fn required(field: &str, value: Option<&str>) -> Result<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(AppError::MissingField {
            field: field.to_string(),
        }),
    }
}
