//! Audit recorder
//!
//! The audit log is a bounded ring stored newest first. Entries are only
//! ever prepended; the oldest fall off once the capacity is reached.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::db::models::{generate_id, AuditAction, AuditLogEntry};
use crate::db::{Change, CollectionRepository};
use crate::errors::Result;

/// Filters for reading the audit log
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub action: Option<AuditAction>,

    /// Matches `details.submissionId`
    pub submission_id: Option<String>,

    /// Matches `performedBy` or `details.editorId`
    pub editor_id: Option<String>,

    /// Applied after filtering
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        if let Some(action) = self.action {
            if entry.action != action {
                return false;
            }
        }
        if let Some(submission_id) = &self.submission_id {
            if entry.detail("submissionId") != Some(submission_id.as_str()) {
                return false;
            }
        }
        if let Some(editor_id) = &self.editor_id {
            if entry.performed_by != *editor_id && entry.detail("editorId") != Some(editor_id.as_str())
            {
                return false;
            }
        }
        true
    }
}

/// Turn a `json!` object into an entry's details map
pub fn details(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Appends entries to the audit log collection
#[derive(Clone)]
pub struct AuditRecorder {
    repo: CollectionRepository<AuditLogEntry>,
    capacity: usize,
}

impl AuditRecorder {
    pub fn new(repo: CollectionRepository<AuditLogEntry>, capacity: usize) -> Self {
        Self {
            repo,
            capacity: capacity.max(1),
        }
    }

    /// Prepend `entry` and drop everything past the capacity
    pub async fn append(&self, entry: AuditLogEntry) -> Result<()> {
        let capacity = self.capacity;
        let description = format!("Audit: {}", entry.action);

        self.repo
            .mutate(|entries| {
                if entries.iter().any(|existing| existing.id == entry.id) {
                    return Ok(Change::unchanged(()));
                }
                entries.insert(0, entry.clone());
                entries.truncate(capacity);
                Ok(Change::new((), description.clone()))
            })
            .await?;

        debug!(action = %entry.action, entry_id = %entry.id, "Audit entry appended");
        Ok(())
    }

    /// Build, stamp and append an entry
    pub async fn record(
        &self,
        action: AuditAction,
        performed_by: &str,
        details_value: Value,
        description: impl Into<String>,
    ) -> Result<AuditLogEntry> {
        let entry = AuditLogEntry {
            id: generate_id("log"),
            action,
            details: details(details_value),
            performed_by: performed_by.to_string(),
            timestamp: Utc::now(),
            description: description.into(),
        };
        self.append(entry.clone()).await?;
        Ok(entry)
    }

    /// Entries matching `query`, newest first
    pub async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>> {
        let entries = self.repo.load().await?.items;
        let matching = entries.into_iter().filter(|entry| query.matches(entry));
        Ok(match query.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Collection, DocumentStore, InMemoryStore, RetryPolicy};
    use serde_json::json;
    use std::sync::Arc;

    fn recorder(capacity: usize) -> AuditRecorder {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        AuditRecorder::new(
            CollectionRepository::new(store, Collection::AuditLog, RetryPolicy::default()),
            capacity,
        )
    }

    #[tokio::test]
    async fn test_newest_first() {
        let audit = recorder(10);
        audit
            .record(AuditAction::TeamAdded, "admin", json!({"teamId": "team-1"}), "first")
            .await
            .unwrap();
        audit
            .record(AuditAction::TeamAdded, "admin", json!({"teamId": "team-2"}), "second")
            .await
            .unwrap();

        let entries = audit.query(&AuditQuery::default()).await.unwrap();
        let descriptions: Vec<&str> = entries.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_unacknowledged_append_is_not_duplicated() {
        let store = Arc::new(InMemoryStore::new());
        store.lose_next_acks(1).await;
        let audit = AuditRecorder::new(
            CollectionRepository::new(store.clone(), Collection::AuditLog, RetryPolicy::default()),
            10,
        );

        let entry = audit
            .record(AuditAction::TeamAdded, "admin", json!({"teamId": "team-1"}), "Team added")
            .await
            .unwrap();

        let entries = audit.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry.id);
        assert_eq!(store.journal().await.len(), 1);
    }

    #[tokio::test]
    async fn test_ring_keeps_capacity() {
        let store = Arc::new(InMemoryStore::new());
        let full: Vec<AuditLogEntry> = (0..1000)
            .map(|i| AuditLogEntry {
                id: format!("log-{}", i),
                action: AuditAction::StatusChanged,
                details: Map::new(),
                performed_by: "system".to_string(),
                timestamp: Utc::now(),
                description: format!("entry {}", 999 - i),
            })
            .collect();
        store
            .write(Collection::AuditLog, &serde_json::to_value(&full).unwrap(), None, "seed")
            .await
            .unwrap();

        let audit = AuditRecorder::new(
            CollectionRepository::new(store, Collection::AuditLog, RetryPolicy::default()),
            1000,
        );
        audit
            .record(AuditAction::StatusChanged, "system", json!({}), "entry 1000")
            .await
            .unwrap();

        let entries = audit.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1000);
        assert_eq!(entries[0].description, "entry 1000");
        assert_eq!(entries[999].description, "entry 1");
        assert!(entries.iter().all(|e| e.description != "entry 0"));
    }

    #[tokio::test]
    async fn test_query_filters_then_limits() {
        let audit = recorder(100);
        audit
            .record(
                AuditAction::StatusChanged,
                "editor-1",
                json!({"submissionId": "sub-1"}),
                "s1 by e1",
            )
            .await
            .unwrap();
        audit
            .record(
                AuditAction::EditorUpdated,
                "admin",
                json!({"editorId": "editor-1"}),
                "e1 updated",
            )
            .await
            .unwrap();
        audit
            .record(
                AuditAction::StatusChanged,
                "editor-2",
                json!({"submissionId": "sub-2"}),
                "s2 by e2",
            )
            .await
            .unwrap();

        let by_editor = audit
            .query(&AuditQuery {
                editor_id: Some("editor-1".to_string()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_editor.len(), 2);

        let by_submission = audit
            .query(&AuditQuery {
                submission_id: Some("sub-2".to_string()),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(by_submission.len(), 1);
        assert_eq!(by_submission[0].performed_by, "editor-2");

        let limited = audit
            .query(&AuditQuery {
                action: Some(AuditAction::StatusChanged),
                limit: Some(1),
                ..AuditQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].description, "s2 by e2");
    }

    #[test]
    fn test_query_from_params() {
        let query: AuditQuery =
            serde_json::from_value(json!({"action": "STATUS_CHANGED", "limit": 5})).unwrap();
        assert_eq!(query.action, Some(AuditAction::StatusChanged));
        assert_eq!(query.limit, Some(5));
    }
}
