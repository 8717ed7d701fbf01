//! Document store layer
//!
//! Provides:
//! - The `DocumentStore` adapter contract (whole-collection snapshots guarded
//!   by a compare-and-swap version token)
//! - In-memory and GitHub contents API backends
//! - Typed collection repositories with conflict retry
//! - Persisted document models

mod github;
mod memory;
pub mod models;
mod repository;

pub use github::GitHubContentStore;
pub use memory::{InMemoryStore, WriteRecord};
pub use repository::{Change, CollectionRepository, Repositories, RetryPolicy, Snapshot};

use crate::config::{StoreBackend, StoreConfig};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// The four shared collections
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Editors,
    Teams,
    Submissions,
    AuditLog,
}

impl Collection {
    /// Stable collection name, also the file stem
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Editors => "editors",
            Collection::Teams => "teams",
            Collection::Submissions => "submissions",
            Collection::AuditLog => "audit-log",
        }
    }

    /// Location of the collection document below `data_dir`
    pub fn path(&self, data_dir: &str) -> String {
        let dir = data_dir.trim_matches('/');
        if dir.is_empty() {
            format!("{}.json", self.name())
        } else {
            format!("{}/{}.json", dir, self.name())
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque content hash identifying one stored revision of a collection
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Untyped collection contents as read from the store
#[derive(Clone, Debug, PartialEq)]
pub struct RawSnapshot {
    /// JSON array of documents (empty when the collection does not exist)
    pub documents: serde_json::Value,

    /// `None` when the collection does not exist yet
    pub token: Option<VersionToken>,
}

impl RawSnapshot {
    pub fn empty() -> Self {
        Self {
            documents: serde_json::Value::Array(Vec::new()),
            token: None,
        }
    }
}

/// Versioned whole-collection storage.
///
/// `write` replaces the entire collection and succeeds only if the store's
/// current token equals `expected` (`None` meaning the collection must not
/// exist yet). A mismatch fails with `AppError::Conflict`; callers re-read
/// and retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a collection; a missing collection is empty, not an error
    async fn read(&self, collection: Collection) -> Result<RawSnapshot>;

    /// Replace a collection, returning the new token
    async fn write(
        &self,
        collection: Collection,
        documents: &serde_json::Value,
        expected: Option<&VersionToken>,
        description: &str,
    ) -> Result<VersionToken>;

    /// Check connectivity
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs
    fn backend_name(&self) -> &'static str;
}

/// Create the configured store backend
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.backend {
        StoreBackend::Github => Arc::new(GitHubContentStore::new(config)?),
        StoreBackend::Memory => Arc::new(InMemoryStore::new()),
    };

    info!(backend = store.backend_name(), "Document store initialized");
    Ok(store)
}
