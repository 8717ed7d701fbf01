//! In-memory implementation of `DocumentStore`.
//!
//! Collections are held in a `HashMap` protected by a `RwLock` and versioned
//! with a SHA-256 content hash, mirroring the compare-and-swap behavior of
//! the remote backend. All state is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::debug;

use super::{Collection, DocumentStore, RawSnapshot, VersionToken};
use crate::errors::{AppError, Result};

#[derive(Debug, Clone)]
struct StoredDocument {
    documents: Value,
    token: VersionToken,
}

/// One accepted write, kept for inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub collection: Collection,
    pub description: String,
    pub token: VersionToken,
}

/// In-memory document store.
pub struct InMemoryStore {
    collections: RwLock<HashMap<Collection, StoredDocument>>,
    journal: RwLock<Vec<WriteRecord>>,
    /// Remaining writes to fail with `StoreUnavailable`
    pending_failures: RwLock<usize>,
    /// Remaining writes to apply and then report as `StoreUnavailable`
    lost_acks: RwLock<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            journal: RwLock::new(Vec::new()),
            pending_failures: RwLock::new(0),
            lost_acks: RwLock::new(0),
        }
    }

    fn content_hash(documents: &Value) -> Result<VersionToken> {
        let bytes = serde_json::to_vec(documents)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(VersionToken::new(hex::encode(hasher.finalize())))
    }

    /// Accepted writes in order
    pub async fn journal(&self) -> Vec<WriteRecord> {
        self.journal.read().await.clone()
    }

    /// Make the next `count` writes fail as if the store were unreachable
    pub async fn fail_next_writes(&self, count: usize) {
        *self.pending_failures.write().await = count;
    }

    /// Make the next `count` writes land but answer with an error, like a
    /// remote store whose response never arrived
    pub async fn lose_next_acks(&self, count: usize) {
        *self.lost_acks.write().await = count;
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn read(&self, collection: Collection) -> Result<RawSnapshot> {
        let collections = self.collections.read().await;
        Ok(match collections.get(&collection) {
            Some(stored) => RawSnapshot {
                documents: stored.documents.clone(),
                token: Some(stored.token.clone()),
            },
            None => RawSnapshot::empty(),
        })
    }

    async fn write(
        &self,
        collection: Collection,
        documents: &Value,
        expected: Option<&VersionToken>,
        description: &str,
    ) -> Result<VersionToken> {
        {
            let mut pending = self.pending_failures.write().await;
            if *pending > 0 {
                *pending -= 1;
                return Err(AppError::StoreUnavailable {
                    message: format!("injected failure writing {}", collection),
                });
            }
        }

        if !documents.is_array() {
            return Err(AppError::Store {
                message: format!("{} must be a JSON array", collection),
            });
        }

        let mut collections = self.collections.write().await;
        let current = collections.get(&collection).map(|stored| &stored.token);
        if current != expected {
            debug!(
                collection = %collection,
                expected = ?expected,
                current = ?current,
                "Version token mismatch"
            );
            return Err(AppError::Conflict {
                collection: collection.name().to_string(),
            });
        }

        let token = Self::content_hash(documents)?;
        collections.insert(
            collection,
            StoredDocument {
                documents: documents.clone(),
                token: token.clone(),
            },
        );
        drop(collections);

        self.journal.write().await.push(WriteRecord {
            collection,
            description: description.to_string(),
            token: token.clone(),
        });

        let mut lost = self.lost_acks.write().await;
        if *lost > 0 {
            *lost -= 1;
            return Err(AppError::StoreUnavailable {
                message: format!("response lost after writing {}", collection),
            });
        }

        Ok(token)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
