//! Typed collection repositories
//!
//! Every mutation is a read-modify-write of the whole collection guarded by
//! the store's version token. On a retryable failure the snapshot is re-read
//! and the caller's delta re-applied, up to `RetryPolicy::max_attempts`.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use backoff::backoff::Backoff;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::models::{AuditLogEntry, Editor, Submission, Team};
use super::{Collection, DocumentStore, VersionToken};
use crate::config::StoreConfig;
use crate::errors::{AppError, Result};
use crate::metrics;

/// Bounded retry with exponential backoff and a per-call timeout
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// Bound on a single store call
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: config.timeout(),
        }
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_max_elapsed_time(None)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Typed collection contents with the token they were read at
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    pub items: Vec<T>,
    pub token: Option<VersionToken>,
}

/// Result of a mutation closure.
///
/// A change with a description is written back; `unchanged` skips the write.
#[derive(Debug)]
pub struct Change<R> {
    pub output: R,
    pub description: Option<String>,
}

impl<R> Change<R> {
    pub fn new(output: R, description: impl Into<String>) -> Self {
        Self {
            output,
            description: Some(description.into()),
        }
    }

    pub fn unchanged(output: R) -> Self {
        Self {
            output,
            description: None,
        }
    }
}

/// Typed accessor over one collection
pub struct CollectionRepository<T> {
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    policy: RetryPolicy,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for CollectionRepository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            collection: self.collection,
            policy: self.policy.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> CollectionRepository<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(store: Arc<dyn DocumentStore>, collection: Collection, policy: RetryPolicy) -> Self {
        Self {
            store,
            collection,
            policy,
            _marker: PhantomData,
        }
    }

    /// Fresh read of the whole collection
    pub async fn load(&self) -> Result<Snapshot<T>> {
        let raw = self
            .timed("read", self.store.read(self.collection))
            .await?;

        let items = serde_json::from_value(raw.documents).map_err(|e| AppError::Store {
            message: format!("Malformed {} document: {}", self.collection, e),
        })?;

        Ok(Snapshot {
            items,
            token: raw.token,
        })
    }

    /// Read, apply `apply`, and write back under the read token.
    ///
    /// `apply` runs once per attempt against a fresh snapshot, so it must
    /// compute its delta from the items it is given. A failed write may still
    /// have landed, so a retry can see the change already applied; `apply`
    /// must detect its own earlier change (by an id fixed before the call)
    /// and return `Change::unchanged`. Errors it returns that are not
    /// retryable abort immediately.
    pub async fn mutate<R, F>(&self, mut apply: F) -> Result<R>
    where
        F: FnMut(&mut Vec<T>) -> Result<Change<R>> + Send,
        R: Send,
    {
        let mut backoff = self.policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.attempt(&mut apply).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retryable() && attempt < self.policy.max_attempts => {
                    let conflict = matches!(err, AppError::Conflict { .. });
                    let delay = backoff.next_backoff().unwrap_or(self.policy.max_backoff);
                    warn!(
                        collection = %self.collection,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying collection mutation"
                    );
                    metrics::record_store_retry(self.collection.name(), conflict);
                    tokio::time::sleep(delay).await;
                }
                Err(AppError::Conflict { .. }) => {
                    warn!(
                        collection = %self.collection,
                        attempts = attempt,
                        "Giving up after repeated conflicts"
                    );
                    return Err(AppError::Conflict {
                        collection: self.collection.name().to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn attempt<R, F>(&self, apply: &mut F) -> Result<R>
    where
        F: FnMut(&mut Vec<T>) -> Result<Change<R>> + Send,
        R: Send,
    {
        let Snapshot { mut items, token } = self.load().await?;
        let change = apply(&mut items)?;

        if let Some(description) = change.description {
            let documents = serde_json::to_value(&items)?;
            let new_token = self
                .timed(
                    "write",
                    self.store
                        .write(self.collection, &documents, token.as_ref(), &description),
                )
                .await?;
            debug!(
                collection = %self.collection,
                token = %new_token,
                description = %description,
                "Collection written"
            );
        }

        Ok(change.output)
    }

    /// Bound a store call by the policy timeout and record its outcome
    async fn timed<V>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<V>> + Send,
    ) -> Result<V> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.policy.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Timeout {
                operation: format!("{} {}", operation, self.collection),
                timeout_ms: self.policy.timeout.as_millis() as u64,
            }),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(AppError::Conflict { .. }) => "conflict",
            Err(AppError::Timeout { .. }) => "timeout",
            Err(_) => "error",
        };
        metrics::record_store_operation(
            self.collection.name(),
            operation,
            outcome,
            start.elapsed().as_secs_f64(),
        );

        result
    }
}

/// The four typed repositories over one store
#[derive(Clone)]
pub struct Repositories {
    pub editors: CollectionRepository<Editor>,
    pub teams: CollectionRepository<Team>,
    pub submissions: CollectionRepository<Submission>,
    pub audit_log: CollectionRepository<AuditLogEntry>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>, policy: RetryPolicy) -> Self {
        Self {
            editors: CollectionRepository::new(Arc::clone(&store), Collection::Editors, policy.clone()),
            teams: CollectionRepository::new(Arc::clone(&store), Collection::Teams, policy.clone()),
            submissions: CollectionRepository::new(
                Arc::clone(&store),
                Collection::Submissions,
                policy.clone(),
            ),
            audit_log: CollectionRepository::new(store, Collection::AuditLog, policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{InMemoryStore, RawSnapshot};
    use async_trait::async_trait;
    use serde::Deserialize;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: String,
    }

    fn item(id: &str) -> Item {
        Item { id: id.to_string() }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
        }
    }

    /// Lets a rival writer append an item right before our first `n` writes
    struct RacingStore {
        inner: InMemoryStore,
        races_left: AtomicUsize,
    }

    #[async_trait]
    impl DocumentStore for RacingStore {
        async fn read(&self, collection: Collection) -> Result<RawSnapshot> {
            self.inner.read(collection).await
        }

        async fn write(
            &self,
            collection: Collection,
            documents: &Value,
            expected: Option<&VersionToken>,
            description: &str,
        ) -> Result<VersionToken> {
            let race = self
                .races_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if race {
                let current = self.inner.read(collection).await?;
                let mut rival = current.documents.as_array().cloned().unwrap_or_default();
                rival.push(serde_json::json!({"id": format!("rival-{}", rival.len())}));
                self.inner
                    .write(collection, &Value::Array(rival), current.token.as_ref(), "rival")
                    .await?;
            }
            self.inner.write(collection, documents, expected, description).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "racing"
        }
    }

    /// Never answers
    struct StalledStore;

    #[async_trait]
    impl DocumentStore for StalledStore {
        async fn read(&self, _collection: Collection) -> Result<RawSnapshot> {
            std::future::pending().await
        }

        async fn write(
            &self,
            _collection: Collection,
            _documents: &Value,
            _expected: Option<&VersionToken>,
            _description: &str,
        ) -> Result<VersionToken> {
            std::future::pending().await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "stalled"
        }
    }

    #[tokio::test]
    async fn test_mutate_appends_and_load_reads_back() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Teams, fast_policy(3));

        let count = repo
            .mutate(|items| {
                items.push(item("team-1"));
                Ok(Change::new(items.len(), "Added team"))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        let snapshot = repo.load().await.unwrap();
        assert_eq!(snapshot.items, vec![item("team-1")]);
        assert!(snapshot.token.is_some());
    }

    #[tokio::test]
    async fn test_unchanged_skips_write() {
        let memory = Arc::new(InMemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Teams, fast_policy(3));

        let output = repo.mutate(|_items| Ok(Change::unchanged("noop"))).await.unwrap();
        assert_eq!(output, "noop");
        assert!(memory.journal().await.is_empty());
    }

    #[tokio::test]
    async fn test_conflict_retry_keeps_concurrent_change() {
        let racing = Arc::new(RacingStore {
            inner: InMemoryStore::new(),
            races_left: AtomicUsize::new(1),
        });
        let store: Arc<dyn DocumentStore> = racing.clone();
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Submissions, fast_policy(3));

        let mut runs = 0;
        repo.mutate(|items| {
            runs += 1;
            items.push(item("sub-1"));
            Ok(Change::new((), "Added submission"))
        })
        .await
        .unwrap();
        assert_eq!(runs, 2);

        let ids: Vec<String> = repo.load().await.unwrap().items.into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["rival-0".to_string(), "sub-1".to_string()]);
    }

    #[tokio::test]
    async fn test_conflicts_exhaust_into_conflict_error() {
        let racing = Arc::new(RacingStore {
            inner: InMemoryStore::new(),
            races_left: AtomicUsize::new(10),
        });
        let store: Arc<dyn DocumentStore> = racing.clone();
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Submissions, fast_policy(2));

        let err = repo
            .mutate(|items| {
                items.push(item("sub-1"));
                Ok(Change::new((), "Added submission"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { ref collection } if collection == "submissions"));

        // Rival writes survive; ours never landed
        let items = repo.load().await.unwrap().items;
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.id.starts_with("rival-")));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let memory = Arc::new(InMemoryStore::new());
        memory.fail_next_writes(2).await;
        let store: Arc<dyn DocumentStore> = memory.clone();
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Editors, fast_policy(3));

        tokio_test::assert_ok!(
            repo.mutate(|items| {
                items.push(item("editor-1"));
                Ok(Change::new((), "Added editor"))
            })
            .await
        );
        assert_eq!(memory.journal().await.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_lost_ack_sees_landed_change() {
        let memory = Arc::new(InMemoryStore::new());
        memory.lose_next_acks(1).await;
        let store: Arc<dyn DocumentStore> = memory.clone();
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Teams, fast_policy(3));

        let mut runs = 0;
        let added = repo
            .mutate(|items| {
                runs += 1;
                if items.iter().any(|i| i.id == "team-1") {
                    return Ok(Change::unchanged(false));
                }
                items.push(item("team-1"));
                Ok(Change::new(true, "Added team"))
            })
            .await
            .unwrap();

        assert_eq!(runs, 2);
        assert!(!added);
        assert_eq!(repo.load().await.unwrap().items, vec![item("team-1")]);
        assert_eq!(memory.journal().await.len(), 1);
    }

    #[tokio::test]
    async fn test_closure_errors_abort_without_retry() {
        let store: Arc<dyn DocumentStore> = Arc::new(InMemoryStore::new());
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::Editors, fast_policy(3));

        let mut runs = 0;
        let err = repo
            .mutate(|_items| -> Result<Change<()>> {
                runs += 1;
                Err(AppError::not_found("editor", "editor-9"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(runs, 1);
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let store: Arc<dyn DocumentStore> = Arc::new(StalledStore);
        let policy = RetryPolicy {
            timeout: Duration::from_millis(20),
            ..fast_policy(1)
        };
        let repo: CollectionRepository<Item> =
            CollectionRepository::new(store, Collection::AuditLog, policy);

        let err = repo.load().await.unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
        assert!(err.is_retryable());
    }
}
