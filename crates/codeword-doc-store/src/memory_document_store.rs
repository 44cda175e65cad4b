//! `tokio`-backed implementation of the `DocumentStore` trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use codeword_core::error::DomainError;
use codeword_core::store::{
    DocPath, DocumentStore, FieldWrite, Snapshot, Subscription, TransactionFn,
    TransactionOutcome, read_at, remove_at, write_at,
};

/// Transaction attempts before giving up with `ConcurrencyConflict`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 25;

#[derive(Debug)]
struct Document {
    version: u64,
    value: Option<Value>,
    tx: watch::Sender<Snapshot>,
}

impl Document {
    fn empty() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            version: 0,
            value: None,
            tx,
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        self.tx.send_replace(self.value.clone().map(Arc::new));
    }
}

/// Shared document store held in process memory.
///
/// Every successful write bumps the document's version and publishes a new
/// snapshot to subscribers. Transactions read a version, run their function
/// without holding the lock, and commit only if the version is unchanged.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    docs: Mutex<HashMap<String, Document>>,
    max_attempts: u32,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_MAX_ATTEMPTS)
    }

    /// Creates an empty store with a custom transaction retry bound.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Current version of a document; 0 if it was never written.
    pub async fn version(&self, doc_id: &str) -> u64 {
        self.docs.lock().await.get(doc_id).map_or(0, |doc| doc.version)
    }

    async fn read_versioned(&self, doc_id: &str, path: &DocPath) -> (u64, Option<Value>) {
        let docs = self.docs.lock().await;
        docs.get(doc_id).map_or((0, None), |doc| {
            let value = doc.value.as_ref().and_then(|v| read_at(v, path)).cloned();
            (doc.version, value)
        })
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, doc_id: &str) -> Result<Option<Value>, DomainError> {
        let docs = self.docs.lock().await;
        Ok(docs.get(doc_id).and_then(|doc| doc.value.clone()))
    }

    async fn subscribe(&self, doc_id: &str) -> Result<Subscription, DomainError> {
        let mut docs = self.docs.lock().await;
        let doc = docs
            .entry(doc_id.to_owned())
            .or_insert_with(Document::empty);
        Ok(Subscription::new(doc.tx.subscribe()))
    }

    async fn set(&self, doc_id: &str, path: &DocPath, value: Value) -> Result<(), DomainError> {
        let mut docs = self.docs.lock().await;
        let doc = docs
            .entry(doc_id.to_owned())
            .or_insert_with(Document::empty);
        write_at(&mut doc.value, path, value);
        doc.publish();
        debug!(doc_id, %path, version = doc.version, "set");
        Ok(())
    }

    async fn update(&self, doc_id: &str, writes: &[FieldWrite]) -> Result<(), DomainError> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut docs = self.docs.lock().await;
        let doc = docs
            .entry(doc_id.to_owned())
            .or_insert_with(Document::empty);
        for write in writes {
            write_at(&mut doc.value, &write.path, write.value.clone());
        }
        doc.publish();
        debug!(doc_id, writes = writes.len(), version = doc.version, "update");
        Ok(())
    }

    async fn transaction(
        &self,
        doc_id: &str,
        path: &DocPath,
        f: &TransactionFn<'_>,
    ) -> Result<TransactionOutcome, DomainError> {
        for attempt in 1..=self.max_attempts {
            let (seen_version, current) = self.read_versioned(doc_id, path).await;

            let Some(next) = f(current.as_ref()) else {
                debug!(doc_id, %path, attempt, "transaction aborted");
                return Ok(TransactionOutcome {
                    committed: false,
                    snapshot: current,
                });
            };

            let mut docs = self.docs.lock().await;
            let doc = docs
                .entry(doc_id.to_owned())
                .or_insert_with(Document::empty);
            if doc.version != seen_version {
                debug!(doc_id, %path, attempt, "transaction lost a race, retrying");
                continue;
            }
            write_at(&mut doc.value, path, next);
            doc.publish();
            let snapshot = doc.value.as_ref().and_then(|v| read_at(v, path)).cloned();
            debug!(doc_id, %path, attempt, version = doc.version, "transaction committed");
            return Ok(TransactionOutcome {
                committed: true,
                snapshot,
            });
        }

        warn!(doc_id, %path, attempts = self.max_attempts, "transaction gave up");
        Err(DomainError::ConcurrencyConflict {
            path: format!("{doc_id}/{path}"),
            attempts: self.max_attempts,
        })
    }

    async fn remove(&self, doc_id: &str, path: &DocPath) -> Result<(), DomainError> {
        let mut docs = self.docs.lock().await;
        if let Some(doc) = docs.get_mut(doc_id) {
            remove_at(&mut doc.value, path);
            doc.publish();
            debug!(doc_id, %path, version = doc.version, "remove");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(raw: &str) -> DocPath {
        DocPath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_returns_written_value() {
        let store = MemoryDocumentStore::new();

        store.set("ABCD", &DocPath::root(), json!({ "code": "ABCD" })).await.unwrap();
        store.set("ABCD", &path("phase"), json!("LOBBY")).await.unwrap();

        let doc = store.get("ABCD").await.unwrap().unwrap();
        assert_eq!(doc, json!({ "code": "ABCD", "phase": "LOBBY" }));
        assert_eq!(store.version("ABCD").await, 2);
    }

    #[tokio::test]
    async fn test_update_applies_all_writes_as_one_change() {
        let store = MemoryDocumentStore::new();
        store.set("ABCD", &DocPath::root(), json!({ "players": {} })).await.unwrap();

        store
            .update(
                "ABCD",
                &[
                    FieldWrite::new(path("players/p1/votedFor"), "p2").unwrap(),
                    FieldWrite::new(path("players/p1/isVoteLocked"), true).unwrap(),
                ],
            )
            .await
            .unwrap();

        let doc = store.get("ABCD").await.unwrap().unwrap();
        assert_eq!(doc["players"]["p1"], json!({ "votedFor": "p2", "isVoteLocked": true }));
        assert_eq!(store.version("ABCD").await, 2);
    }

    #[tokio::test]
    async fn test_subscription_sees_latest_snapshot() {
        let store = MemoryDocumentStore::new();
        let mut subscription = store.subscribe("ABCD").await.unwrap();
        assert!(subscription.current().is_none());

        store.set("ABCD", &path("round"), json!(1)).await.unwrap();
        store.set("ABCD", &path("round"), json!(2)).await.unwrap();

        let snapshot = subscription.changed().await.unwrap().unwrap();
        assert_eq!(snapshot["round"], json!(2));
    }

    #[tokio::test]
    async fn test_transaction_abort_leaves_document_untouched() {
        let store = MemoryDocumentStore::new();
        store.set("ABCD", &path("phase"), json!("LOBBY")).await.unwrap();

        let outcome = store
            .transaction("ABCD", &path("phase"), &|_| None)
            .await
            .unwrap();

        assert!(!outcome.committed);
        assert_eq!(outcome.snapshot, Some(json!("LOBBY")));
        assert_eq!(store.version("ABCD").await, 1);
    }

    #[tokio::test]
    async fn test_transaction_on_missing_document_sees_none() {
        let store = MemoryDocumentStore::new();

        let outcome = store
            .transaction("NEW1", &DocPath::root(), &|current| {
                assert!(current.is_none());
                Some(json!({ "code": "NEW1" }))
            })
            .await
            .unwrap();

        assert!(outcome.committed);
        assert_eq!(store.get("NEW1").await.unwrap(), Some(json!({ "code": "NEW1" })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transactions_never_lose_an_increment() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set("ABCD", &path("count"), json!(0)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                for _ in 0..10 {
                    store
                        .transaction("ABCD", &path("count"), &|current| {
                            let n = current.and_then(Value::as_u64).unwrap_or(0);
                            Some(json!(n + 1))
                        })
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let doc = store.get("ABCD").await.unwrap().unwrap();
        assert_eq!(doc["count"], json!(80));
    }

    #[tokio::test]
    async fn test_transaction_gives_up_after_max_attempts() {
        let store = MemoryDocumentStore::with_max_attempts(3);
        store.set("ABCD", &path("count"), json!(0)).await.unwrap();

        // Every run of the function sneaks in a competing write first.
        let result = store
            .transaction("ABCD", &path("count"), &|_| {
                let mut docs = store.docs.try_lock().unwrap();
                docs.get_mut("ABCD").unwrap().publish();
                Some(json!(99))
            })
            .await;

        match result.unwrap_err() {
            DomainError::ConcurrencyConflict { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected ConcurrencyConflict, got {other:?}"),
        }
        let doc = store.get("ABCD").await.unwrap().unwrap();
        assert_eq!(doc["count"], json!(0));
    }

    #[tokio::test]
    async fn test_remove_root_deletes_document() {
        let store = MemoryDocumentStore::new();
        store.set("ABCD", &path("code"), json!("ABCD")).await.unwrap();

        store.remove("ABCD", &DocPath::root()).await.unwrap();

        assert!(store.get("ABCD").await.unwrap().is_none());
    }
}
