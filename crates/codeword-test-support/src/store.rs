//! Test stores — mock `DocumentStore` implementations for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use codeword_core::error::DomainError;
use codeword_core::store::{
    DocPath, DocumentStore, FieldWrite, Snapshot, Subscription, TransactionFn,
    TransactionOutcome, read_at, write_at,
};
use serde_json::Value;
use tokio::sync::watch;

/// A single-document store that records every write it receives.
///
/// Writes are applied to the held document, so a handler that reads after
/// writing sees its own changes. Transactions run their function exactly
/// once; there is never a competing writer.
#[derive(Debug)]
pub struct RecordingDocumentStore {
    doc: Mutex<Option<Value>>,
    writes: Mutex<Vec<FieldWrite>>,
    transactions: Mutex<Vec<DocPath>>,
    tx: watch::Sender<Snapshot>,
}

impl RecordingDocumentStore {
    /// Create a store holding `doc` under every document id.
    #[must_use]
    pub fn new(doc: Option<Value>) -> Self {
        let (tx, _rx) = watch::channel(doc.clone().map(Arc::new));
        Self {
            doc: Mutex::new(doc),
            writes: Mutex::new(Vec::new()),
            transactions: Mutex::new(Vec::new()),
            tx,
        }
    }

    /// Every `set`, `update`, and `remove` write in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn recorded_writes(&self) -> Vec<FieldWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Paths of every committed transaction in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn committed_transactions(&self) -> Vec<DocPath> {
        self.transactions.lock().unwrap().clone()
    }

    /// The held document.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn document(&self) -> Option<Value> {
        self.doc.lock().unwrap().clone()
    }

    fn apply(&self, writes: &[FieldWrite]) {
        let mut doc = self.doc.lock().unwrap();
        for write in writes {
            write_at(&mut doc, &write.path, write.value.clone());
        }
        self.writes.lock().unwrap().extend_from_slice(writes);
        self.tx.send_replace(doc.clone().map(Arc::new));
    }
}

#[async_trait]
impl DocumentStore for RecordingDocumentStore {
    async fn get(&self, _doc_id: &str) -> Result<Option<Value>, DomainError> {
        Ok(self.document())
    }

    async fn subscribe(&self, _doc_id: &str) -> Result<Subscription, DomainError> {
        Ok(Subscription::new(self.tx.subscribe()))
    }

    async fn set(&self, _doc_id: &str, path: &DocPath, value: Value) -> Result<(), DomainError> {
        self.apply(&[FieldWrite {
            path: path.clone(),
            value,
        }]);
        Ok(())
    }

    async fn update(&self, _doc_id: &str, writes: &[FieldWrite]) -> Result<(), DomainError> {
        self.apply(writes);
        Ok(())
    }

    async fn transaction(
        &self,
        _doc_id: &str,
        path: &DocPath,
        f: &TransactionFn<'_>,
    ) -> Result<TransactionOutcome, DomainError> {
        let current = self
            .document()
            .and_then(|doc| read_at(&doc, path).cloned());
        match f(current.as_ref()) {
            Some(next) => {
                let mut doc = self.doc.lock().unwrap();
                write_at(&mut doc, path, next.clone());
                self.tx.send_replace(doc.clone().map(Arc::new));
                self.transactions.lock().unwrap().push(path.clone());
                Ok(TransactionOutcome {
                    committed: true,
                    snapshot: Some(next).filter(|v| !v.is_null()),
                })
            }
            None => Ok(TransactionOutcome {
                committed: false,
                snapshot: current,
            }),
        }
    }

    async fn remove(&self, _doc_id: &str, path: &DocPath) -> Result<(), DomainError> {
        self.apply(&[FieldWrite::delete(path.clone())]);
        Ok(())
    }
}

/// A store that always returns an infrastructure error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingDocumentStore;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("document store unavailable".into())
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn get(&self, _doc_id: &str) -> Result<Option<Value>, DomainError> {
        Err(unavailable())
    }

    async fn subscribe(&self, _doc_id: &str) -> Result<Subscription, DomainError> {
        Err(unavailable())
    }

    async fn set(&self, _doc_id: &str, _path: &DocPath, _value: Value) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn update(&self, _doc_id: &str, _writes: &[FieldWrite]) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn transaction(
        &self,
        _doc_id: &str,
        _path: &DocPath,
        _f: &TransactionFn<'_>,
    ) -> Result<TransactionOutcome, DomainError> {
        Err(unavailable())
    }

    async fn remove(&self, _doc_id: &str, _path: &DocPath) -> Result<(), DomainError> {
        Err(unavailable())
    }
}
