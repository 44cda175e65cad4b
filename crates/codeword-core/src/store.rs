//! Shared-document store abstraction.
//!
//! Every client observes and mutates one JSON document per session. The
//! engine needs exactly five primitives from whatever transport hosts that
//! document: snapshot subscription, unconditional partial writes, an atomic
//! compare-and-retry transaction, and removal.
//!
//! Writing `null` to a path removes the key, so optional fields simply
//! disappear from the document when cleared.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::error::DomainError;

/// A `/`-separated path into a document. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocPath(Vec<String>);

impl DocPath {
    /// The document root.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parses `a/b/c`. An empty string is the root.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if any segment is empty.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        let segments: Vec<String> = raw.split('/').map(str::to_owned).collect();
        if segments.iter().any(String::is_empty) {
            return Err(DomainError::Validation(format!(
                "document path has an empty segment: {raw:?}"
            )));
        }
        Ok(Self(segments))
    }

    /// Returns this path extended by one segment.
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// The path segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this is the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// One unconditional write inside an `update`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWrite {
    /// Target path.
    pub path: DocPath,
    /// New value; `null` removes the key.
    pub value: Value,
}

impl FieldWrite {
    /// Serializes `value` into a write at `path`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if `value` cannot be serialized.
    pub fn new(path: DocPath, value: impl Serialize) -> Result<Self, DomainError> {
        Ok(Self {
            path,
            value: serde_json::to_value(value)?,
        })
    }

    /// A write that removes the key at `path`.
    #[must_use]
    pub fn delete(path: DocPath) -> Self {
        Self {
            path,
            value: Value::Null,
        }
    }
}

/// A full-document snapshot; `None` once the document is gone.
pub type Snapshot = Option<Arc<Value>>;

/// Stream of full-document snapshots for one document.
///
/// Latest-value semantics: a slow reader sees the newest snapshot and may
/// skip intermediate ones, which is all a client polling derived state needs.
#[derive(Debug)]
pub struct Subscription {
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    /// Wraps a watch receiver fed by a store implementation.
    #[must_use]
    pub fn new(rx: watch::Receiver<Snapshot>) -> Self {
        Self { rx }
    }

    /// The most recent snapshot without waiting.
    #[must_use]
    pub fn current(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// Waits for the next change and returns the new snapshot.
    ///
    /// Returns `None` once the store side has been dropped.
    pub async fn changed(&mut self) -> Option<Snapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Transaction body: receives the current value at the path and returns the
/// value to commit, or `None` to abort without writing.
pub type TransactionFn<'a> = dyn Fn(Option<&Value>) -> Option<Value> + Send + Sync + 'a;

/// Result of a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionOutcome {
    /// Whether a value was written.
    pub committed: bool,
    /// The value at the path after the transaction (committed or not).
    pub snapshot: Option<Value>,
}

/// The shared real-time document store the engine runs against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a whole document once.
    async fn get(&self, doc_id: &str) -> Result<Option<Value>, DomainError>;

    /// Subscribes to full-document snapshots.
    async fn subscribe(&self, doc_id: &str) -> Result<Subscription, DomainError>;

    /// Unconditionally writes one value.
    async fn set(&self, doc_id: &str, path: &DocPath, value: Value) -> Result<(), DomainError>;

    /// Unconditionally applies several writes as a single change.
    async fn update(&self, doc_id: &str, writes: &[FieldWrite]) -> Result<(), DomainError>;

    /// Atomic read-modify-write with automatic retry on conflicting writes.
    async fn transaction(
        &self,
        doc_id: &str,
        path: &DocPath,
        f: &TransactionFn<'_>,
    ) -> Result<TransactionOutcome, DomainError>;

    /// Removes the value at a path.
    async fn remove(&self, doc_id: &str, path: &DocPath) -> Result<(), DomainError>;
}

/// Reads the value at `path` inside `doc`.
#[must_use]
pub fn read_at<'a>(doc: &'a Value, path: &DocPath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(doc, |node, segment| node.get(segment.as_str()))
}

/// Writes `value` at `path`, creating intermediate objects. `null` removes.
pub fn write_at(doc: &mut Option<Value>, path: &DocPath, value: Value) {
    if value.is_null() {
        remove_at(doc, path);
        return;
    }
    let Some((last, parents)) = path.segments().split_last() else {
        *doc = Some(value);
        return;
    };
    let mut map = ensure_object(doc.get_or_insert_with(|| Value::Object(Map::new())));
    for segment in parents {
        map = ensure_object(map.entry(segment.clone()).or_insert(Value::Null));
    }
    map.insert(last.clone(), value);
}

/// Removes the value at `path`. Removing the root drops the document.
pub fn remove_at(doc: &mut Option<Value>, path: &DocPath) {
    let Some((last, parents)) = path.segments().split_last() else {
        *doc = None;
        return;
    };
    let Some(mut node) = doc.as_mut() else {
        return;
    };
    for segment in parents {
        match node.get_mut(segment.as_str()) {
            Some(child) => node = child,
            None => return,
        }
    }
    if let Value::Object(map) = node {
        map.remove(last);
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}
