// Document store seam. Collection-addressable JSON records with point
// lookups, equality-filter queries and live snapshot subscriptions — the
// full set of primitives the services need, and nothing backend-specific.

pub mod memory;
pub mod sqlite;

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{AppError, AppResult};

pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// One addressable record: store-assigned (or caller-assigned) id plus the
/// JSON object body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn deserialize<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.data.clone()).map_err(AppError::from)
    }
}

/// A typed document paired with its store id, for callers that need both
/// (e.g. deleting a friendship edge by its document id later).
#[derive(Debug, Clone, Serialize)]
pub struct Stored<T> {
    pub id: String,
    pub data: T,
}

/// Equality-filter query over one collection, optionally ordered by the
/// `time` field, newest first.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub newest_first: bool,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self {
            collection: name.to_string(),
            filters: Vec::new(),
            newest_first: false,
        }
    }

    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push((field.to_string(), value.into()));
        self
    }

    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }
}

/// Live query handle. Each received item is the *full* current result set of
/// the query after a matching change; the first snapshot arrives right after
/// registration. A requery failure inside the store is swallowed and
/// signalled as an empty snapshot. `recv` returning `None` means the store
/// dropped the watcher (store shut down), not an error.
///
/// No ordering guarantee exists between a caller's own write and the next
/// snapshot reflecting it, and a slow consumer may observe fewer snapshots
/// than there were mutations.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<Vec<Document>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<Vec<Document>>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }

    /// Detaches the watcher. Dropping the handle does the same; this exists
    /// so call sites can state the intent.
    pub fn cancel(self) {}
}

impl Stream for Subscription {
    type Item = Vec<Document>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

/// [`Subscription`] that decodes each snapshot into `Stored<T>` items.
/// Documents that fail to decode are logged and skipped rather than killing
/// the feed.
#[derive(Debug)]
pub struct TypedSubscription<T> {
    inner: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> TypedSubscription<T> {
    pub fn new(inner: Subscription) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    pub async fn recv(&mut self) -> Option<Vec<Stored<T>>> {
        let docs = self.inner.recv().await?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.deserialize::<T>() {
                Ok(data) => items.push(Stored { id: doc.id, data }),
                Err(err) => warn!(id = %doc.id, error = %err, "skipping undecodable document in snapshot"),
            }
        }
        Some(items)
    }

    pub fn cancel(self) {}
}

/// Backend seam for all persistence. Implementations must be safe to share
/// behind an `Arc` across tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Point lookup by id.
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Insert with a store-generated id. `data` must be a JSON object.
    async fn create(&self, collection: &str, data: Value) -> AppResult<Document>;

    /// Upsert by id: creates or fully replaces.
    async fn put(&self, collection: &str, id: &str, data: Value) -> AppResult<()>;

    /// Shallow field merge into an existing document. Fails with `NotFound`
    /// when the document does not exist.
    async fn merge(&self, collection: &str, id: &str, patch: Value) -> AppResult<()>;

    /// Delete by id. Deleting a missing id is not an error.
    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Run an equality-filter query.
    async fn query(&self, query: Query) -> AppResult<Vec<Document>>;

    /// Register a live query delivering full result snapshots on change.
    async fn subscribe(&self, query: Query) -> AppResult<Subscription>;
}

pub(crate) fn require_object(data: &Value) -> AppResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(
            "document body must be a JSON object".to_string(),
        ))
    }
}

/// Shared filter predicate: strict JSON equality per field.
pub(crate) fn matches(data: &Value, filters: &[(String, Value)]) -> bool {
    filters
        .iter()
        .all(|(field, expected)| data.get(field) == Some(expected))
}

/// Shared ordering helper for `newest_first` queries.
pub(crate) fn sort_newest_first(docs: &mut [Document]) {
    docs.sort_by_key(|doc| {
        std::cmp::Reverse(doc.data.get("time").and_then(Value::as_i64).unwrap_or(0))
    });
}
