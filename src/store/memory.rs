// In-memory document store for tests and ephemeral embeddings. Single
// RwLock over all collections; every mutation re-runs the registered live
// queries for that collection and pushes fresh snapshots.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{
    matches, require_object, sort_newest_first, Document, DocumentStore, Query, Subscription,
};

const DEFAULT_BUFFER: usize = 64;

struct Watcher {
    query: Query,
    tx: mpsc::Sender<Vec<Document>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Value>>,
    watchers: Vec<Watcher>,
}

pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
    buffer: usize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_BUFFER)
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            buffer: buffer.max(1),
        }
    }

    fn run_query(
        collections: &HashMap<String, BTreeMap<String, Value>>,
        query: &Query,
    ) -> Vec<Document> {
        let mut docs: Vec<Document> = collections
            .get(&query.collection)
            .map(|collection| {
                collection
                    .iter()
                    .filter(|(_, data)| matches(data, &query.filters))
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        if query.newest_first {
            sort_newest_first(&mut docs);
        }
        docs
    }

    /// Re-runs every live query registered against `collection` and pushes
    /// the result. Watchers whose receiver is gone are pruned; watchers
    /// whose channel is full simply miss this snapshot.
    fn notify(inner: &mut Inner, collection: &str) {
        let Inner {
            collections,
            watchers,
        } = inner;
        watchers.retain(|watcher| {
            if watcher.query.collection != collection {
                return true;
            }
            let snapshot = Self::run_query(collections, &watcher.query);
            match watcher.tx.try_send(snapshot) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => true,
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn create(&self, collection: &str, data: Value) -> AppResult<Document> {
        require_object(&data)?;
        let id = Uuid::new_v4().to_string();
        let mut inner = self.inner.write().await;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data.clone());
        Self::notify(&mut inner, collection);
        debug!(collection, id = %id, "created document");
        Ok(Document { id, data })
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> AppResult<()> {
        require_object(&data)?;
        let mut inner = self.inner.write().await;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> AppResult<()> {
        require_object(&patch)?;
        let mut inner = self.inner.write().await;
        let existing = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| {
                AppError::NotFound(format!("no document {}/{} to merge into", collection, id))
            })?;
        if let (Some(target), Some(fields)) = (existing.as_object_mut(), patch.as_object()) {
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|c| c.remove(id))
            .is_some();
        if removed {
            Self::notify(&mut inner, collection);
        }
        Ok(())
    }

    async fn query(&self, query: Query) -> AppResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(Self::run_query(&inner.collections, &query))
    }

    async fn subscribe(&self, query: Query) -> AppResult<Subscription> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut inner = self.inner.write().await;
        let initial = Self::run_query(&inner.collections, &query);
        // Channel is freshly created with capacity >= 1, so this cannot fail.
        let _ = tx.try_send(initial);
        inner.watchers.push(Watcher { query, tx });
        Ok(Subscription::new(rx))
    }
}
