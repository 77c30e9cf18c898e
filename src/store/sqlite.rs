// SQLite-backed document store. One schemaless table keyed by
// (collection, id) with the JSON body in a TEXT column; equality filters go
// through json_extract so the common queries stay in SQL.
//
// Change notification is process-local: watchers registered on this store
// instance are re-queried after each write through it. Writes from another
// process are not observed until the next local mutation.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Row, Sqlite};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};
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

pub struct SqliteDocumentStore {
    pool: SqlitePool,
    watchers: Mutex<Vec<Watcher>>,
    buffer: usize,
}

impl SqliteDocumentStore {
    /// Connects to `url` (e.g. `sqlite:data/anisocial.db` or
    /// `sqlite::memory:`), creating the file and schema if needed.
    pub async fn connect(url: &str) -> AppResult<Self> {
        Self::connect_with_buffer(url, DEFAULT_BUFFER).await
    }

    pub async fn connect_with_buffer(url: &str, buffer: usize) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::StoreFailure(format!("invalid database url {}: {}", url, e)))?
            .create_if_missing(true);

        // A pool of in-memory connections would each see a distinct empty
        // database, so pin memory databases to a single connection.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::StoreFailure(format!("failed to connect to {}: {}", url, e)))?;

        let store = Self {
            pool,
            watchers: Mutex::new(Vec::new()),
            buffer: buffer.max(1),
        };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StoreFailure(format!("failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::StoreFailure(format!("failed to create collection index: {}", e)))?;

        Ok(())
    }

    fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> AppResult<Document> {
        let id: String = row.get("id");
        let raw: String = row.get("data");
        let data = serde_json::from_str(&raw)
            .map_err(|e| AppError::StoreFailure(format!("corrupt document {}: {}", id, e)))?;
        Ok(Document { id, data })
    }

    async fn run_query(&self, query: &Query) -> AppResult<Vec<Document>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new("SELECT id, data FROM documents WHERE collection = ");
        qb.push_bind(&query.collection);

        // Scalar filters compare natively via json_extract; anything else
        // falls back to a post-filter over the decoded bodies.
        let mut post_filters: Vec<(String, Value)> = Vec::new();
        for (field, value) in &query.filters {
            match value {
                Value::String(s) => {
                    qb.push(" AND json_extract(data, '$.' || ");
                    qb.push_bind(field.as_str());
                    qb.push(") = ");
                    qb.push_bind(s.clone());
                }
                Value::Number(n) if n.is_i64() => {
                    qb.push(" AND json_extract(data, '$.' || ");
                    qb.push_bind(field.as_str());
                    qb.push(") = ");
                    qb.push_bind(n.as_i64().unwrap_or_default());
                }
                Value::Number(n) if n.is_u64() => {
                    qb.push(" AND json_extract(data, '$.' || ");
                    qb.push_bind(field.as_str());
                    qb.push(") = ");
                    qb.push_bind(n.as_u64().unwrap_or_default() as i64);
                }
                Value::Bool(b) => {
                    qb.push(" AND json_extract(data, '$.' || ");
                    qb.push_bind(field.as_str());
                    qb.push(") = ");
                    qb.push_bind(*b);
                }
                other => post_filters.push((field.clone(), other.clone())),
            }
        }

        if query.newest_first {
            qb.push(" ORDER BY json_extract(data, '$.time') DESC");
        }

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::StoreFailure(format!("query failed: {}", e)))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            let doc = Self::row_to_document(row)?;
            if post_filters.is_empty() || matches(&doc.data, &post_filters) {
                docs.push(doc);
            }
        }
        if query.newest_first && !post_filters.is_empty() {
            sort_newest_first(&mut docs);
        }
        Ok(docs)
    }

    /// Re-runs live queries against `collection` and pushes fresh snapshots.
    /// A failed requery is signalled as an empty snapshot; closed receivers
    /// are pruned; a full channel drops this snapshot for that watcher.
    async fn notify(&self, collection: &str) {
        let mut watchers = self.watchers.lock().await;
        let mut snapshots = Vec::with_capacity(watchers.len());
        for watcher in watchers.iter() {
            if watcher.query.collection != collection {
                snapshots.push(None);
                continue;
            }
            let snapshot = match self.run_query(&watcher.query).await {
                Ok(docs) => docs,
                Err(err) => {
                    warn!(collection, error = %err, "live query failed, delivering empty snapshot");
                    Vec::new()
                }
            };
            snapshots.push(Some(snapshot));
        }

        let mut index = 0;
        watchers.retain(|watcher| {
            let snapshot = snapshots[index].take();
            index += 1;
            match snapshot {
                Some(docs) => match watcher.tx.try_send(docs) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => true,
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                },
                None => true,
            }
        });
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query("SELECT id, data FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::StoreFailure(format!("failed to get {}/{}: {}", collection, id, e))
            })?;
        row.as_ref().map(Self::row_to_document).transpose()
    }

    async fn create(&self, collection: &str, data: Value) -> AppResult<Document> {
        require_object(&data)?;
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO documents (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(&id)
            .bind(data.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::StoreFailure(format!("failed to create in {}: {}", collection, e))
            })?;
        debug!(collection, id = %id, "created document");
        self.notify(collection).await;
        Ok(Document { id, data })
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> AppResult<()> {
        require_object(&data)?;
        sqlx::query("INSERT OR REPLACE INTO documents (collection, id, data) VALUES (?, ?, ?)")
            .bind(collection)
            .bind(id)
            .bind(data.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::StoreFailure(format!("failed to put {}/{}: {}", collection, id, e))
            })?;
        self.notify(collection).await;
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, patch: Value) -> AppResult<()> {
        require_object(&patch)?;
        let existing = self.get(collection, id).await?.ok_or_else(|| {
            AppError::NotFound(format!("no document {}/{} to merge into", collection, id))
        })?;

        let mut data = existing.data;
        if let (Some(target), Some(fields)) = (data.as_object_mut(), patch.as_object()) {
            for (field, value) in fields {
                target.insert(field.clone(), value.clone());
            }
        }

        sqlx::query("UPDATE documents SET data = ? WHERE collection = ? AND id = ?")
            .bind(data.to_string())
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::StoreFailure(format!("failed to merge {}/{}: {}", collection, id, e))
            })?;
        self.notify(collection).await;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::StoreFailure(format!("failed to delete {}/{}: {}", collection, id, e))
            })?;
        if result.rows_affected() > 0 {
            self.notify(collection).await;
        }
        Ok(())
    }

    async fn query(&self, query: Query) -> AppResult<Vec<Document>> {
        self.run_query(&query).await
    }

    async fn subscribe(&self, query: Query) -> AppResult<Subscription> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let initial = match self.run_query(&query).await {
            Ok(docs) => docs,
            Err(err) => {
                warn!(collection = %query.collection, error = %err, "initial live query failed");
                Vec::new()
            }
        };
        // Channel is freshly created with capacity >= 1, so this cannot fail.
        let _ = tx.try_send(initial);
        self.watchers.lock().await.push(Watcher { query, tx });
        Ok(Subscription::new(rx))
    }
}
