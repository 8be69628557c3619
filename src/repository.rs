use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// StoreError
///
/// Failures of the document store. Callers surface all of them as generic server errors;
/// there is no distinction between transient and permanent failures and no retry.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored document does not match its schema: {0}")]
    Corrupt(String),
}

/// RawDocument
///
/// An untyped document as the store sees it. `body` is the resource payload; the
/// handlers decode it into the resource's schema.
#[derive(Debug, Clone, FromRow)]
pub struct RawDocument {
    pub id: Uuid,
    #[sqlx(json)]
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository Trait
///
/// The document-store contract. Every content entity lives in its own named collection;
/// each operation touches exactly one document (or one collection scan) and is atomic at
/// that level. Nothing composes multiple documents into a transaction.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across handlers.
#[async_trait]
pub trait Repository: Send + Sync {
    /// All documents of a collection, newest first.
    async fn list(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError>;

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError>;

    /// Stores a new document under a fresh id.
    async fn insert(&self, collection: &str, body: Value) -> Result<RawDocument, StoreError>;

    /// Replaces the body of an existing document. `None` if it does not exist.
    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<RawDocument>, StoreError>;

    /// Returns true if a document was removed.
    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the document store across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// Document store backed by a single JSONB table keyed by `(collection, id)`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the `documents` table and its listing index if they are missing. Idempotent,
    /// safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id UUID NOT NULL,
                body JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_collection_created_idx \
             ON documents (collection, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn list(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError> {
        let docs = sqlx::query_as::<_, RawDocument>(
            r#"
            SELECT id, body, created_at, updated_at
            FROM documents
            WHERE collection = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let doc = sqlx::query_as::<_, RawDocument>(
            "SELECT id, body, created_at, updated_at FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<RawDocument, StoreError> {
        let doc = sqlx::query_as::<_, RawDocument>(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(Uuid::new_v4())
        .bind(sqlx::types::Json(body))
        .fetch_one(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<RawDocument>, StoreError> {
        let doc = sqlx::query_as::<_, RawDocument>(
            r#"
            UPDATE documents
            SET body = $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING id, body, created_at, updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(sqlx::types::Json(body))
        .fetch_optional(&self.pool)
        .await?;
        Ok(doc)
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// MemoryRepository
///
/// In-process document store used by the test suites. Collections keep insertion order,
/// so listing walks them backwards to return the newest first.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<HashMap<String, Vec<RawDocument>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in a collection.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list(&self, collection: &str) -> Result<Vec<RawDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: Uuid) -> Result<Option<RawDocument>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    async fn insert(&self, collection: &str, body: Value) -> Result<RawDocument, StoreError> {
        let now = Utc::now();
        let doc = RawDocument {
            id: Uuid::new_v4(),
            body,
            created_at: now,
            updated_at: now,
        };
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn replace(
        &self,
        collection: &str,
        id: Uuid,
        body: Value,
    ) -> Result<Option<RawDocument>, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
        else {
            return Ok(None);
        };
        doc.body = body;
        doc.updated_at = Utc::now();
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &str, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        Ok(docs.len() < before)
    }
}
