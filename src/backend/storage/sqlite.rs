/**
 * SQLite Blob Store
 * 
 * Durable storage backed by a single `blobs` table. The schema lives in
 * `migrations/` and is applied on connect, the same way the server has always
 * managed its database.
 */

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::{BlobStore, StorageError, StoredObject};

/// SQLite-backed blob store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to (creating if missing) the database at `database_url` and run migrations
    ///
    /// In-memory URLs get a single connection, since every SQLite connection
    /// would otherwise see its own empty database.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        tracing::info!("[Storage] Connecting to {}", database_url);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        sqlx::migrate!().run(&pool).await?;
        tracing::info!("[Storage] Migrations applied");

        Ok(Self { pool })
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let row = sqlx::query("SELECT body, content_type FROM blobs WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let body: Vec<u8> = row.try_get("body")?;
                let content_type: Option<String> = row.try_get("content_type")?;
                Ok(Some(StoredObject::new(body, content_type)))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, object: StoredObject) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO blobs (key, body, content_type, updated_at) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(key) DO UPDATE SET body = excluded.body, \
             content_type = excluded.content_type, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(object.body.as_ref())
        .bind(object.content_type.as_deref())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM blobs WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}
