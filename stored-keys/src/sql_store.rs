//! Relational stored key backend
//!
//! One row per stored key in the `stored_keys` table, reached through
//! sqlx's SQLite driver. Schema creation runs once when the service is
//! built; a service is never handed out before its table exists.
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use crate::error::{KeyError, KeyResult};
use crate::service::{validate_id, StoredKeyService};
use crate::stored_key::StoredKey;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS stored_keys (
        id TEXT PRIMARY KEY NOT NULL,
        envelope BLOB NOT NULL,
        algorithm TEXT,
        created_at INTEGER NOT NULL
    )
"#;

const SELECT_BY_ID: &str = r#"
    SELECT id, envelope, algorithm, created_at
    FROM stored_keys
    WHERE id = ?
"#;

const UPSERT: &str = r#"
    INSERT INTO stored_keys (id, envelope, algorithm, created_at)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(id) DO UPDATE SET
        envelope = excluded.envelope,
        algorithm = excluded.algorithm,
        created_at = excluded.created_at
"#;

/// Stored key backend over a relational store
///
/// Row locking and isolation are left to the database; concurrent saves
/// of one id are serialized by the upsert statement itself.
pub struct SqlStoredKeyService {
    pool: SqlitePool,
}

impl SqlStoredKeyService {
    /// Wrap an existing pool, creating the schema if needed
    pub async fn new(pool: SqlitePool) -> KeyResult<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| KeyError::Storage(format!("Schema migration failed: {}", e)))?;

        info!("Stored key schema ready");
        Ok(Self { pool })
    }

    /// Open a pool for `database_url` and build the service on it
    ///
    /// In-memory databases get a single, never-recycled connection so every
    /// call sees the same data.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> KeyResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| KeyError::Configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        if is_in_memory(database_url) {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>);
        } else {
            pool_options = pool_options.max_connections(max_connections.max(1));
        }

        info!(max_connections, "Connecting stored key database");

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| KeyError::Storage(format!("Failed to connect to database: {}", e)))?;

        Self::new(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool; later calls fail with [`KeyError::Storage`]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub(crate) fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn storage_error(action: &str, err: sqlx::Error) -> KeyError {
    KeyError::Storage(format!("Failed to {} stored key: {}", action, err))
}

fn row_to_stored_key(row: &SqliteRow) -> Result<StoredKey, sqlx::Error> {
    Ok(StoredKey {
        id: row.try_get("id")?,
        envelope: row.try_get("envelope")?,
        algorithm: row.try_get("algorithm")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl StoredKeyService for SqlStoredKeyService {
    async fn get(&self, id: &str) -> KeyResult<StoredKey> {
        if id.is_empty() {
            return Err(KeyError::NotFound(String::new()));
        }

        let row = sqlx::query(SELECT_BY_ID)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => KeyError::NotFound(id.to_string()),
                other => storage_error("load", other),
            })?;

        row_to_stored_key(&row).map_err(|e| storage_error("decode", e))
    }

    async fn save(&self, record: &StoredKey) -> KeyResult<()> {
        validate_id(&record.id)?;

        sqlx::query(UPSERT)
            .bind(record.id.as_str())
            .bind(record.envelope.as_slice())
            .bind(record.algorithm.as_deref())
            .bind(record.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("save", e))?;

        debug!(key_id = %record.id, "Stored key saved");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
