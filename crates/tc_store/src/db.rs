//! Database abstraction over SQLite via sqlx.

use std::path::Path;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::{error::StoreError, models::VaultRecord};

/// Central store handle.  Cheap to clone (Arc internally).
#[derive(Clone)]
pub struct Store {
    pub pool: SqlitePool,
}

impl Store {
    /// Open (or create) the SQLite database at `db_path`.
    /// Runs all pending migrations automatically.
    ///
    /// WAL journal mode and foreign-key enforcement are configured at
    /// connection time here, not inside a migration, because SQLite forbids
    /// changing `journal_mode` inside a transaction and sqlx wraps every
    /// migration in one.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store for tests. Pinned to a single connection so every
    /// query sees the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))
    }

    /// Fetch the record for an identifier hash, if any.
    pub async fn get(&self, identifier_hash: &str) -> Result<Option<VaultRecord>, StoreError> {
        let record = sqlx::query_as::<_, VaultRecord>(
            "SELECT identifier_hash, credentials_enc, thread_ref_enc, current_day, \
             created_at, updated_at FROM vault_records WHERE identifier_hash = ?",
        )
        .bind(identifier_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Insert or overwrite the credential blob for a hash.
    ///
    /// On conflict only `credentials_enc` and `updated_at` change:
    /// reconnecting with the same session must not erase thread progress.
    pub async fn upsert_credentials(
        &self,
        identifier_hash: &str,
        credentials_enc: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO vault_records \
             (identifier_hash, credentials_enc, thread_ref_enc, current_day, created_at, updated_at) \
             VALUES (?, ?, NULL, 0, ?, ?) \
             ON CONFLICT(identifier_hash) DO UPDATE SET \
             credentials_enc = excluded.credentials_enc, \
             updated_at = excluded.updated_at",
        )
        .bind(identifier_hash)
        .bind(credentials_enc)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        tracing::debug!(hash = %&identifier_hash[..8], "credentials upserted");
        Ok(())
    }

    /// Update progress fields only. Fails with `NotFound` when no credential
    /// row exists for the hash — progress cannot precede credentials.
    pub async fn save_progress(
        &self,
        identifier_hash: &str,
        current_day: i64,
        thread_ref_enc: Option<&str>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE vault_records SET current_day = ?, thread_ref_enc = ?, updated_at = ? \
             WHERE identifier_hash = ?",
        )
        .bind(current_day)
        .bind(thread_ref_enc)
        .bind(Utc::now())
        .bind(identifier_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "no vault record for hash {}...",
                &identifier_hash[..8]
            )));
        }
        tracing::debug!(hash = %&identifier_hash[..8], day = current_day, "progress saved");
        Ok(())
    }

    /// Delete the record for a hash. Idempotent: deleting a missing row
    /// succeeds.
    pub async fn delete(&self, identifier_hash: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM vault_records WHERE identifier_hash = ?")
            .bind(identifier_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
