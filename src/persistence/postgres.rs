//! PostgreSQL implementation of the snapshot backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{Slot, SnapshotBackend};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;

/// PostgreSQL-backed snapshot store using `sqlx::PgPool`.
///
/// Each slot is one row of `store_snapshots`, replaced with an upsert.
#[derive(Debug, Clone)]
pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    /// Creates a backend over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the database settings in `config` and ensures the
    /// snapshot table exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StorefrontError::PersistenceError`] if the connection
    /// or the schema setup fails.
    pub async fn connect(config: &StorefrontConfig) -> Result<Self, StorefrontError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await
            .map_err(|e| StorefrontError::PersistenceError(e.to_string()))?;
        let backend = Self::new(pool);
        backend.ensure_schema().await?;
        Ok(backend)
    }

    /// Creates the `store_snapshots` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`StorefrontError::PersistenceError`] on database failure.
    pub async fn ensure_schema(&self) -> Result<(), StorefrontError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS store_snapshots (\
                slot TEXT PRIMARY KEY, \
                payload JSONB NOT NULL, \
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now())",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::PersistenceError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotBackend for PostgresBackend {
    async fn load(&self, slot: Slot) -> Result<Option<serde_json::Value>, StorefrontError> {
        sqlx::query_scalar::<_, serde_json::Value>(
            "SELECT payload FROM store_snapshots WHERE slot = $1",
        )
        .bind(slot.key())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorefrontError::PersistenceError(e.to_string()))
    }

    async fn save(&self, slot: Slot, snapshot: &serde_json::Value) -> Result<(), StorefrontError> {
        sqlx::query(
            "INSERT INTO store_snapshots (slot, payload, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (slot) DO UPDATE SET payload = EXCLUDED.payload, updated_at = now()",
        )
        .bind(slot.key())
        .bind(snapshot)
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::PersistenceError(e.to_string()))?;
        Ok(())
    }
}
