//! Persistence layer: snapshot backends for the four store slots.
//!
//! The [`crate::domain::Store`] keeps its collections in memory and hands a
//! full JSON snapshot of every touched collection to a [`SnapshotBackend`]
//! after each mutation. There is no incremental update and no schema
//! versioning: a slot is whatever the last successful `save` wrote.

pub mod file;
pub mod memory;
pub mod postgres;
pub mod slot;

use async_trait::async_trait;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use postgres::PostgresBackend;
pub use slot::Slot;

use crate::error::StorefrontError;

/// Durable home for slot snapshots.
#[async_trait]
pub trait SnapshotBackend: Send + Sync + std::fmt::Debug {
    /// Returns the last saved snapshot of `slot`, or `None` if it was never
    /// written.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PersistenceError`] if the backend cannot
    /// be read.
    async fn load(&self, slot: Slot) -> Result<Option<serde_json::Value>, StorefrontError>;

    /// Replaces the snapshot of `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::PersistenceError`] if the write fails.
    async fn save(&self, slot: Slot, snapshot: &serde_json::Value) -> Result<(), StorefrontError>;
}
