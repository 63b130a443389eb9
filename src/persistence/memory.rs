//! In-process snapshot backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Slot, SnapshotBackend};
use crate::error::StorefrontError;

/// Keeps snapshots in a map; nothing survives a restart.
///
/// Selected with `STORE_BACKEND=memory` and used throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: RwLock<HashMap<Slot, serde_json::Value>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotBackend for MemoryBackend {
    async fn load(&self, slot: Slot) -> Result<Option<serde_json::Value>, StorefrontError> {
        Ok(self.slots.read().await.get(&slot).cloned())
    }

    async fn save(&self, slot: Slot, snapshot: &serde_json::Value) -> Result<(), StorefrontError> {
        self.slots.write().await.insert(slot, snapshot.clone());
        Ok(())
    }
}
