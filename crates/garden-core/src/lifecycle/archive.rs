//! Bounded archive.

use std::sync::Arc;

use tracing::info;

use crate::error::GardenResult;
use crate::store::{GardenStore, WriteBatch};
use crate::types::IdeaId;

/// Keeps at most `capacity` archived ideas per user, newest first.
///
/// Finalized and discarded ideas share the same slots. The trim runs inside
/// the store transaction of the batch it is attached to.
pub struct ArchiveEvictor {
    store: Arc<dyn GardenStore>,
    capacity: usize,
}

impl ArchiveEvictor {
    pub fn new(store: Arc<dyn GardenStore>, capacity: usize) -> Self {
        Self { store, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Attach the user's archive bound to `batch`.
    pub fn bound(&self, user_id: &str, batch: WriteBatch) -> WriteBatch {
        batch.bound_archive(user_id, self.capacity)
    }

    /// Delete archived ideas beyond capacity, with their logs.
    /// Returns the ids removed, oldest last.
    pub fn evict(&self, user_id: &str) -> GardenResult<Vec<IdeaId>> {
        let evicted = self.store.commit(self.bound(user_id, WriteBatch::new()))?.evicted;
        if !evicted.is_empty() {
            info!(
                user_id,
                deleted = evicted.len(),
                capacity = self.capacity,
                "Evicted archived ideas"
            );
        }
        Ok(evicted)
    }
}
