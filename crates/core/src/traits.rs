use crate::error::StoreError;
use crate::models::{ScoredHit, VectorRecord};
use async_trait::async_trait;

/// Nearest-neighbor index keyed by deterministic chunk id. Writing an id that
/// already exists replaces the record; that is the whole idempotency story.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// The named collection this store is addressed by.
    fn name(&self) -> &str;

    /// Create the backing collection if it does not exist yet.
    async fn ensure_collection(&self, dimensions: usize) -> Result<(), StoreError>;

    /// Explicit existence check, queried before deciding between
    /// `IndexNotFound` and a real search. Never used as exception control
    /// flow.
    async fn collection_exists(&self) -> Result<bool, StoreError>;

    /// Insert-or-replace by record id.
    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), StoreError>;

    /// K nearest records, nearest-first, with the backend's distance score.
    /// Callers clamp `k` before reaching this layer.
    async fn search(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredHit>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;
}
