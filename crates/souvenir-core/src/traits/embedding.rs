use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::EmbeddingError;

/// External embedding collaborator. Unlike the synchronous storage traits,
/// this one is async: the spec types `embed` as `→ future<vector>`, since a
/// real provider is a network call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Fixed per provider; the store validates every write against this.
    fn dimensions(&self) -> usize;
}

/// Lets a shared, type-erased provider satisfy `P: EmbeddingProvider` bounds
/// directly, so the engine can hand the same `Arc` to both the recall
/// pipeline (by reference) and an `EmbeddingOrchestrator` (by clone) without
/// its generic collaborators needing to know about `Arc`.
#[async_trait]
impl EmbeddingProvider for Arc<dyn EmbeddingProvider> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}
