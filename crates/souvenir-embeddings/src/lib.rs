//! Post-consolidation embedding backfill.
//!
//! [`EmbeddingOrchestrator`] is inert when no [`EmbeddingProvider`] is
//! configured — the top-level engine simply never constructs one, and the
//! vector signal in recall stays permanently zero.

use souvenir_core::errors::StorageError;
use souvenir_core::traits::{EmbeddingProvider, MemoryRepository};

/// Memories pulled per `backfill` call. Bounded so one slow provider can't
/// hold the writer connection for an unbounded batch.
pub const DEFAULT_BACKFILL_LIMIT: usize = 50;

pub struct EmbeddingOrchestrator<P> {
    provider: P,
}

impl<P: EmbeddingProvider> EmbeddingOrchestrator<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Finds recallable memories in `component` with no embedding, embeds
    /// each, and writes the vector back. A single embed failure is logged
    /// and skipped — the memory keeps living without an embedding, still
    /// discoverable via lexical and graph signals.
    pub async fn backfill(
        &self,
        repo: &dyn MemoryRepository,
        component: &str,
        limit: usize,
    ) -> Result<usize, StorageError> {
        let unembedded = repo.find_unembedded(component, limit)?;
        let mut embedded = 0;

        for memory in unembedded {
            match self.provider.embed(&memory.content).await {
                Ok(vector) => {
                    if vector.len() != self.provider.dimensions() {
                        tracing::warn!(
                            memory_id = %memory.id,
                            expected = self.provider.dimensions(),
                            actual = vector.len(),
                            "embedding provider returned a wrong-length vector, skipping"
                        );
                        continue;
                    }
                    let patch = souvenir_core::memory::MemoryPatch::default().embedding(vector);
                    repo.update(&memory.id, &patch)?;
                    embedded += 1;
                }
                Err(err) => {
                    tracing::warn!(memory_id = %memory.id, error = %err, "embedding failed, leaving memory unembedded");
                }
            }
        }
        Ok(embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use souvenir_core::errors::EmbeddingError;
    use souvenir_core::memory::{Memory, MemoryPatch, MemoryStatus};
    use souvenir_core::traits::{MemoryStats, ScoredMemory, SimilarFilter, StorageResult};
    use std::sync::Mutex;

    struct StubProvider {
        dims: usize,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if self.fail_on.as_deref() == Some(text) {
                return Err(EmbeddingError::ProviderFailed { reason: "stub failure".into() });
            }
            Ok(vec![0.0; self.dims])
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    struct StubRepo {
        memories: Mutex<Vec<Memory>>,
    }

    impl MemoryRepository for StubRepo {
        fn insert(&self, memory: &Memory) -> StorageResult<()> {
            self.memories.lock().unwrap().push(memory.clone());
            Ok(())
        }
        fn get(&self, id: &str) -> StorageResult<Option<Memory>> {
            Ok(self.memories.lock().unwrap().iter().find(|m| m.id == id).cloned())
        }
        fn update(&self, id: &str, patch: &MemoryPatch) -> StorageResult<()> {
            let mut guard = self.memories.lock().unwrap();
            let m = guard.iter_mut().find(|m| m.id == id).unwrap();
            if let Some(v) = &patch.embedding {
                m.embedding = Some(v.clone());
            }
            Ok(())
        }
        fn update_access_stats(&self, _ids: &[String]) -> StorageResult<()> {
            Ok(())
        }
        fn search_fts(&self, _query: &str, _limit: usize) -> StorageResult<Vec<ScoredMemory>> {
            Ok(Vec::new())
        }
        fn find_similar(&self, _content: &str, _component: &str, _filter: &SimilarFilter) -> StorageResult<Vec<Memory>> {
            Ok(Vec::new())
        }
        fn find_recallable_with_embedding(&self) -> StorageResult<Vec<Memory>> {
            Ok(Vec::new())
        }
        fn find_unembedded(&self, _component: &str, _limit: usize) -> StorageResult<Vec<Memory>> {
            Ok(self.memories.lock().unwrap().iter().filter(|m| m.embedding.is_none()).cloned().collect())
        }
        fn upsert_entity(&self, entity: &souvenir_core::entity::Entity) -> StorageResult<souvenir_core::entity::Entity> {
            Ok(entity.clone())
        }
        fn upsert_relationship(&self, _rel: &souvenir_core::entity::Relationship) -> StorageResult<()> {
            Ok(())
        }
        fn find_entities_by_name(&self, _query: &str) -> StorageResult<Vec<souvenir_core::entity::Entity>> {
            Ok(Vec::new())
        }
        fn find_relationships_for_entity(&self, _id: &str) -> StorageResult<Vec<souvenir_core::entity::Relationship>> {
            Ok(Vec::new())
        }
        fn find_memories_by_entity_ids(&self, _ids: &[String]) -> StorageResult<Vec<Memory>> {
            Ok(Vec::new())
        }
        fn supersede(&self, _old_id: &str, _new_id: &str) -> StorageResult<()> {
            Ok(())
        }
        fn expire_item(&self, _id: &str) -> StorageResult<()> {
            Ok(())
        }
        fn expire_session(&self, _session_id: &str, _component: &str) -> StorageResult<u64> {
            Ok(0)
        }
        fn active_item_count(&self, _component: &str, _session_id: Option<&str>) -> StorageResult<u64> {
            Ok(0)
        }
        fn apply_importance_decay(
            &self,
            _component: &str,
            _inactive_period: chrono::Duration,
            _decay_rate: f64,
            _floor_threshold: Option<f64>,
        ) -> StorageResult<u64> {
            Ok(0)
        }
        fn expire_lowest_importance(&self, _component: &str, _session_id: &str, _keep: usize) -> StorageResult<u64> {
            Ok(0)
        }
        fn delete_tombstoned(&self, _status: MemoryStatus, _cutoff: chrono::DateTime<chrono::Utc>) -> StorageResult<u64> {
            Ok(0)
        }
        fn delete_orphaned_entities(&self) -> StorageResult<u64> {
            Ok(0)
        }
        fn delete_orphaned_relationships(&self) -> StorageResult<u64> {
            Ok(0)
        }
        fn stats(&self) -> StorageResult<MemoryStats> {
            Ok(MemoryStats::default())
        }
    }

    #[tokio::test]
    async fn backfills_unembedded_memories() {
        let memory = Memory::new("some content", "durable", "fact", 0.5);
        let repo = StubRepo { memories: Mutex::new(vec![memory.clone()]) };
        let orchestrator = EmbeddingOrchestrator::new(StubProvider { dims: 3, fail_on: None });

        let n = orchestrator.backfill(&repo, "durable", 10).await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(repo.get(&memory.id).unwrap().unwrap().embedding, Some(vec![0.0, 0.0, 0.0]));
    }

    #[tokio::test]
    async fn failed_embed_is_skipped_not_fatal() {
        let memory = Memory::new("bad content", "durable", "fact", 0.5);
        let repo = StubRepo { memories: Mutex::new(vec![memory.clone()]) };
        let orchestrator = EmbeddingOrchestrator::new(StubProvider { dims: 3, fail_on: Some("bad content".into()) });

        let n = orchestrator.backfill(&repo, "durable", 10).await.unwrap();
        assert_eq!(n, 0);
        assert_eq!(repo.get(&memory.id).unwrap().unwrap().embedding, None);
    }
}
