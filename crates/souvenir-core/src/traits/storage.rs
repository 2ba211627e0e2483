use chrono::{DateTime, Utc};

use crate::entity::{Entity, Relationship};
use crate::episode::Episode;
use crate::errors::StorageError;
use crate::memory::{Memory, MemoryPatch, MemoryStatus};

pub type StorageResult<T> = Result<T, StorageError>;

/// A lexical search hit: the memory plus its positive-oriented BM25 score.
pub type ScoredMemory = (Memory, f64);

/// Persistent append-only log of raw episodes. Synchronous: every backend
/// this is written against (SQLite) answers these calls without suspending
/// long enough to warrant an async trait.
pub trait EpisodeRepository: Send + Sync {
    fn insert(&self, batch: &[Episode]) -> StorageResult<()>;
    fn fetch_unconsolidated(&self, min_age: chrono::Duration) -> StorageResult<Vec<Episode>>;
    fn mark_consolidated(&self, ids: &[String]) -> StorageResult<()>;
    fn delete_consolidated_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}

/// Optional filters narrowing `MemoryRepository::find_similar` to a
/// component-scoped merge candidate search.
#[derive(Debug, Clone, Default)]
pub struct SimilarFilter {
    pub category: Option<String>,
    pub session_id: Option<String>,
    pub limit: usize,
}

/// Aggregate counters returned by `MemoryRepository::stats`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub by_status: Vec<(MemoryStatus, u64)>,
    pub by_component: Vec<(String, u64)>,
}

/// The unified memory table, lexical index, and entity graph. Every method
/// here is the single entry point that the invariants in the data model are
/// enforced at — no other code path mutates these rows.
pub trait MemoryRepository: Send + Sync {
    // --- inserts / updates ---
    fn insert(&self, memory: &Memory) -> StorageResult<()>;
    fn get(&self, id: &str) -> StorageResult<Option<Memory>>;
    fn update(&self, id: &str, patch: &MemoryPatch) -> StorageResult<()>;
    fn update_access_stats(&self, ids: &[String]) -> StorageResult<()>;

    // --- lexical search ---
    fn search_fts(&self, query: &str, limit: usize) -> StorageResult<Vec<ScoredMemory>>;
    fn find_similar(&self, content: &str, component: &str, filter: &SimilarFilter) -> StorageResult<Vec<Memory>>;

    // --- vector ---
    fn find_recallable_with_embedding(&self) -> StorageResult<Vec<Memory>>;
    fn find_unembedded(&self, component: &str, limit: usize) -> StorageResult<Vec<Memory>>;

    // --- graph ---
    fn upsert_entity(&self, entity: &Entity) -> StorageResult<Entity>;
    fn upsert_relationship(&self, rel: &Relationship) -> StorageResult<()>;
    fn find_entities_by_name(&self, query: &str) -> StorageResult<Vec<Entity>>;
    fn find_relationships_for_entity(&self, id: &str) -> StorageResult<Vec<Relationship>>;
    fn find_memories_by_entity_ids(&self, ids: &[String]) -> StorageResult<Vec<Memory>>;

    // --- lifecycle ---
    fn supersede(&self, old_id: &str, new_id: &str) -> StorageResult<()>;
    fn expire_item(&self, id: &str) -> StorageResult<()>;
    fn expire_session(&self, session_id: &str, component: &str) -> StorageResult<u64>;
    fn active_item_count(&self, component: &str, session_id: Option<&str>) -> StorageResult<u64>;
    fn apply_importance_decay(
        &self,
        component: &str,
        inactive_period: chrono::Duration,
        decay_rate: f64,
        floor_threshold: Option<f64>,
    ) -> StorageResult<u64>;
    fn expire_lowest_importance(&self, component: &str, session_id: &str, keep: usize) -> StorageResult<u64>;
    fn delete_tombstoned(&self, status: MemoryStatus, cutoff: DateTime<Utc>) -> StorageResult<u64>;
    fn delete_orphaned_entities(&self) -> StorageResult<u64>;
    fn delete_orphaned_relationships(&self) -> StorageResult<u64>;
    fn stats(&self) -> StorageResult<MemoryStats>;
}
