//! The concrete `StorageEngine`: owns a connection pool and implements
//! `EpisodeRepository` / `MemoryRepository` by delegating to `queries`.

use std::path::Path;

use chrono::{DateTime, Utc};
use souvenir_core::entity::{Entity, Relationship};
use souvenir_core::episode::Episode;
use souvenir_core::errors::StorageError;
use souvenir_core::memory::{Memory, MemoryPatch, MemoryStatus};
use souvenir_core::traits::{EpisodeRepository, MemoryRepository, MemoryStats, ScoredMemory, SimilarFilter, StorageResult};

use crate::migrations::run_migrations;
use crate::pool::{ConnectionPool, ReadPool};
use crate::queries::{episode_store, graph, lifecycle, memory_crud, memory_search, vector_search};

pub struct StorageEngine {
    pool: ConnectionPool,
    /// In-memory databases give every `ReadPool` connection its own isolated
    /// database, so reads there must route through the writer instead.
    use_read_pool: bool,
}

impl StorageEngine {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let pool = ConnectionPool::open(path, ReadPool::default_size())?;
        pool.writer.with_conn(run_migrations)?;
        Ok(Self { pool, use_read_pool: true })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let pool = ConnectionPool::open_in_memory(ReadPool::default_size())?;
        pool.writer.with_conn(run_migrations)?;
        Ok(Self { pool, use_read_pool: false })
    }

    fn with_reader<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StorageResult<T>,
    {
        if self.use_read_pool {
            self.pool.readers.with_conn(f)
        } else {
            self.pool.writer.with_conn(f)
        }
    }

    fn with_writer<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> StorageResult<T>,
    {
        self.pool.writer.with_conn(f)
    }
}

impl EpisodeRepository for StorageEngine {
    fn insert(&self, batch: &[Episode]) -> StorageResult<()> {
        self.with_writer(|conn| episode_store::insert(conn, batch))
    }

    fn fetch_unconsolidated(&self, min_age: chrono::Duration) -> StorageResult<Vec<Episode>> {
        self.with_reader(|conn| episode_store::fetch_unconsolidated(conn, min_age))
    }

    fn mark_consolidated(&self, ids: &[String]) -> StorageResult<()> {
        self.with_writer(|conn| episode_store::mark_consolidated(conn, ids))
    }

    fn delete_consolidated_before(&self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        self.with_writer(|conn| episode_store::delete_consolidated_before(conn, cutoff))
    }
}

impl MemoryRepository for StorageEngine {
    fn insert(&self, memory: &Memory) -> StorageResult<()> {
        self.with_writer(|conn| memory_crud::insert_memory(conn, memory))
    }

    fn get(&self, id: &str) -> StorageResult<Option<Memory>> {
        self.with_reader(|conn| memory_crud::get_memory(conn, id))
    }

    fn update(&self, id: &str, patch: &MemoryPatch) -> StorageResult<()> {
        self.with_writer(|conn| memory_crud::update_memory(conn, id, patch))
    }

    fn update_access_stats(&self, ids: &[String]) -> StorageResult<()> {
        self.with_writer(|conn| memory_crud::update_access_stats(conn, ids))
    }

    fn search_fts(&self, query: &str, limit: usize) -> StorageResult<Vec<ScoredMemory>> {
        self.with_reader(|conn| memory_search::search_fts(conn, query, limit))
    }

    fn find_similar(&self, content: &str, component: &str, filter: &SimilarFilter) -> StorageResult<Vec<Memory>> {
        self.with_reader(|conn| memory_search::find_similar(conn, content, component, filter))
    }

    fn find_recallable_with_embedding(&self) -> StorageResult<Vec<Memory>> {
        self.with_reader(vector_search::find_recallable_with_embedding)
    }

    fn find_unembedded(&self, component: &str, limit: usize) -> StorageResult<Vec<Memory>> {
        self.with_reader(|conn| vector_search::find_unembedded(conn, component, limit))
    }

    fn upsert_entity(&self, entity: &Entity) -> StorageResult<Entity> {
        self.with_writer(|conn| graph::upsert_entity(conn, entity))
    }

    fn upsert_relationship(&self, rel: &Relationship) -> StorageResult<()> {
        self.with_writer(|conn| graph::upsert_relationship(conn, rel))
    }

    fn find_entities_by_name(&self, query: &str) -> StorageResult<Vec<Entity>> {
        self.with_reader(|conn| graph::find_entities_by_name(conn, query))
    }

    fn find_relationships_for_entity(&self, id: &str) -> StorageResult<Vec<Relationship>> {
        self.with_reader(|conn| graph::find_relationships_for_entity(conn, id))
    }

    fn find_memories_by_entity_ids(&self, ids: &[String]) -> StorageResult<Vec<Memory>> {
        self.with_reader(|conn| graph::find_memories_by_entity_ids(conn, ids))
    }

    fn supersede(&self, old_id: &str, new_id: &str) -> StorageResult<()> {
        self.with_writer(|conn| lifecycle::supersede(conn, old_id, new_id))
    }

    fn expire_item(&self, id: &str) -> StorageResult<()> {
        self.with_writer(|conn| lifecycle::expire_item(conn, id))
    }

    fn expire_session(&self, session_id: &str, component: &str) -> StorageResult<u64> {
        self.with_writer(|conn| lifecycle::expire_session(conn, session_id, component))
    }

    fn active_item_count(&self, component: &str, session_id: Option<&str>) -> StorageResult<u64> {
        self.with_reader(|conn| lifecycle::active_item_count(conn, component, session_id))
    }

    fn apply_importance_decay(
        &self,
        component: &str,
        inactive_period: chrono::Duration,
        decay_rate: f64,
        floor_threshold: Option<f64>,
    ) -> StorageResult<u64> {
        self.with_writer(|conn| lifecycle::apply_importance_decay(conn, component, inactive_period, decay_rate, floor_threshold))
    }

    fn expire_lowest_importance(&self, component: &str, session_id: &str, keep: usize) -> StorageResult<u64> {
        self.with_writer(|conn| lifecycle::expire_lowest_importance(conn, component, session_id, keep))
    }

    fn delete_tombstoned(&self, status: MemoryStatus, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        self.with_writer(|conn| lifecycle::delete_tombstoned(conn, status, cutoff))
    }

    fn delete_orphaned_entities(&self) -> StorageResult<u64> {
        self.with_writer(graph::delete_orphaned_entities)
    }

    fn delete_orphaned_relationships(&self) -> StorageResult<u64> {
        self.with_writer(graph::delete_orphaned_relationships)
    }

    fn stats(&self) -> StorageResult<MemoryStats> {
        self.with_reader(lifecycle::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use souvenir_core::episode::EpisodeType;

    #[test]
    fn round_trips_a_memory_through_insert_and_get() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let memory = Memory::new("the rabbit's name is Hoppy", "component-a", "category-a", 0.6);
        MemoryRepository::insert(&engine, &memory).unwrap();

        let fetched = engine.get(&memory.id).unwrap().expect("memory should exist");
        assert_eq!(fetched.content, memory.content);
        assert_eq!(fetched.status, MemoryStatus::Active);
    }

    #[test]
    fn episode_batch_insert_then_fetch_unconsolidated() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let ep = Episode::new("session-1", EpisodeType::Observation, "saw a rabbit");
        EpisodeRepository::insert(&engine, &[ep.clone()]).unwrap();

        let fetched = engine.fetch_unconsolidated(chrono::Duration::zero()).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, ep.id);
    }

    #[test]
    fn search_fts_finds_inserted_content() {
        let engine = StorageEngine::open_in_memory().unwrap();
        let memory = Memory::new("the rabbit's name is Hoppy", "component-a", "category-a", 0.6);
        MemoryRepository::insert(&engine, &memory).unwrap();

        let hits = engine.search_fts("hoppy", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0.id, memory.id);
    }

    #[test]
    fn empty_episode_batch_is_a_no_op() {
        let engine = StorageEngine::open_in_memory().unwrap();
        EpisodeRepository::insert(&engine, &[]).unwrap();
        assert_eq!(engine.fetch_unconsolidated(chrono::Duration::zero()).unwrap().len(), 0);
    }
}
