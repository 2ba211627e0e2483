use async_trait::async_trait;
use souvenir_core::config::RecallConfig;
use souvenir_core::entity::{Entity, Relationship};
use souvenir_core::errors::EmbeddingError;
use souvenir_core::memory::Memory;
use souvenir_core::traits::{EmbeddingProvider, MemoryRepository};
use souvenir_recall::RecallPipeline;
use souvenir_storage::StorageEngine;

struct FixedProvider;

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![1.0, 0.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        3
    }
}

#[tokio::test]
async fn lexical_signal_surfaces_a_matching_memory() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let memory = Memory::new("the rabbit's name is Hoppy", "durable", "fact", 0.8);
    engine.insert(&memory).unwrap();

    let pipeline = RecallPipeline::new(&engine, None, RecallConfig::default());
    let results = pipeline.recall("hoppy", 2000).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, memory.id);
    assert!(results[0].fts_score > 0.0);
    assert_eq!(results[0].vector_score, 0.0);
    assert_eq!(results[0].entity_score, 0.0);
}

#[tokio::test]
async fn no_signal_match_returns_empty_not_everything() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let memory = Memory::new("totally unrelated content", "durable", "fact", 0.8);
    engine.insert(&memory).unwrap();

    let pipeline = RecallPipeline::new(&engine, None, RecallConfig::default());
    let results = pipeline.recall("xyzzyquux", 2000).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn vector_signal_surfaces_an_embedded_memory_with_no_lexical_overlap() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let mut memory = Memory::new("zzz no lexical overlap zzz", "durable", "fact", 0.8);
    memory.embedding = Some(vec![1.0, 0.0, 0.0]);
    engine.insert(&memory).unwrap();

    let provider = FixedProvider;
    let pipeline = RecallPipeline::new(&engine, Some(&provider), RecallConfig::default());
    let results = pipeline.recall("unrelated query text", 2000).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].vector_score > 0.0);
}

#[tokio::test]
async fn graph_signal_surfaces_memories_linked_through_an_entity() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let entity = engine.upsert_entity(&Entity::new("Hoppy", "pet")).unwrap();
    let other = engine.upsert_entity(&Entity::new("Garden", "place")).unwrap();
    engine
        .upsert_relationship(&Relationship::new(entity.id.clone(), other.id.clone(), "lives_in"))
        .unwrap();

    let mut memory = Memory::new("some memory about the garden", "durable", "fact", 0.7);
    memory.entity_ids = vec![other.id.clone()];
    engine.insert(&memory).unwrap();

    let pipeline = RecallPipeline::new(&engine, None, RecallConfig::default());
    let results = pipeline.recall("Hoppy", 2000).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, memory.id);
    assert!(results[0].entity_score > 0.0);
}

#[tokio::test]
async fn access_stats_bump_only_after_list_is_finalised() {
    let engine = StorageEngine::open_in_memory().unwrap();
    let memory = Memory::new("the rabbit's name is Hoppy", "durable", "fact", 0.8);
    engine.insert(&memory).unwrap();

    let pipeline = RecallPipeline::new(&engine, None, RecallConfig::default());
    pipeline.recall("hoppy", 2000).await.unwrap();

    let reloaded = engine.get(&memory.id).unwrap().unwrap();
    assert_eq!(reloaded.access_count, 1);
}
