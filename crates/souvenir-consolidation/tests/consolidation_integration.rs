use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use souvenir_core::episode::{Episode, EpisodeType};
use souvenir_core::errors::ExtractionError;
use souvenir_core::traits::{EpisodeRepository, LanguageModel, MemoryRepository};
use souvenir_consolidation::{ConsolidationPipeline, DurableComponent, SessionOutcome};
use souvenir_storage::StorageEngine;

struct ScriptedLm {
    replies: Vec<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedLm {
    fn new(replies: Vec<&'static str>) -> Self {
        Self { replies, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LanguageModel for ScriptedLm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ExtractionError> {
        let i = self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies.get(i).map(|s| s.to_string()).ok_or_else(|| ExtractionError::LmFailed { reason: "no scripted reply left".to_string() })
    }
}

#[tokio::test]
async fn extracts_a_fact_and_marks_episodes_consolidated() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let episodes = vec![Episode::new("s1", EpisodeType::Conversation, "the rabbit's name is Hoppy")];
    EpisodeRepository::insert(&storage, &episodes).unwrap();

    let llm = ScriptedLm::new(vec![r#"{"facts": [{"content": "the rabbit's name is Hoppy", "entities": [{"name": "Hoppy", "type": "pet"}], "importance": 0.7, "conflict": null}], "relationships": []}"#]);

    let components: Vec<Box<dyn souvenir_consolidation::Component>> = vec![Box::new(DurableComponent::default())];
    let pipeline = ConsolidationPipeline::new(storage.clone(), storage.clone(), components, chrono::Duration::zero());

    let (report, outcomes) = pipeline.consolidate(&llm).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.sessions_skipped, 0);
    assert!(matches!(outcomes.as_slice(), [SessionOutcome::Processed { .. }]));

    let remaining = storage.fetch_unconsolidated(chrono::Duration::zero()).unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn malformed_reply_skips_session_and_leaves_episode_unconsolidated() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let episodes = vec![Episode::new("s1", EpisodeType::Observation, "saw a rabbit")];
    EpisodeRepository::insert(&storage, &episodes).unwrap();

    let llm = ScriptedLm::new(vec!["not json at all"]);
    let components: Vec<Box<dyn souvenir_consolidation::Component>> = vec![Box::new(DurableComponent::default())];
    let pipeline = ConsolidationPipeline::new(storage.clone(), storage.clone(), components, chrono::Duration::zero());

    let (report, outcomes) = pipeline.consolidate(&llm).await.unwrap();
    assert_eq!(report.sessions_skipped, 1);
    assert_eq!(report.created, 0);
    assert!(matches!(outcomes.as_slice(), [SessionOutcome::Skipped { .. }]));

    let remaining = storage.fetch_unconsolidated(chrono::Duration::zero()).unwrap();
    assert_eq!(remaining.len(), 1);
}

#[tokio::test]
async fn duplicate_hint_below_importance_is_skipped_not_recreated() {
    let storage = Arc::new(StorageEngine::open_in_memory().unwrap());
    let episodes = vec![Episode::new("s1", EpisodeType::Conversation, "likes tea")];
    EpisodeRepository::insert(&storage, &episodes).unwrap();

    let existing = souvenir_core::memory::Memory::new("likes tea", "durable", "fact", 0.9);
    MemoryRepository::insert(&storage, &existing).unwrap();

    let llm = ScriptedLm::new(vec![r#"{"facts": [{"content": "likes tea", "entities": [], "importance": 0.3, "conflict": "duplicate"}], "relationships": []}"#]);
    let components: Vec<Box<dyn souvenir_consolidation::Component>> = vec![Box::new(DurableComponent::default())];
    let pipeline = ConsolidationPipeline::new(storage.clone(), storage.clone(), components, chrono::Duration::zero());

    let (report, _) = pipeline.consolidate(&llm).await.unwrap();
    assert_eq!(report.created, 0);
    assert_eq!(report.merged, 0);
}
