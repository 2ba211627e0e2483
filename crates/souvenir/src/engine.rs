//! `Engine` — the composition root. Binds the storage layer, the recall and
//! consolidation pipelines, the optional embedding provider, and the episode
//! buffer behind a single public, serialisation-friendly surface.

use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use souvenir_core::config::{CompactionConfig, SouvenirConfig};
use souvenir_core::episode::Episode;
use souvenir_core::errors::{SouvenirError, SouvenirResult};
use souvenir_core::traits::{EmbeddingProvider, EpisodeRepository, LanguageModel, MemoryRepository};
use souvenir_consolidation::{Component, ConsolidationPipeline, ConsolidationReport, DurableComponent, SessionOutcome, TaskComponent};
use souvenir_embeddings::EmbeddingOrchestrator;
use souvenir_recall::{RecallPipeline, ScoredRecall};
use souvenir_storage::StorageEngine;

use crate::buffer::EpisodeBuffer;
use crate::compactor::{CompactionReport, Compactor};

/// Memories pulled per post-consolidation backfill call, one call per
/// registered component.
const BACKFILL_LIMIT: usize = souvenir_embeddings::DEFAULT_BACKFILL_LIMIT;

/// Collaborators that only exist once `initialize()` has run, set together
/// behind one `OnceLock` so there's no window where storage is open but the
/// consolidation pipeline isn't (or vice versa).
struct Initialized {
    storage: Arc<StorageEngine>,
    consolidation: ConsolidationPipeline,
}

pub struct Engine {
    config: SouvenirConfig,
    state: OnceLock<Initialized>,
    buffer: Mutex<EpisodeBuffer>,
    /// Drained into the `ConsolidationPipeline` at `initialize()`; empty
    /// afterwards. Registered via `with_component` before the first
    /// `initialize()` call.
    components: Mutex<Vec<Box<dyn Component>>>,
    embedding: Option<Arc<dyn EmbeddingProvider>>,
}

impl Engine {
    pub fn new(config: SouvenirConfig) -> Self {
        Self {
            config,
            state: OnceLock::new(),
            buffer: Mutex::new(EpisodeBuffer::new()),
            components: Mutex::new(Vec::new()),
            embedding: None,
        }
    }

    /// Registers an additional consolidation component. Ignored once
    /// `initialize()` has already run.
    pub fn with_component(self, component: Box<dyn Component>) -> Self {
        self.components.lock().expect("components mutex poisoned").push(component);
        self
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding = Some(provider);
        self
    }

    fn state(&self) -> SouvenirResult<&Initialized> {
        self.state.get().ok_or(SouvenirError::Uninitialised)
    }

    /// Idempotent. Opens the backing store, runs its migrations, and wires
    /// the consolidation pipeline. Replays no state from the episode buffer.
    pub async fn initialize(&self) -> SouvenirResult<()> {
        if self.state.get().is_some() {
            return Ok(());
        }

        let storage = Arc::new(if self.config.engine.db_path == ":memory:" {
            StorageEngine::open_in_memory()?
        } else {
            StorageEngine::open(Path::new(&self.config.engine.db_path))?
        });

        let components = {
            let mut guard = self.components.lock().expect("components mutex poisoned");
            if guard.is_empty() {
                default_components(self.config.consolidation.settings.clone())
            } else {
                std::mem::take(&mut *guard)
            }
        };
        let min_age = chrono::Duration::seconds(self.config.consolidation.min_age_secs);
        let episodes_repo: Arc<dyn EpisodeRepository> = storage.clone();
        let memories_repo: Arc<dyn MemoryRepository> = storage.clone();
        let consolidation = ConsolidationPipeline::new(episodes_repo, memories_repo, components, min_age);

        // Another caller may have raced us to initialization; whoever loses
        // this `set` simply discards its own freshly-built state.
        let _ = self.state.set(Initialized { storage, consolidation });
        Ok(())
    }

    /// Pushes `episode` onto the buffer; flushes automatically once the
    /// buffer reaches `EngineConfig::flush_threshold`.
    pub async fn record(&self, episode: Episode) -> SouvenirResult<()> {
        self.state()?;
        let should_flush = {
            let mut buffer = self.buffer.lock().expect("buffer mutex poisoned");
            buffer.push(episode);
            buffer.size() >= self.config.engine.flush_threshold
        };
        if should_flush {
            self.flush().await?;
        }
        Ok(())
    }

    /// Drains the buffer into the episode store. A no-op if the buffer is
    /// empty.
    pub async fn flush(&self) -> SouvenirResult<()> {
        let state = self.state()?;
        let batch = self.buffer.lock().expect("buffer mutex poisoned").drain();
        if batch.is_empty() {
            return Ok(());
        }
        let count = batch.len();
        EpisodeRepository::insert(state.storage.as_ref(), &batch)?;
        tracing::debug!(count, "flushed episodes to the store");
        Ok(())
    }

    /// Flushes the buffer, then runs every registered component over every
    /// not-yet-consolidated session bucket, then backfills embeddings for
    /// any newly-created memory if a provider is configured.
    pub async fn consolidate(&self, llm: &dyn LanguageModel) -> SouvenirResult<(ConsolidationReport, Vec<SessionOutcome>)> {
        let state = self.state()?;
        self.flush().await?;

        let (report, outcomes) = state.consolidation.consolidate(llm).await?;

        if let Some(provider) = &self.embedding {
            let orchestrator = EmbeddingOrchestrator::new(provider.clone());
            for component in state.consolidation.component_names() {
                orchestrator.backfill(state.storage.as_ref(), component, BACKFILL_LIMIT).await?;
            }
        }

        Ok((report, outcomes))
    }

    /// `budget_tokens` defaults to `EngineConfig::default_budget_tokens`.
    pub async fn recall(&self, query: &str, budget_tokens: Option<u32>) -> SouvenirResult<Vec<ScoredRecall>> {
        let state = self.state()?;
        let budget = budget_tokens.unwrap_or(self.config.engine.default_budget_tokens);
        let pipeline = RecallPipeline::new(state.storage.as_ref(), self.embedding.as_deref(), self.config.recall.clone());
        let results = pipeline.recall(query, budget).await?;
        Ok(results)
    }

    pub async fn compact(&self, config: &CompactionConfig) -> SouvenirResult<CompactionReport> {
        let state = self.state()?;
        if config.deduplication_threshold.is_some() && self.embedding.is_none() {
            return Err(SouvenirError::Config {
                reason: "compaction requested deduplication but no embedding provider is configured".to_string(),
            });
        }

        let episodes: Arc<dyn EpisodeRepository> = state.storage.clone();
        let memories: Arc<dyn MemoryRepository> = state.storage.clone();
        let compactor = Compactor::new(episodes, memories, self.embedding.is_some());
        let report = compactor.compact(config)?;
        Ok(report)
    }

    /// Flushes the buffer and releases resources. The store's own connection
    /// pool is closed on drop; this just guarantees nothing buffered is lost.
    pub async fn close(&self) -> SouvenirResult<()> {
        self.flush().await
    }
}

/// Used when no component was registered via `with_component` — both
/// built-ins take the engine-wide `ConsolidationDefaults::settings` rather
/// than their own `Default`, since that's what `ConsolidationDefaults` is for.
fn default_components(settings: souvenir_core::config::ConsolidationSettings) -> Vec<Box<dyn Component>> {
    vec![Box::new(DurableComponent::new(settings.clone())), Box::new(TaskComponent::new(settings))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use souvenir_core::episode::EpisodeType;
    use souvenir_core::errors::ExtractionError;

    struct ScriptedLm {
        reply: &'static str,
    }

    #[async_trait]
    impl LanguageModel for ScriptedLm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ExtractionError> {
            Ok(self.reply.to_string())
        }
    }

    fn in_memory_config() -> SouvenirConfig {
        let mut config = SouvenirConfig::default();
        config.engine.db_path = ":memory:".to_string();
        config.engine.flush_threshold = 2;
        config.consolidation.min_age_secs = 0;
        config
    }

    #[tokio::test]
    async fn methods_fail_with_uninitialised_before_initialize() {
        let engine = Engine::new(in_memory_config());
        let err = engine.flush().await.unwrap_err();
        assert!(matches!(err, SouvenirError::Uninitialised));
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let engine = Engine::new(in_memory_config());
        engine.initialize().await.unwrap();
        engine.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn record_auto_flushes_at_threshold() {
        let engine = Engine::new(in_memory_config());
        engine.initialize().await.unwrap();

        engine.record(Episode::new("s1", EpisodeType::Observation, "a")).await.unwrap();
        assert_eq!(engine.buffer.lock().unwrap().size(), 1);
        engine.record(Episode::new("s1", EpisodeType::Observation, "b")).await.unwrap();
        // flush_threshold is 2, so the buffer should have drained itself.
        assert_eq!(engine.buffer.lock().unwrap().size(), 0);
    }

    #[tokio::test]
    async fn consolidate_extracts_and_marks_consolidated() {
        let engine = Engine::new(in_memory_config());
        engine.initialize().await.unwrap();
        engine.record(Episode::new("s1", EpisodeType::Conversation, "likes tea")).await.unwrap();
        engine.flush().await.unwrap();

        let llm = ScriptedLm {
            reply: r#"{"facts": [{"content": "likes tea", "entities": [], "importance": 0.6, "conflict": null}], "relationships": []}"#,
        };
        let (report, _) = engine.consolidate(&llm).await.unwrap();
        assert_eq!(report.created, 1);

        let results = engine.recall("tea", None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn recall_before_any_writes_is_empty() {
        let engine = Engine::new(in_memory_config());
        engine.initialize().await.unwrap();
        let results = engine.recall("nothing here", None).await.unwrap();
        assert!(results.is_empty());
    }
}
