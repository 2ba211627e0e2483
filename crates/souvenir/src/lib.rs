//! # souvenir
//!
//! Persistent memory engine for autonomous agents: raw episodes go in via
//! [`Engine::record`], an external language model turns them into durable,
//! deduplicated memories via [`Engine::consolidate`], and [`Engine::recall`]
//! answers a query with a token-budgeted, multi-signal-ranked list of them.

mod buffer;
mod compactor;
mod engine;

pub use buffer::EpisodeBuffer;
pub use compactor::{CompactionReport, Compactor};
pub use engine::Engine;

pub use souvenir_core::config::{CompactionConfig, EngineConfig, RecallConfig, SouvenirConfig};
pub use souvenir_core::entity::{Entity, Relationship};
pub use souvenir_core::episode::{Episode, EpisodeType};
pub use souvenir_core::errors::{EmbeddingError, ExtractionError, SouvenirError, SouvenirResult, StorageError};
pub use souvenir_core::memory::{Memory, MemoryPatch, MemoryStatus};
pub use souvenir_core::traits::{EmbeddingProvider, LanguageModel};
pub use souvenir_consolidation::{Component, ConflictHint, ConsolidationReport, DurableComponent, SessionOutcome, TaskComponent};
pub use souvenir_recall::ScoredRecall;
