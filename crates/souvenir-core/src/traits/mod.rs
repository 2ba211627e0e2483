//! Trait seams that every other crate programs against. `souvenir-storage`
//! implements [`storage::EpisodeRepository`] and [`storage::MemoryRepository`];
//! callers of the top-level engine implement [`embedding::EmbeddingProvider`]
//! and [`language_model::LanguageModel`].

pub mod embedding;
pub mod language_model;
pub mod storage;

pub use embedding::EmbeddingProvider;
pub use language_model::LanguageModel;
pub use storage::{EpisodeRepository, MemoryRepository, MemoryStats, ScoredMemory, SimilarFilter, StorageResult};
