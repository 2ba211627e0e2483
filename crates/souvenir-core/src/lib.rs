//! # souvenir-core
//!
//! Foundation crate for the Souvenir memory engine.
//! Defines the episode/memory/entity data model, the storage and
//! collaborator traits every other crate programs against, the error
//! taxonomy, and the per-subsystem configuration structs.

pub mod config;
pub mod constants;
pub mod entity;
pub mod episode;
pub mod errors;
pub mod ids;
pub mod memory;
pub mod traits;

pub use config::SouvenirConfig;
pub use entity::{Entity, Relationship};
pub use episode::{Episode, EpisodeType};
pub use errors::{SouvenirError, SouvenirResult};
pub use memory::{Memory, MemoryPatch, MemoryStatus};
pub use traits::{EmbeddingProvider, EpisodeRepository, LanguageModel, MemoryRepository};
