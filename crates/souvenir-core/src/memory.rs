use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::new_id;

/// Lifecycle state of a memory. Monotonic: `Active` is the only state a
/// memory is ever created in, and the three tombstone states never revert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoryStatus {
    Active,
    Superseded,
    Expired,
    Decayed,
}

impl MemoryStatus {
    /// Tombstone states are retained for compaction's retention window but
    /// excluded from every search/recall path.
    pub fn is_tombstone(self) -> bool {
        !matches!(self, MemoryStatus::Active)
    }
}

/// The canonical stored artefact produced by consolidation and consumed by
/// recall. Every component writes into this same table, tagged by
/// `component`; the store itself is component-agnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub content: String,
    /// Owning component tag: `task`, `durable`, `environmental`, ...
    pub component: String,
    /// Component-specific sub-tag, e.g. `fact`, `goal`, `decision`.
    pub category: String,
    pub importance: f64,
    /// Present for session-scoped components.
    pub session_id: Option<String>,
    pub source_episode_ids: Vec<String>,
    pub entity_ids: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub access_count: u64,
    pub status: MemoryStatus,
    /// Only meaningful when `status == Superseded`.
    pub superseded_by: Option<String>,
    pub valid_at: Option<DateTime<Utc>>,
    pub invalid_at: Option<DateTime<Utc>>,
}

impl Memory {
    /// Construct a fresh, active memory with `created_at == updated_at == now`.
    pub fn new(content: impl Into<String>, component: impl Into<String>, category: impl Into<String>, importance: f64) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            content: content.into(),
            component: component.into(),
            category: category.into(),
            importance: importance.clamp(0.0, 1.0),
            session_id: None,
            source_episode_ids: Vec::new(),
            entity_ids: Vec::new(),
            embedding: None,
            created_at: now,
            updated_at: now,
            last_accessed: None,
            access_count: 0,
            status: MemoryStatus::Active,
            superseded_by: None,
            valid_at: None,
            invalid_at: None,
        }
    }

    /// `validAt ≤ now (or null) AND invalidAt > now (or null)`.
    pub fn is_temporally_valid_at(&self, now: DateTime<Utc>) -> bool {
        let after_valid_at = self.valid_at.map(|v| v <= now).unwrap_or(true);
        let before_invalid_at = self.invalid_at.map(|v| v > now).unwrap_or(true);
        after_valid_at && before_invalid_at
    }

    /// `status == active AND temporally valid`.
    pub fn is_recallable_at(&self, now: DateTime<Utc>) -> bool {
        self.status == MemoryStatus::Active && self.is_temporally_valid_at(now)
    }

    pub fn is_recallable(&self) -> bool {
        self.is_recallable_at(Utc::now())
    }
}

/// Partial update applied by `MemoryRepository::update`. Every field is
/// optional; only the fields set here are written, and `updated_at` is
/// always bumped regardless of which fields changed.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    pub content: Option<String>,
    pub importance: Option<f64>,
    pub entity_ids: Option<Vec<String>>,
    pub source_episode_ids: Option<Vec<String>>,
    pub embedding: Option<Vec<f32>>,
    pub status: Option<MemoryStatus>,
    pub superseded_by: Option<String>,
    pub invalid_at: Option<DateTime<Utc>>,
}

impl MemoryPatch {
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = Some(importance.clamp(0.0, 1.0));
        self
    }

    pub fn entity_ids(mut self, entity_ids: Vec<String>) -> Self {
        self.entity_ids = Some(entity_ids);
        self
    }

    pub fn source_episode_ids(mut self, ids: Vec<String>) -> Self {
        self.source_episode_ids = Some(ids);
        self
    }

    pub fn embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn status(mut self, status: MemoryStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn superseded_by(mut self, id: impl Into<String>) -> Self {
        self.superseded_by = Some(id.into());
        self
    }

    pub fn invalid_at(mut self, at: DateTime<Utc>) -> Self {
        self.invalid_at = Some(at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn temporal_validity_with_no_bounds_is_always_valid() {
        let m = Memory::new("x", "durable", "fact", 0.5);
        assert!(m.is_temporally_valid_at(Utc::now()));
    }

    #[test]
    fn temporal_validity_respects_valid_at_and_invalid_at() {
        let mut m = Memory::new("x", "durable", "fact", 0.5);
        let now = Utc::now();
        m.valid_at = Some(now + Duration::days(1));
        assert!(!m.is_temporally_valid_at(now));
        m.valid_at = None;
        m.invalid_at = Some(now - Duration::days(1));
        assert!(!m.is_temporally_valid_at(now));
    }

    #[test]
    fn recallable_requires_active_status_and_validity() {
        let mut m = Memory::new("x", "durable", "fact", 0.5);
        assert!(m.is_recallable());
        m.status = MemoryStatus::Superseded;
        assert!(!m.is_recallable());
    }
}
