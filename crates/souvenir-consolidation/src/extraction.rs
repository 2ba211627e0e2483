//! Entity resolution and the conflict policy applied to every extracted fact.

use souvenir_core::entity::Entity;
use souvenir_core::errors::StorageError;
use souvenir_core::memory::{Memory, MemoryPatch};
use souvenir_core::traits::{MemoryRepository, SimilarFilter};

use crate::component::{ConflictHint, ExtractedFact};

const DEFAULT_ENTITY_TYPE: &str = "concept";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactOutcome {
    Created,
    Merged,
    Skipped,
}

/// Case-insensitive exact-name resolution, reusing `upsert_entity`'s own
/// case-insensitive match-or-insert so a fact's entity list never produces
/// two rows for the same name spelled differently in case.
pub fn resolve_entities(memories: &dyn MemoryRepository, refs: &[crate::component::ExtractedEntityRef]) -> Result<Vec<String>, StorageError> {
    let mut ids = Vec::with_capacity(refs.len());
    for r in refs {
        let entity_type = if r.entity_type.is_empty() { DEFAULT_ENTITY_TYPE } else { &r.entity_type };
        let entity = memories.upsert_entity(&Entity::new(r.name.clone(), entity_type))?;
        ids.push(entity.id);
    }
    Ok(ids)
}

/// Whitespace-token Jaccard overlap, used only to compare an unhinted
/// `findSimilar` match against `mergeThreshold` — the store's lexical index
/// doesn't expose a similarity score to its callers, so this pipeline
/// derives its own from the two content strings.
fn content_similarity(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;
    let ta: HashSet<&str> = a.split_whitespace().collect();
    let tb: HashSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Applies the conflict policy for one extracted fact against the store.
/// Returns the resulting outcome plus the resolved entity ids (so the
/// caller can union them into later bookkeeping if needed).
pub fn apply_conflict_policy(
    memories: &dyn MemoryRepository,
    component: &str,
    session_id: Option<&str>,
    merge_threshold: f64,
    fact: &ExtractedFact,
    entity_ids: Vec<String>,
    source_episode_ids: Vec<String>,
) -> Result<FactOutcome, StorageError> {
    let filter = SimilarFilter { category: Some(fact.category.clone()), session_id: session_id.map(|s| s.to_string()), limit: 1 };
    let existing = memories.find_similar(&fact.content, component, &filter)?.into_iter().next();

    match (fact.conflict, existing) {
        (Some(ConflictHint::Duplicate), Some(existing)) => {
            if existing.importance >= fact.importance {
                Ok(FactOutcome::Skipped)
            } else {
                merge_into(memories, &existing, fact, entity_ids, source_episode_ids)?;
                Ok(FactOutcome::Merged)
            }
        }
        (Some(ConflictHint::Contradiction), existing_opt) => {
            let new_memory = insert_new(memories, component, session_id, fact, entity_ids, source_episode_ids)?;
            if let Some(existing) = existing_opt {
                memories.supersede(&existing.id, &new_memory.id)?;
            }
            Ok(FactOutcome::Created)
        }
        (Some(ConflictHint::Update), Some(existing)) => {
            merge_into(memories, &existing, fact, entity_ids, source_episode_ids)?;
            Ok(FactOutcome::Merged)
        }
        (None, Some(existing)) if content_similarity(&fact.content, &existing.content) >= merge_threshold => {
            merge_into(memories, &existing, fact, entity_ids, source_episode_ids)?;
            Ok(FactOutcome::Merged)
        }
        _ => {
            insert_new(memories, component, session_id, fact, entity_ids, source_episode_ids)?;
            Ok(FactOutcome::Created)
        }
    }
}

fn insert_new(
    memories: &dyn MemoryRepository,
    component: &str,
    session_id: Option<&str>,
    fact: &ExtractedFact,
    entity_ids: Vec<String>,
    source_episode_ids: Vec<String>,
) -> Result<Memory, StorageError> {
    let mut memory = Memory::new(fact.content.clone(), component, fact.category.clone(), fact.importance);
    memory.session_id = session_id.map(|s| s.to_string());
    memory.entity_ids = entity_ids;
    memory.source_episode_ids = source_episode_ids;
    memories.insert(&memory)?;
    Ok(memory)
}

fn merge_into(
    memories: &dyn MemoryRepository,
    existing: &Memory,
    fact: &ExtractedFact,
    entity_ids: Vec<String>,
    source_episode_ids: Vec<String>,
) -> Result<(), StorageError> {
    let union_entities = union_dedup(&existing.entity_ids, &entity_ids);
    let union_sources = union_dedup(&existing.source_episode_ids, &source_episode_ids);
    let patch = MemoryPatch::default()
        .content(fact.content.clone())
        .importance(existing.importance.max(fact.importance))
        .entity_ids(union_entities)
        .source_episode_ids(union_sources);
    memories.update(&existing.id, &patch)
}

fn union_dedup(a: &[String], b: &[String]) -> Vec<String> {
    let mut out = a.to_vec();
    for item in b {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::content_similarity;

    #[test]
    fn identical_content_has_similarity_one() {
        assert_eq!(content_similarity("the rabbit is named Hoppy", "the rabbit is named Hoppy"), 1.0);
    }

    #[test]
    fn disjoint_content_has_similarity_zero() {
        assert_eq!(content_similarity("aaa bbb", "ccc ddd"), 0.0);
    }
}
