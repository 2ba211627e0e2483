//! Multi-signal recall: lexical (BM25), vector (cosine), and graph
//! (entity/relationship) candidates fused by a weighted-linear-additive
//! formula — deliberately not Reciprocal Rank Fusion.

mod fusion;

use std::collections::HashMap;

use souvenir_core::config::RecallConfig;
use souvenir_core::errors::StorageError;
use souvenir_core::memory::Memory;
use souvenir_core::traits::{EmbeddingProvider, MemoryRepository};

pub use fusion::ScoredRecall;

const LEXICAL_CANDIDATE_LIMIT: usize = 50;

pub(crate) struct Candidate {
    pub(crate) memory: Memory,
    pub(crate) fts: f64,
    pub(crate) vector: f64,
    pub(crate) entity: f64,
}

pub struct RecallPipeline<'a> {
    memories: &'a dyn MemoryRepository,
    embeddings: Option<&'a dyn EmbeddingProvider>,
    config: RecallConfig,
}

impl<'a> RecallPipeline<'a> {
    pub fn new(memories: &'a dyn MemoryRepository, embeddings: Option<&'a dyn EmbeddingProvider>, config: RecallConfig) -> Self {
        Self { memories, embeddings, config }
    }

    pub async fn recall(&self, query: &str, budget_tokens: u32) -> Result<Vec<ScoredRecall>, StorageError> {
        let mut candidates: HashMap<String, Candidate> = HashMap::new();

        self.gather_lexical(query, &mut candidates)?;
        self.gather_vector(query, &mut candidates).await?;
        self.gather_graph(query, &mut candidates)?;

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored = fusion::fuse(candidates.into_values(), &self.config);
        scored.retain(|c| c.score >= self.config.relevance_threshold);
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

        let deduped = dedup_by_content(scored);
        let capped: Vec<ScoredRecall> = deduped.into_iter().take(self.config.top_k).collect();
        let trimmed = trim_to_budget(capped, budget_tokens);

        if !trimmed.is_empty() {
            let ids: Vec<String> = trimmed.iter().map(|r| r.id.clone()).collect();
            self.memories.update_access_stats(&ids)?;
        }

        Ok(trimmed)
    }

    fn gather_lexical(&self, query: &str, candidates: &mut HashMap<String, Candidate>) -> Result<(), StorageError> {
        let hits = self.memories.search_fts(query, LEXICAL_CANDIDATE_LIMIT)?;
        let max_bm25 = hits.iter().map(|(_, score)| *score).fold(0.0_f64, f64::max).max(f64::EPSILON);

        for (memory, score) in hits {
            let normalized = score / max_bm25;
            candidates
                .entry(memory.id.clone())
                .and_modify(|c| c.fts = c.fts.max(normalized))
                .or_insert(Candidate { memory, fts: normalized, vector: 0.0, entity: 0.0 });
        }
        Ok(())
    }

    async fn gather_vector(&self, query: &str, candidates: &mut HashMap<String, Candidate>) -> Result<(), StorageError> {
        let Some(provider) = self.embeddings else {
            return Ok(());
        };

        let query_vec = match provider.embed(query).await {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "query embedding failed, skipping vector signal");
                return Ok(());
            }
        };

        let rows = self.memories.find_recallable_with_embedding()?;
        for memory in rows {
            let Some(embedding) = &memory.embedding else { continue };
            let similarity = cosine_similarity(&query_vec, embedding);
            if similarity <= 0.0 {
                continue;
            }
            candidates
                .entry(memory.id.clone())
                .and_modify(|c| c.vector = c.vector.max(similarity))
                .or_insert(Candidate { memory, fts: 0.0, vector: similarity, entity: 0.0 });
        }
        Ok(())
    }

    fn gather_graph(&self, query: &str, candidates: &mut HashMap<String, Candidate>) -> Result<(), StorageError> {
        let matched = self.memories.find_entities_by_name(query)?;
        if matched.is_empty() {
            return Ok(());
        }

        let mut confidences: HashMap<String, f64> = HashMap::new();
        for entity in &matched {
            confidences.insert(entity.id.clone(), 1.0);
        }

        for entity in &matched {
            let relationships = self.memories.find_relationships_for_entity(&entity.id)?;
            for rel in relationships {
                let connected = if rel.from_entity_id == entity.id { &rel.to_entity_id } else { &rel.from_entity_id };
                confidences
                    .entry(connected.clone())
                    .and_modify(|c| *c = c.max(rel.confidence))
                    .or_insert(rel.confidence);
            }
        }

        let ids: Vec<String> = confidences.keys().cloned().collect();
        let memories = self.memories.find_memories_by_entity_ids(&ids)?;

        for memory in memories {
            let entity_score = memory
                .entity_ids
                .iter()
                .filter_map(|id| confidences.get(id))
                .copied()
                .fold(0.0_f64, f64::max);
            if entity_score <= 0.0 {
                continue;
            }
            candidates
                .entry(memory.id.clone())
                .and_modify(|c| c.entity = c.entity.max(entity_score))
                .or_insert(Candidate { memory, fts: 0.0, vector: 0.0, entity: entity_score });
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Keeps the first occurrence of each exact-match content string; the input
/// is already descending by score, so "first" means "highest-scored".
fn dedup_by_content(ranked: Vec<ScoredRecall>) -> Vec<ScoredRecall> {
    let mut seen = std::collections::HashSet::new();
    ranked.into_iter().filter(|r| seen.insert(r.content.clone())).collect()
}

/// Sums `tokenizer.count` while under `budget_tokens`. The first item is
/// always included even if it alone exceeds the budget — recall must never
/// return empty when candidates exist.
fn trim_to_budget(ranked: Vec<ScoredRecall>, budget_tokens: u32) -> Vec<ScoredRecall> {
    let mut out = Vec::new();
    let mut total: u32 = 0;
    for item in ranked {
        if out.is_empty() {
            total = item.token_count;
            out.push(item);
            continue;
        }
        if total + item.token_count > budget_tokens {
            break;
        }
        total += item.token_count;
        out.push(item);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_only() {
        let make = |id: &str, content: &str, score: f64| ScoredRecall {
            id: id.to_string(),
            content: content.to_string(),
            component: "durable".to_string(),
            category: "fact".to_string(),
            score,
            token_count: 1,
            fts_score: 0.0,
            vector_score: 0.0,
            entity_score: 0.0,
        };
        let ranked = vec![make("a", "same", 0.9), make("b", "same", 0.5), make("c", "other", 0.4)];
        let deduped = dedup_by_content(ranked);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].id, "a");
        assert_eq!(deduped[1].id, "c");
    }

    #[test]
    fn budget_trim_always_includes_first_item() {
        let make = |id: &str, tokens: u32| ScoredRecall {
            id: id.to_string(),
            content: id.to_string(),
            component: "durable".to_string(),
            category: "fact".to_string(),
            score: 1.0,
            token_count: tokens,
            fts_score: 0.0,
            vector_score: 0.0,
            entity_score: 0.0,
        };
        let ranked = vec![make("a", 9999), make("b", 1)];
        let trimmed = trim_to_budget(ranked, 10);
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].id, "a");
    }

    #[test]
    fn budget_trim_fills_up_to_limit() {
        let make = |id: &str, tokens: u32| ScoredRecall {
            id: id.to_string(),
            content: id.to_string(),
            component: "durable".to_string(),
            category: "fact".to_string(),
            score: 1.0,
            token_count: tokens,
            fts_score: 0.0,
            vector_score: 0.0,
            entity_score: 0.0,
        };
        let ranked = vec![make("a", 5), make("b", 4), make("c", 4)];
        let trimmed = trim_to_budget(ranked, 10);
        assert_eq!(trimmed.iter().map(|r| r.id.clone()).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
