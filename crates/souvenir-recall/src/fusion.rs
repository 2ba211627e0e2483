//! The weighted-linear-additive fusion formula plus temporal decay and
//! access-frequency boost.

use chrono::Utc;
use souvenir_core::config::RecallConfig;

use crate::Candidate;

/// A recalled memory with its final score and the per-signal breakdown that
/// produced it, so test suites can detect regressions in a single signal.
#[derive(Debug, Clone)]
pub struct ScoredRecall {
    pub id: String,
    pub content: String,
    pub component: String,
    pub category: String,
    pub score: f64,
    pub token_count: u32,
    pub fts_score: f64,
    pub vector_score: f64,
    pub entity_score: f64,
}

pub(crate) fn fuse(candidates: impl Iterator<Item = Candidate>, config: &RecallConfig) -> Vec<ScoredRecall> {
    let now = Utc::now();
    candidates
        .map(|c| {
            let raw = config.fts_weight * c.fts + config.vector_weight * c.vector + config.entity_weight * c.entity;
            let cw = config.component_weight(&c.memory.component);
            let age_days = (now - c.memory.updated_at).num_seconds().max(0) as f64 / 86_400.0;
            let decay = (-config.temporal_decay_lambda * age_days).exp();
            let aboost = 1.0 + 0.1 * (1.0 + c.memory.access_count as f64).ln();
            let score = raw * cw * c.memory.importance * decay * aboost;

            ScoredRecall {
                id: c.memory.id.clone(),
                content: c.memory.content.clone(),
                component: c.memory.component.clone(),
                category: c.memory.category.clone(),
                score,
                token_count: souvenir_tokens::count(&c.memory.content),
                fts_score: c.fts,
                vector_score: c.vector,
                entity_score: c.entity,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use souvenir_core::memory::Memory;

    fn candidate(content: &str, fts: f64, vector: f64, entity: f64, importance: f64) -> Candidate {
        Candidate { memory: Memory::new(content, "durable", "fact", importance), fts, vector, entity }
    }

    #[test]
    fn pure_lexical_match_scores_above_threshold_with_default_weights() {
        let config = RecallConfig::default();
        let scored = fuse(std::iter::once(candidate("hello", 1.0, 0.0, 0.0, 0.8)), &config);
        assert_eq!(scored.len(), 1);
        assert!(scored[0].score > config.relevance_threshold);
    }

    #[test]
    fn fresh_memory_decays_less_than_a_stale_one() {
        let config = RecallConfig::default();
        let mut stale = Memory::new("old", "durable", "fact", 0.5);
        stale.updated_at = Utc::now() - chrono::Duration::days(365);
        let fresh = Candidate { memory: Memory::new("new", "durable", "fact", 0.5), fts: 1.0, vector: 0.0, entity: 0.0 };
        let stale_candidate = Candidate { memory: stale, fts: 1.0, vector: 0.0, entity: 0.0 };

        let scored = fuse(vec![fresh, stale_candidate].into_iter(), &config);
        assert!(scored[0].score > scored[1].score);
    }

    #[test]
    fn zero_signal_candidate_scores_zero() {
        let config = RecallConfig::default();
        let scored = fuse(std::iter::once(candidate("nothing", 0.0, 0.0, 0.0, 0.9)), &config);
        assert_eq!(scored[0].score, 0.0);
    }
}
