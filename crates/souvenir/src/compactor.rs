//! Explicit maintenance pass: physically deletes tombstoned rows and
//! consolidated episodes past their retention window, optionally merges
//! near-duplicate memories, then sweeps orphaned graph rows.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use souvenir_core::config::CompactionConfig;
use souvenir_core::errors::StorageError;
use souvenir_core::memory::{Memory, MemoryStatus};
use souvenir_core::traits::{EpisodeRepository, MemoryRepository};

/// Every counter `compact` touched in one run.
#[derive(Debug, Clone, Default)]
pub struct CompactionReport {
    pub expired_deleted: u64,
    pub superseded_deleted: u64,
    pub decayed_deleted: u64,
    pub episodes_deleted: u64,
    pub duplicates_merged: u64,
    pub orphaned_relationships_deleted: u64,
    pub orphaned_entities_deleted: u64,
}

pub struct Compactor {
    episodes: Arc<dyn EpisodeRepository>,
    memories: Arc<dyn MemoryRepository>,
    dedupe_enabled: bool,
}

impl Compactor {
    pub fn new(episodes: Arc<dyn EpisodeRepository>, memories: Arc<dyn MemoryRepository>, dedupe_enabled: bool) -> Self {
        Self { episodes, memories, dedupe_enabled }
    }

    pub fn compact(&self, config: &CompactionConfig) -> Result<CompactionReport, StorageError> {
        let now = Utc::now();
        let mut report = CompactionReport::default();

        report.expired_deleted = self.memories.delete_tombstoned(MemoryStatus::Expired, now - chrono::Duration::days(config.expired_retention_days))?;
        report.superseded_deleted =
            self.memories.delete_tombstoned(MemoryStatus::Superseded, now - chrono::Duration::days(config.superseded_retention_days))?;
        report.decayed_deleted = self.memories.delete_tombstoned(MemoryStatus::Decayed, now - chrono::Duration::days(config.decayed_retention_days))?;
        report.episodes_deleted = self.episodes.delete_consolidated_before(now - chrono::Duration::days(config.episode_retention_days))?;

        if let Some(threshold) = config.deduplication_threshold {
            if self.dedupe_enabled {
                report.duplicates_merged = self.merge_near_duplicates(threshold)?;
            }
        }

        // Relationships first: an entity referenced only by a just-orphaned
        // relationship must be swept in the same pass, not the next one.
        report.orphaned_relationships_deleted = self.memories.delete_orphaned_relationships()?;
        report.orphaned_entities_deleted = self.memories.delete_orphaned_entities()?;

        tracing::info!(
            expired = report.expired_deleted,
            superseded = report.superseded_deleted,
            decayed = report.decayed_deleted,
            duplicates = report.duplicates_merged,
            "compaction run finished"
        );

        Ok(report)
    }

    /// Quadratic by design (per-component), not across the whole store — the
    /// component boundary is a real sharding key here, not just convenient.
    fn merge_near_duplicates(&self, threshold: f64) -> Result<u64, StorageError> {
        let rows = self.memories.find_recallable_with_embedding()?;
        let mut by_component: HashMap<String, Vec<Memory>> = HashMap::new();
        for memory in rows {
            by_component.entry(memory.component.clone()).or_default().push(memory);
        }

        let mut merged = 0;
        let mut superseded: HashSet<String> = HashSet::new();

        for group in by_component.into_values() {
            for i in 0..group.len() {
                if superseded.contains(&group[i].id) {
                    continue;
                }
                for j in (i + 1)..group.len() {
                    if superseded.contains(&group[j].id) {
                        continue;
                    }
                    let (Some(va), Some(vb)) = (&group[i].embedding, &group[j].embedding) else {
                        continue;
                    };
                    if cosine_similarity(va, vb) <= threshold {
                        continue;
                    }

                    let (winner, loser) = dedupe_pair_winner(&group[i], &group[j]);
                    self.memories.supersede(&loser.id, &winner.id)?;
                    superseded.insert(loser.id.clone());
                    merged += 1;

                    if loser.id == group[i].id {
                        // i itself just became a tombstone — stop comparing it.
                        break;
                    }
                }
            }
        }

        Ok(merged)
    }
}

/// Pins the near-duplicate tie-break: higher importance wins; if equal,
/// older `created_at` wins.
fn dedupe_pair_winner<'a>(a: &'a Memory, b: &'a Memory) -> (&'a Memory, &'a Memory) {
    if a.importance > b.importance {
        (a, b)
    } else if b.importance > a.importance {
        (b, a)
    } else if a.created_at <= b.created_at {
        (a, b)
    } else {
        (b, a)
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use souvenir_core::memory::Memory;

    fn memory_with(importance: f64, age_days: i64) -> Memory {
        let mut m = Memory::new("x", "durable", "fact", importance);
        m.created_at = Utc::now() - Duration::days(age_days);
        m
    }

    #[test]
    fn higher_importance_wins_tie_break() {
        let a = memory_with(0.9, 10);
        let b = memory_with(0.3, 1);
        let (winner, loser) = dedupe_pair_winner(&a, &b);
        assert_eq!(winner.id, a.id);
        assert_eq!(loser.id, b.id);
    }

    #[test]
    fn equal_importance_older_created_at_wins() {
        let older = memory_with(0.5, 30);
        let newer = memory_with(0.5, 1);
        let (winner, loser) = dedupe_pair_winner(&newer, &older);
        assert_eq!(winner.id, older.id);
        assert_eq!(loser.id, newer.id);
    }

    #[test]
    fn identical_vectors_have_similarity_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    }
}
