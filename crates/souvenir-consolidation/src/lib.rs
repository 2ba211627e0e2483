//! Turns raw episodes into durable, deduplicated memories.
//!
//! A `ConsolidationPipeline` is handed an `EpisodeRepository`, a
//! `MemoryRepository`, and a registry of `Component`s; `consolidate` drives
//! every registered component over every not-yet-consolidated session bucket,
//! applies the shared conflict policy, and marks the episodes that fully
//! succeeded as consolidated.

pub mod component;
pub mod components;
mod extraction;
mod json;
mod transcript;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use souvenir_core::entity::Relationship;
use souvenir_core::episode::Episode;
use souvenir_core::errors::{ExtractionError, StorageError};
use souvenir_core::traits::{EpisodeRepository, LanguageModel, MemoryRepository};

pub use component::{Component, ConflictHint, ExtractedBatch, ExtractedEntityRef, ExtractedFact, ExtractedRelationship};
pub use components::{DurableComponent, TaskComponent};
use extraction::FactOutcome;

/// Per-session counts for one component's successful run.
#[derive(Debug, Clone, Default)]
pub struct SessionCounts {
    pub created: u64,
    pub merged: u64,
    pub entities_upserted: u64,
    pub relationships_upserted: u64,
}

/// What happened when one component processed one session bucket.
///
/// Modeled as a sum type rather than an exception so a failed session never
/// aborts the run — it is simply recorded and retried next time.
#[derive(Debug)]
pub enum SessionOutcome {
    Processed { component: String, session_id: String, counts: SessionCounts },
    Skipped { component: String, session_id: String, cause: ExtractionError },
}

#[derive(Debug, Clone, Default)]
pub struct ConsolidationReport {
    pub created: u64,
    pub merged: u64,
    pub entities_upserted: u64,
    pub relationships_upserted: u64,
    pub decayed: u64,
    pub episodes_consumed: u64,
    pub sessions_skipped: u64,
}

pub struct ConsolidationPipeline {
    episodes: Arc<dyn EpisodeRepository>,
    memories: Arc<dyn MemoryRepository>,
    components: Vec<Box<dyn Component>>,
    min_age: chrono::Duration,
    /// Per-component last-seen session id, carried across `consolidate` calls
    /// so a session-scoped component's `expireSession` fires on the first
    /// bucket of whatever session follows the one it was last handed.
    last_session: Mutex<HashMap<String, String>>,
    is_running: AtomicBool,
}

impl ConsolidationPipeline {
    /// Takes its collaborators as `Arc`s (rather than borrows) so a caller can
    /// hold the pipeline itself as a long-lived field — the `last_session`
    /// and `is_running` state only means anything if it survives across
    /// `consolidate` calls.
    pub fn new(
        episodes: Arc<dyn EpisodeRepository>,
        memories: Arc<dyn MemoryRepository>,
        components: Vec<Box<dyn Component>>,
        min_age: chrono::Duration,
    ) -> Self {
        Self { episodes, memories, components, min_age, last_session: Mutex::new(HashMap::new()), is_running: AtomicBool::new(false) }
    }

    /// Names of every registered component, in registration order — used by
    /// the caller to drive per-component post-consolidation work (embedding
    /// backfill) without duplicating the registry.
    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    pub async fn consolidate(&self, llm: &dyn LanguageModel) -> Result<(ConsolidationReport, Vec<SessionOutcome>), StorageError> {
        if self.is_running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(StorageError::Busy { reason: "consolidation already in progress".to_string() });
        }
        let result = self.run(llm).await;
        self.is_running.store(false, Ordering::SeqCst);
        result
    }

    async fn run(&self, llm: &dyn LanguageModel) -> Result<(ConsolidationReport, Vec<SessionOutcome>), StorageError> {
        let episodes = self.episodes.fetch_unconsolidated(self.min_age)?;
        if episodes.is_empty() {
            tracing::debug!("no unconsolidated episodes, nothing to do");
            return Ok((ConsolidationReport::default(), Vec::new()));
        }

        let buckets = bucket_by_session(&episodes);
        tracing::info!(episodes = episodes.len(), sessions = buckets.len(), components = self.components.len(), "starting consolidation run");
        let mut report = ConsolidationReport { episodes_consumed: episodes.len() as u64, ..Default::default() };
        let mut outcomes = Vec::new();
        let mut failed_sessions: HashSet<String> = HashSet::new();

        for component in &self.components {
            let settings = component.settings();

            for (session_id, bucket) in &buckets {
                if component.session_scoped() {
                    let mut last = self.last_session.lock().expect("last_session mutex poisoned");
                    if let Some(previous) = last.get(component.name()) {
                        if previous != session_id {
                            let expired = self.memories.expire_session(previous, component.name())?;
                            report.decayed += expired;
                        }
                    }
                    last.insert(component.name().to_string(), session_id.clone());
                }

                match self.extract_session(component.as_ref(), bucket, llm).await {
                    Ok(batch) => {
                        let source_episode_ids: Vec<String> = bucket.iter().map(|e| e.id.clone()).collect();
                        let counts = self.apply_batch(component.as_ref(), session_id, settings.merge_threshold, &batch, source_episode_ids)?;
                        report.created += counts.created;
                        report.merged += counts.merged;
                        report.entities_upserted += counts.entities_upserted;
                        report.relationships_upserted += counts.relationships_upserted;
                        outcomes.push(SessionOutcome::Processed {
                            component: component.name().to_string(),
                            session_id: session_id.clone(),
                            counts,
                        });
                    }
                    Err(cause) => {
                        tracing::warn!(component = component.name(), session_id = %session_id, error = %cause, "session skipped, episodes left unconsolidated");
                        report.sessions_skipped += 1;
                        failed_sessions.insert(session_id.clone());
                        outcomes.push(SessionOutcome::Skipped { component: component.name().to_string(), session_id: session_id.clone(), cause });
                    }
                }

                if let Some(max_items) = settings.max_items_per_session {
                    let active = self.memories.active_item_count(component.name(), Some(session_id.as_str()))?;
                    if active as usize > max_items {
                        let removed = self.memories.expire_lowest_importance(component.name(), session_id, max_items)?;
                        report.decayed += removed;
                    }
                }
            }

            let decayed = self.memories.apply_importance_decay(
                component.name(),
                chrono::Duration::days(settings.decay_inactive_period_days),
                settings.decay_rate,
                settings.floor_threshold,
            )?;
            report.decayed += decayed;
        }

        let consolidated_ids: Vec<String> =
            episodes.iter().filter(|ep| !failed_sessions.contains(&ep.session_id)).map(|ep| ep.id.clone()).collect();
        if !consolidated_ids.is_empty() {
            self.episodes.mark_consolidated(&consolidated_ids)?;
        }
        tracing::info!(created = report.created, merged = report.merged, sessions_skipped = report.sessions_skipped, "consolidation run finished");

        Ok((report, outcomes))
    }

    /// LM round trip plus parsing. Every failure here is a recoverable
    /// `ExtractionError` — the session is skipped, not the whole run.
    async fn extract_session(&self, component: &dyn Component, bucket: &[Episode], llm: &dyn LanguageModel) -> Result<ExtractedBatch, ExtractionError> {
        let transcript = transcript::build(bucket);
        let reply = llm.complete(component.system_prompt(), &transcript).await?;
        let value = json::parse_object(&reply)?;
        component.parse_reply(&value)
    }

    /// Writes an already-parsed batch into the store. Storage errors here are
    /// not recoverable locally; they propagate out of `consolidate` as-is.
    fn apply_batch(
        &self,
        component: &dyn Component,
        session_id: &str,
        merge_threshold: f64,
        batch: &ExtractedBatch,
        source_episode_ids: Vec<String>,
    ) -> Result<SessionCounts, StorageError> {
        let mut counts = SessionCounts::default();
        // Only a session-scoped component's memories carry a session_id; for
        // anything else, scoping the `findSimilar` filter to the current
        // session would never match a memory written in a prior session.
        let merge_session_id = if component.session_scoped() { Some(session_id) } else { None };

        for fact in &batch.facts {
            let entity_ids = extraction::resolve_entities(&self.memories, &fact.entities)?;
            counts.entities_upserted += entity_ids.len() as u64;

            let outcome = extraction::apply_conflict_policy(
                &self.memories,
                component.name(),
                merge_session_id,
                merge_threshold,
                fact,
                entity_ids,
                source_episode_ids.clone(),
            )?;

            match outcome {
                FactOutcome::Created => counts.created += 1,
                FactOutcome::Merged => counts.merged += 1,
                FactOutcome::Skipped => {}
            }
        }

        for rel in &batch.relationships {
            let from_ids =
                extraction::resolve_entities(&self.memories, &[ExtractedEntityRef { name: rel.from.clone(), entity_type: "concept".to_string() }])?;
            let to_ids =
                extraction::resolve_entities(&self.memories, &[ExtractedEntityRef { name: rel.to.clone(), entity_type: "concept".to_string() }])?;
            counts.entities_upserted += 2;

            if let (Some(from_id), Some(to_id)) = (from_ids.first(), to_ids.first()) {
                let mut relationship = Relationship::new(from_id.clone(), to_id.clone(), rel.relation.clone());
                relationship.confidence = rel.confidence;
                self.memories.upsert_relationship(&relationship)?;
                counts.relationships_upserted += 1;
            }
        }

        Ok(counts)
    }
}

/// Groups episodes by session id, preserving the timestamp-ascending order
/// `fetchUnconsolidated` returns them in and the order each session first
/// appears.
fn bucket_by_session(episodes: &[Episode]) -> Vec<(String, Vec<Episode>)> {
    let mut order = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for ep in episodes {
        let idx = *index.entry(ep.session_id.clone()).or_insert_with(|| {
            order.push((ep.session_id.clone(), Vec::new()));
            order.len() - 1
        });
        order[idx].1.push(ep.clone());
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use souvenir_core::episode::EpisodeType;

    #[test]
    fn buckets_preserve_first_seen_order_and_group_by_session() {
        let episodes = vec![
            Episode::new("s1", EpisodeType::Observation, "a"),
            Episode::new("s2", EpisodeType::Observation, "b"),
            Episode::new("s1", EpisodeType::Observation, "c"),
        ];
        let buckets = bucket_by_session(&episodes);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].0, "s1");
        assert_eq!(buckets[0].1.len(), 2);
        assert_eq!(buckets[1].0, "s2");
        assert_eq!(buckets[1].1.len(), 1);
    }
}
