use serde::{Deserialize, Serialize};

use super::defaults;

/// Retention windows and the optional near-duplicate merge threshold for a
/// single `Compactor::compact` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompactionConfig {
    pub expired_retention_days: i64,
    pub superseded_retention_days: i64,
    pub decayed_retention_days: i64,
    pub episode_retention_days: i64,
    /// If set, near-duplicate merging runs (requires an `EmbeddingProvider`).
    pub deduplication_threshold: Option<f64>,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            expired_retention_days: defaults::DEFAULT_EXPIRED_RETENTION_DAYS,
            superseded_retention_days: defaults::DEFAULT_SUPERSEDED_RETENTION_DAYS,
            decayed_retention_days: defaults::DEFAULT_DECAYED_RETENTION_DAYS,
            episode_retention_days: defaults::DEFAULT_EPISODE_RETENTION_DAYS,
            deduplication_threshold: None,
        }
    }
}
