use serde::{Deserialize, Serialize};

use super::defaults;

/// Per-component consolidation policy: merge sensitivity, session item cap,
/// and the decay sweep parameters run once per component after extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsolidationSettings {
    /// Similarity above which an unhinted `findSimilar` match is treated as
    /// an implicit `update` conflict.
    pub merge_threshold: f64,
    /// If set, excess active items for a `(component, sessionId)` pair are
    /// expired down to this count after extraction.
    pub max_items_per_session: Option<usize>,
    pub decay_inactive_period_days: i64,
    pub decay_rate: f64,
    pub floor_threshold: Option<f64>,
}

impl Default for ConsolidationSettings {
    fn default() -> Self {
        Self {
            merge_threshold: defaults::DEFAULT_MERGE_THRESHOLD,
            max_items_per_session: defaults::DEFAULT_MAX_ITEMS_PER_SESSION,
            decay_inactive_period_days: defaults::DEFAULT_DECAY_INACTIVE_PERIOD_DAYS,
            decay_rate: defaults::DEFAULT_DECAY_RATE,
            floor_threshold: defaults::DEFAULT_FLOOR_THRESHOLD,
        }
    }
}

/// Engine-wide consolidation defaults, applied to a component that doesn't
/// supply its own `ConsolidationSettings` override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsolidationDefaults {
    /// Episodes younger than this are not yet eligible for consolidation.
    pub min_age_secs: i64,
    pub settings: ConsolidationSettings,
}

impl Default for ConsolidationDefaults {
    fn default() -> Self {
        Self {
            min_age_secs: defaults::DEFAULT_CONSOLIDATION_MIN_AGE_SECS,
            settings: ConsolidationSettings::default(),
        }
    }
}
