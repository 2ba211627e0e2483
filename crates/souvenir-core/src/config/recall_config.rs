use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Weights and thresholds governing `RecallPipeline` fusion. All weights
/// are dimensionless; `componentWeights` defaults to a factor of 1.0 for
/// any component not named explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecallConfig {
    pub fts_weight: f64,
    pub vector_weight: f64,
    pub entity_weight: f64,
    pub component_weights: HashMap<String, f64>,
    pub relevance_threshold: f64,
    pub top_k: usize,
    pub temporal_decay_lambda: f64,
}

impl RecallConfig {
    /// The weight to apply for `component`, falling back to the default
    /// factor of 1.0 when no override is configured.
    pub fn component_weight(&self, component: &str) -> f64 {
        self.component_weights.get(component).copied().unwrap_or(1.0)
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            fts_weight: defaults::DEFAULT_FTS_WEIGHT,
            vector_weight: defaults::DEFAULT_VECTOR_WEIGHT,
            entity_weight: defaults::DEFAULT_ENTITY_WEIGHT,
            component_weights: HashMap::new(),
            relevance_threshold: defaults::DEFAULT_RELEVANCE_THRESHOLD,
            top_k: defaults::DEFAULT_TOP_K,
            temporal_decay_lambda: defaults::DEFAULT_TEMPORAL_DECAY_LAMBDA,
        }
    }
}
