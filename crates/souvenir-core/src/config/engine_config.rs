use serde::{Deserialize, Serialize};

use super::defaults;

/// Top-level engine wiring: where the store lives, how eagerly the episode
/// buffer flushes, and the default recall budget when a caller doesn't
/// specify one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// `:memory:` or a filesystem path.
    pub db_path: String,
    pub flush_threshold: usize,
    pub default_budget_tokens: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: defaults::DEFAULT_DB_PATH.to_string(),
            flush_threshold: defaults::DEFAULT_FLUSH_THRESHOLD,
            default_budget_tokens: defaults::DEFAULT_BUDGET_TOKENS,
        }
    }
}
