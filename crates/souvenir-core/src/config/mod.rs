//! Declarative configuration for every Souvenir subsystem.
//!
//! Each subsystem owns one `#[serde(default)]` struct deferring to
//! [`defaults`]; `SouvenirConfig` composes them into a single TOML-loadable
//! root.
//!
//! # Examples
//!
//! ```
//! use souvenir_core::config::SouvenirConfig;
//!
//! let cfg = SouvenirConfig::default();
//! assert_eq!(cfg.recall.top_k, 20);
//! ```

mod compaction_config;
mod consolidation_config;
pub mod defaults;
mod engine_config;
mod recall_config;

pub use compaction_config::CompactionConfig;
pub use consolidation_config::{ConsolidationDefaults, ConsolidationSettings};
pub use engine_config::EngineConfig;
pub use recall_config::RecallConfig;

use serde::{Deserialize, Serialize};

/// Root configuration, loadable from a `souvenir.toml` or built
/// programmatically via `Default`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SouvenirConfig {
    pub engine: EngineConfig,
    pub recall: RecallConfig,
    pub consolidation: ConsolidationDefaults,
    pub compaction: CompactionConfig,
}

impl SouvenirConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let cfg = SouvenirConfig::default();
        let s = cfg.to_toml_string().unwrap();
        let reloaded = SouvenirConfig::from_toml_str(&s).unwrap();
        assert_eq!(reloaded.recall.top_k, cfg.recall.top_k);
        assert_eq!(reloaded.engine.flush_threshold, cfg.engine.flush_threshold);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: SouvenirConfig = toml::from_str("[recall]\ntopK = 5\n").unwrap();
        assert_eq!(cfg.recall.top_k, 5);
        assert_eq!(cfg.recall.fts_weight, defaults::DEFAULT_FTS_WEIGHT);
    }
}
