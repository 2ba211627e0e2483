//! Named constants backing every `Default` impl in this module. Kept apart
//! from the structs so a config file can be diffed against the defaults at a
//! glance.

pub const DEFAULT_FTS_WEIGHT: f64 = 1.0;
pub const DEFAULT_VECTOR_WEIGHT: f64 = 1.5;
pub const DEFAULT_ENTITY_WEIGHT: f64 = 0.8;
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.05;
pub const DEFAULT_TOP_K: usize = 20;
pub const DEFAULT_TEMPORAL_DECAY_LAMBDA: f64 = 0.005;

pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_MAX_ITEMS_PER_SESSION: Option<usize> = None;
pub const DEFAULT_DECAY_INACTIVE_PERIOD_DAYS: i64 = 14;
pub const DEFAULT_DECAY_RATE: f64 = 0.9;
pub const DEFAULT_FLOOR_THRESHOLD: Option<f64> = Some(0.05);
pub const DEFAULT_CONSOLIDATION_MIN_AGE_SECS: i64 = 300;

pub const DEFAULT_EXPIRED_RETENTION_DAYS: i64 = 7;
pub const DEFAULT_SUPERSEDED_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_DECAYED_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_EPISODE_RETENTION_DAYS: i64 = 90;

pub const DEFAULT_FLUSH_THRESHOLD: usize = 20;
pub const DEFAULT_BUDGET_TOKENS: u32 = 2000;
pub const DEFAULT_DB_PATH: &str = "souvenir.db";
