/// Souvenir crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Length of the full-text-search query sanitiser's reserved-operator list.
pub const FTS_RESERVED_OPERATORS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

/// Characters stripped from a query before it reaches the full-text engine.
pub const FTS_STRIP_CHARS: [char; 4] = ['*', '"', '(', ')'];

/// Tokens shorter than this are dropped by the lexical sanitiser.
pub const FTS_MIN_TOKEN_LEN: usize = 2;

/// Tokens shorter than this are dropped by entity-name matching in recall.
pub const ENTITY_MATCH_MIN_TOKEN_LEN: usize = 3;

/// Characters per approximate token, per the tokenizer's char-count model.
pub const CHARS_PER_TOKEN: usize = 4;
