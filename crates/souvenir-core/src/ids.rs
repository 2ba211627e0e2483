//! 26-character, lexicographically sortable identifiers.
//!
//! Episodes, memories, and entities are all addressed by a ULID: sortable
//! by creation time without a separate `ORDER BY created_at`, which keeps
//! the episode log and memory table cheap to paginate.

use ulid::Ulid;

/// Generate a new sortable id.
pub fn new_id() -> String {
    Ulid::new().to_string()
}
