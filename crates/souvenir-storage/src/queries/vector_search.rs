//! Embedding storage and the brute-force cosine-similarity scan used by
//! recall's vector signal and compaction's near-duplicate merge.

use chrono::Utc;
use rusqlite::{params, Connection};
use souvenir_core::errors::StorageError;
use souvenir_core::memory::Memory;

use crate::rusqlite_err;

use super::memory_crud::{fmt_timestamp, row_to_memory};

pub fn find_recallable_with_embedding(conn: &Connection) -> Result<Vec<Memory>, StorageError> {
    let now = fmt_timestamp(Utc::now());
    let mut stmt = conn
        .prepare(
            "SELECT id, content, component, category, importance, session_id,
                    source_ids, entity_ids, embedding, created_at, updated_at,
                    last_accessed, access_count, status, valid_at, invalid_at, superseded_by
             FROM memories
             WHERE status = 'active'
               AND embedding IS NOT NULL
               AND (valid_at IS NULL OR valid_at <= ?1)
               AND (invalid_at IS NULL OR invalid_at > ?1)",
        )
        .map_err(rusqlite_err)?;

    let rows = stmt.query_map(params![now], |row| Ok(row_to_memory(row))).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)??);
    }
    Ok(out)
}

pub fn find_unembedded(conn: &Connection, component: &str, limit: usize) -> Result<Vec<Memory>, StorageError> {
    let now = fmt_timestamp(Utc::now());
    let mut stmt = conn
        .prepare(
            "SELECT id, content, component, category, importance, session_id,
                    source_ids, entity_ids, embedding, created_at, updated_at,
                    last_accessed, access_count, status, valid_at, invalid_at, superseded_by
             FROM memories
             WHERE status = 'active'
               AND embedding IS NULL
               AND component = ?1
               AND (valid_at IS NULL OR valid_at <= ?2)
               AND (invalid_at IS NULL OR invalid_at > ?2)
             LIMIT ?3",
        )
        .map_err(rusqlite_err)?;

    let rows = stmt.query_map(params![component, now, limit as i64], |row| Ok(row_to_memory(row))).map_err(rusqlite_err)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)??);
    }
    Ok(out)
}

/// Cosine similarity between two equal-length float vectors. Returns 0.0 for
/// a zero-norm vector rather than dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
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

    #[test]
    fn orthogonal_vectors_have_zero_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-9);
    }

    #[test]
    fn identical_vectors_have_unit_similarity() {
        assert!((cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_vector_is_zero_not_nan() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
