//! Lexical search: query sanitisation and the FTS5-backed `searchFts` /
//! `findSimilar` operations.
//!
//! The sanitiser is centralised here and nowhere else constructs an FTS5
//! match expression from user input, per the design note that duplicating
//! these rules invites drift.

use chrono::Utc;
use rusqlite::{params, Connection};
use souvenir_core::constants::{FTS_MIN_TOKEN_LEN, FTS_RESERVED_OPERATORS, FTS_STRIP_CHARS};
use souvenir_core::errors::StorageError;
use souvenir_core::memory::Memory;
use souvenir_core::traits::SimilarFilter;

use crate::rusqlite_err;

use super::memory_crud::{fmt_timestamp, row_to_memory};

/// `* " ( )` stripped, whitespace collapsed, tokens ≤1 char or a reserved
/// operator dropped, survivors joined with ` OR `. Returns `None` if
/// nothing survives (callers must treat that as "match nothing", not
/// "match everything").
pub fn sanitize(query: &str) -> Option<String> {
    let cleaned: String = query
        .chars()
        .map(|c| if FTS_STRIP_CHARS.contains(&c) { ' ' } else { c })
        .collect();

    let tokens: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() > FTS_MIN_TOKEN_LEN - 1)
        .filter(|t| !FTS_RESERVED_OPERATORS.iter().any(|op| op.eq_ignore_ascii_case(t)))
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" OR "))
    }
}

pub fn search_fts(conn: &Connection, query: &str, limit: usize) -> Result<Vec<(Memory, f64)>, StorageError> {
    let Some(match_expr) = sanitize(query) else {
        return Ok(Vec::new());
    };

    let now = fmt_timestamp(Utc::now());

    let mut stmt = conn
        .prepare(
            "SELECT m.id, m.content, m.component, m.category, m.importance, m.session_id,
                    m.source_ids, m.entity_ids, m.embedding, m.created_at, m.updated_at,
                    m.last_accessed, m.access_count, m.status, m.valid_at, m.invalid_at,
                    m.superseded_by, bm25(memory_fts) AS rank
             FROM memory_fts
             JOIN memories m ON m.id = memory_fts.memory_id
             WHERE memory_fts MATCH ?1
               AND m.status = 'active'
               AND (m.valid_at IS NULL OR m.valid_at <= ?2)
               AND (m.invalid_at IS NULL OR m.invalid_at > ?2)
             ORDER BY rank
             LIMIT ?3",
        )
        .map_err(rusqlite_err)?;

    let rows = stmt
        .query_map(params![match_expr, now, limit as i64], |row| {
            let bm25_raw: f64 = row.get(17)?;
            Ok((row_to_memory(row), -bm25_raw))
        })
        .map_err(rusqlite_err)?;

    let mut results = Vec::new();
    for row in rows {
        let (memory, score) = row.map_err(rusqlite_err)?;
        results.push((memory?, score));
    }
    Ok(results)
}

pub fn find_similar(
    conn: &Connection,
    content: &str,
    component: &str,
    filter: &SimilarFilter,
) -> Result<Vec<Memory>, StorageError> {
    let Some(match_expr) = sanitize(content) else {
        return Ok(Vec::new());
    };

    let limit = if filter.limit == 0 { 10 } else { filter.limit };
    let now = fmt_timestamp(Utc::now());

    let mut sql = String::from(
        "SELECT m.id, m.content, m.component, m.category, m.importance, m.session_id,
                m.source_ids, m.entity_ids, m.embedding, m.created_at, m.updated_at,
                m.last_accessed, m.access_count, m.status, m.valid_at, m.invalid_at,
                m.superseded_by
         FROM memory_fts
         JOIN memories m ON m.id = memory_fts.memory_id
         WHERE memory_fts MATCH ?1
           AND m.status = 'active'
           AND (m.valid_at IS NULL OR m.valid_at <= ?2)
           AND (m.invalid_at IS NULL OR m.invalid_at > ?2)
           AND m.component = ?3",
    );
    let mut idx = 4;
    if filter.category.is_some() {
        sql.push_str(&format!(" AND m.category = ?{idx}"));
        idx += 1;
    }
    if filter.session_id.is_some() {
        sql.push_str(&format!(" AND m.session_id = ?{idx}"));
        idx += 1;
    }
    sql.push_str(&format!(" ORDER BY bm25(memory_fts) LIMIT ?{idx}"));

    let mut stmt = conn.prepare(&sql).map_err(rusqlite_err)?;

    let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&match_expr, &now, &component];
    if let Some(category) = &filter.category {
        bound.push(category);
    }
    if let Some(session_id) = &filter.session_id {
        bound.push(session_id);
    }
    let limit_i64 = limit as i64;
    bound.push(&limit_i64);

    let rows = stmt.query_map(bound.as_slice(), |row| Ok(row_to_memory(row))).map_err(rusqlite_err)?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row.map_err(rusqlite_err)??);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_sanitizes_to_none() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("   "), None);
        assert_eq!(sanitize("* \" ( )"), None);
    }

    #[test]
    fn short_tokens_and_operators_are_dropped() {
        assert_eq!(sanitize("a OR b"), None);
        assert_eq!(sanitize("cat AND dog"), Some("cat OR dog".to_string()));
    }

    #[test]
    fn reserved_chars_are_stripped_not_left_dangling() {
        assert_eq!(sanitize("\"quoted phrase\""), Some("quoted OR phrase".to_string()));
    }
}
