//! Entity/relationship graph operations.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use souvenir_core::constants::ENTITY_MATCH_MIN_TOKEN_LEN;
use souvenir_core::entity::{Entity, Relationship};
use souvenir_core::errors::StorageError;
use souvenir_core::ids::new_id;
use souvenir_core::memory::Memory;

use crate::rusqlite_err;

use super::memory_crud::{fmt_timestamp, row_to_memory};

/// On a name conflict (case-insensitive), update `type` and keep the
/// existing id.
pub fn upsert_entity(conn: &Connection, entity: &Entity) -> Result<Entity, StorageError> {
    let name_lower = entity.name.to_lowercase();
    let existing: Option<String> = conn
        .query_row("SELECT id FROM entities WHERE name_lower = ?1", params![name_lower], |row| row.get(0))
        .optional()
        .map_err(rusqlite_err)?;

    match existing {
        Some(id) => {
            conn.execute("UPDATE entities SET type = ?2 WHERE id = ?1", params![id, entity.entity_type])
                .map_err(rusqlite_err)?;
            Ok(Entity { id, name: entity.name.clone(), entity_type: entity.entity_type.clone() })
        }
        None => {
            let id = if entity.id.is_empty() { new_id() } else { entity.id.clone() };
            conn.execute(
                "INSERT INTO entities (id, name, name_lower, type) VALUES (?1, ?2, ?3, ?4)",
                params![id, entity.name, name_lower, entity.entity_type],
            )
            .map_err(rusqlite_err)?;
            Ok(Entity { id, name: entity.name.clone(), entity_type: entity.entity_type.clone() })
        }
    }
}

pub fn upsert_relationship(conn: &Connection, rel: &Relationship) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO relationships (from_entity, to_entity, relation, confidence, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(from_entity, to_entity, relation) DO UPDATE SET
            confidence = excluded.confidence,
            updated_at = excluded.updated_at",
        params![rel.from_entity_id, rel.to_entity_id, rel.relation, rel.confidence, rel.updated_at.to_rfc3339()],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

/// Splits `query` on whitespace, drops tokens of length ≤ 2, and returns
/// entities whose name contains any remaining token (case-insensitive).
/// Intentionally loose substring matching — not a design to "fix".
pub fn find_entities_by_name(conn: &Connection, query: &str) -> Result<Vec<Entity>, StorageError> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.chars().count() > ENTITY_MATCH_MIN_TOKEN_LEN - 1)
        .map(|t| t.to_lowercase())
        .collect();

    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();
    let mut stmt = conn.prepare("SELECT id, name, type FROM entities WHERE name_lower LIKE ?1").map_err(rusqlite_err)?;

    for token in &tokens {
        let pattern = format!("%{token}%");
        let rows = stmt
            .query_map(params![pattern], |row| {
                Ok(Entity { id: row.get(0)?, name: row.get(1)?, entity_type: row.get(2)? })
            })
            .map_err(rusqlite_err)?;
        for row in rows {
            let entity = row.map_err(rusqlite_err)?;
            if seen.insert(entity.id.clone()) {
                results.push(entity);
            }
        }
    }
    Ok(results)
}

pub fn find_relationships_for_entity(conn: &Connection, id: &str) -> Result<Vec<Relationship>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT from_entity, to_entity, relation, confidence, updated_at FROM relationships WHERE from_entity = ?1 OR to_entity = ?1")
        .map_err(rusqlite_err)?;

    let rows = stmt
        .query_map(params![id], |row| {
            let updated_at: String = row.get(4)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, f64>(3)?,
                updated_at,
            ))
        })
        .map_err(rusqlite_err)?;

    let mut out = Vec::new();
    for row in rows {
        let (from_entity_id, to_entity_id, relation, confidence, updated_at) = row.map_err(rusqlite_err)?;
        let updated_at = chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map_err(|e| StorageError::SchemaError { details: e.to_string() })?
            .with_timezone(&Utc);
        out.push(Relationship { from_entity_id, to_entity_id, relation, confidence, updated_at });
    }
    Ok(out)
}

/// Distinct recallable memories whose `entity_ids` JSON array contains any
/// of `ids`, via a `json_each` correlated subquery.
pub fn find_memories_by_entity_ids(conn: &Connection, ids: &[String]) -> Result<Vec<Memory>, StorageError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
    let sql = format!(
        "SELECT DISTINCT m.id, m.content, m.component, m.category, m.importance, m.session_id,
                m.source_ids, m.entity_ids, m.embedding, m.created_at, m.updated_at,
                m.last_accessed, m.access_count, m.status, m.valid_at, m.invalid_at, m.superseded_by
         FROM memories m, json_each(m.entity_ids) je
         WHERE je.value IN ({placeholders})
           AND m.status = 'active'
           AND (m.valid_at IS NULL OR m.valid_at <= ?)
           AND (m.invalid_at IS NULL OR m.invalid_at > ?)"
    );

    let now = fmt_timestamp(Utc::now());
    let mut stmt = conn.prepare(&sql).map_err(rusqlite_err)?;
    let mut bound: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|id| id as &dyn rusqlite::ToSql).collect();
    bound.push(&now);
    bound.push(&now);
    let rows = stmt.query_map(bound.as_slice(), |row| Ok(row_to_memory(row))).map_err(rusqlite_err)?;

    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(rusqlite_err)??);
    }
    Ok(out)
}

pub fn delete_orphaned_entities(conn: &Connection) -> Result<u64, StorageError> {
    let count = conn
        .execute(
            "DELETE FROM entities WHERE id NOT IN (
                SELECT je.value FROM memories m, json_each(m.entity_ids) je WHERE m.status = 'active'
             ) AND id NOT IN (
                SELECT from_entity FROM relationships
                UNION
                SELECT to_entity FROM relationships
             )",
            [],
        )
        .map_err(rusqlite_err)?;
    Ok(count as u64)
}

pub fn delete_orphaned_relationships(conn: &Connection) -> Result<u64, StorageError> {
    let count = conn
        .execute(
            "DELETE FROM relationships WHERE from_entity NOT IN (SELECT id FROM entities)
                                          OR to_entity NOT IN (SELECT id FROM entities)",
            [],
        )
        .map_err(rusqlite_err)?;
    Ok(count as u64)
}
