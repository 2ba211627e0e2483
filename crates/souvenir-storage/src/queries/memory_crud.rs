//! Insert, get, update, and access-stat bookkeeping for memories, plus the
//! FTS5 sync that must accompany every content-affecting write.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use souvenir_core::errors::StorageError;
use souvenir_core::memory::{Memory, MemoryPatch, MemoryStatus};

use crate::rusqlite_err;

fn status_to_str(status: MemoryStatus) -> &'static str {
    match status {
        MemoryStatus::Active => "active",
        MemoryStatus::Superseded => "superseded",
        MemoryStatus::Expired => "expired",
        MemoryStatus::Decayed => "decayed",
    }
}

fn status_from_str(s: &str) -> Result<MemoryStatus, StorageError> {
    match s {
        "active" => Ok(MemoryStatus::Active),
        "superseded" => Ok(MemoryStatus::Superseded),
        "expired" => Ok(MemoryStatus::Expired),
        "decayed" => Ok(MemoryStatus::Decayed),
        other => Err(StorageError::SchemaError { details: format!("unknown memory status '{other}'") }),
    }
}

fn fmt_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_dt(s: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::SchemaError { details: format!("bad timestamp '{s}': {e}") })
}

fn f32_vec_to_bytes(v: &[f32]) -> Vec<u8> {
    v.iter().flat_map(|f| f.to_le_bytes()).collect()
}

pub(crate) fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Insert/replace this row's lexical index entry. Self-healing: callers
/// never need to check whether the fts row already exists.
fn sync_fts(conn: &Connection, id: &str, content: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM memory_fts WHERE memory_id = ?1", params![id]).map_err(rusqlite_err)?;
    conn.execute(
        "INSERT INTO memory_fts (content, memory_id) VALUES (?1, ?2)",
        params![content, id],
    )
    .map_err(rusqlite_err)?;
    Ok(())
}

fn delete_fts(conn: &Connection, id: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM memory_fts WHERE memory_id = ?1", params![id]).map_err(rusqlite_err)
}

pub fn insert_memory(conn: &Connection, memory: &Memory) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction().map_err(rusqlite_err)?;
    insert_memory_inner(&tx, memory)?;
    tx.commit().map_err(rusqlite_err)
}

fn insert_memory_inner(conn: &Connection, memory: &Memory) -> Result<(), StorageError> {
    let source_ids = serde_json::to_string(&memory.source_episode_ids).map_err(|e| crate::to_storage_err(e.to_string()))?;
    let entity_ids = serde_json::to_string(&memory.entity_ids).map_err(|e| crate::to_storage_err(e.to_string()))?;
    let embedding_blob = memory.embedding.as_ref().map(|v| f32_vec_to_bytes(v));

    conn.execute(
        "INSERT INTO memories (
            id, content, component, category, importance, session_id,
            source_ids, entity_ids, embedding, created_at, updated_at,
            last_accessed, access_count, status, valid_at, invalid_at, superseded_by
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
        params![
            memory.id,
            memory.content,
            memory.component,
            memory.category,
            memory.importance,
            memory.session_id,
            source_ids,
            entity_ids,
            embedding_blob,
            fmt_dt(memory.created_at),
            fmt_dt(memory.updated_at),
            memory.last_accessed.map(fmt_dt),
            memory.access_count as i64,
            status_to_str(memory.status),
            memory.valid_at.map(fmt_dt),
            memory.invalid_at.map(fmt_dt),
            memory.superseded_by,
        ],
    )
    .map_err(rusqlite_err)?;

    sync_fts(conn, &memory.id, &memory.content)?;
    Ok(())
}

pub fn get_memory(conn: &Connection, id: &str) -> Result<Option<Memory>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, content, component, category, importance, session_id,
                    source_ids, entity_ids, embedding, created_at, updated_at,
                    last_accessed, access_count, status, valid_at, invalid_at, superseded_by
             FROM memories WHERE id = ?1",
        )
        .map_err(rusqlite_err)?;

    stmt.query_row(params![id], |row| Ok(row_to_memory(row)))
        .optional()
        .map_err(rusqlite_err)?
        .transpose()
}

/// Partial update. Always bumps `updated_at`; re-syncs the lexical index
/// only when `content` changed.
pub fn update_memory(conn: &Connection, id: &str, patch: &MemoryPatch) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction().map_err(rusqlite_err)?;
    update_memory_inner(&tx, id, patch)?;
    tx.commit().map_err(rusqlite_err)
}

fn update_memory_inner(conn: &Connection, id: &str, patch: &MemoryPatch) -> Result<(), StorageError> {
    let existing = get_memory(conn, id)?.ok_or_else(|| StorageError::MemoryNotFound { id: id.to_string() })?;

    let content = patch.content.clone().unwrap_or(existing.content);
    let importance = patch.importance.unwrap_or(existing.importance);
    let entity_ids = patch.entity_ids.clone().unwrap_or(existing.entity_ids);
    let source_ids = patch.source_episode_ids.clone().unwrap_or(existing.source_episode_ids);
    let embedding = patch.embedding.clone().or(existing.embedding);
    let status = patch.status.unwrap_or(existing.status);
    let superseded_by = patch.superseded_by.clone().or(existing.superseded_by);
    let invalid_at = patch.invalid_at.or(existing.invalid_at);
    let now = Utc::now();

    let entity_ids_json = serde_json::to_string(&entity_ids).map_err(|e| crate::to_storage_err(e.to_string()))?;
    let source_ids_json = serde_json::to_string(&source_ids).map_err(|e| crate::to_storage_err(e.to_string()))?;
    let embedding_blob = embedding.as_ref().map(|v| f32_vec_to_bytes(v));

    let rows = conn
        .execute(
            "UPDATE memories SET content=?2, importance=?3, entity_ids=?4, source_ids=?5,
                embedding=?6, status=?7, superseded_by=?8, invalid_at=?9, updated_at=?10
             WHERE id=?1",
            params![
                id,
                content,
                importance,
                entity_ids_json,
                source_ids_json,
                embedding_blob,
                status_to_str(status),
                superseded_by,
                invalid_at.map(fmt_dt),
                fmt_dt(now),
            ],
        )
        .map_err(rusqlite_err)?;

    if rows == 0 {
        return Err(StorageError::MemoryNotFound { id: id.to_string() });
    }

    if patch.content.is_some() {
        sync_fts(conn, id, &content)?;
    }

    Ok(())
}

pub fn update_access_stats(conn: &Connection, ids: &[String]) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction().map_err(rusqlite_err)?;
    let now = fmt_dt(Utc::now());
    for id in ids {
        tx.execute(
            "UPDATE memories SET access_count = access_count + 1, last_accessed = ?2 WHERE id = ?1",
            params![id, now],
        )
        .map_err(rusqlite_err)?;
    }
    tx.commit().map_err(rusqlite_err)
}

pub fn delete_memory_row(conn: &Connection, id: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM memories WHERE id = ?1", params![id]).map_err(rusqlite_err)?;
    delete_fts(conn, id)?;
    Ok(())
}

pub(crate) fn row_to_memory(row: &rusqlite::Row<'_>) -> Result<Memory, StorageError> {
    let source_ids_json: String = row.get(6).map_err(rusqlite_err)?;
    let entity_ids_json: String = row.get(7).map_err(rusqlite_err)?;
    let embedding_blob: Option<Vec<u8>> = row.get(8).map_err(rusqlite_err)?;
    let created_at: String = row.get(9).map_err(rusqlite_err)?;
    let updated_at: String = row.get(10).map_err(rusqlite_err)?;
    let last_accessed: Option<String> = row.get(11).map_err(rusqlite_err)?;
    let status: String = row.get(13).map_err(rusqlite_err)?;
    let valid_at: Option<String> = row.get(14).map_err(rusqlite_err)?;
    let invalid_at: Option<String> = row.get(15).map_err(rusqlite_err)?;

    Ok(Memory {
        id: row.get(0).map_err(rusqlite_err)?,
        content: row.get(1).map_err(rusqlite_err)?,
        component: row.get(2).map_err(rusqlite_err)?,
        category: row.get(3).map_err(rusqlite_err)?,
        importance: row.get(4).map_err(rusqlite_err)?,
        session_id: row.get(5).map_err(rusqlite_err)?,
        source_episode_ids: serde_json::from_str(&source_ids_json)
            .map_err(|e| StorageError::SchemaError { details: format!("source_ids: {e}") })?,
        entity_ids: serde_json::from_str(&entity_ids_json)
            .map_err(|e| StorageError::SchemaError { details: format!("entity_ids: {e}") })?,
        embedding: embedding_blob.map(|b| bytes_to_f32_vec(&b)),
        created_at: parse_dt(&created_at)?,
        updated_at: parse_dt(&updated_at)?,
        last_accessed: last_accessed.as_deref().map(parse_dt).transpose()?,
        access_count: row.get::<_, i64>(12).map_err(rusqlite_err)? as u64,
        status: status_from_str(&status)?,
        valid_at: valid_at.as_deref().map(parse_dt).transpose()?,
        invalid_at: invalid_at.as_deref().map(parse_dt).transpose()?,
        superseded_by: row.get(16).map_err(rusqlite_err)?,
    })
}

pub(crate) fn status_str(status: MemoryStatus) -> &'static str {
    status_to_str(status)
}

pub(crate) fn fmt_timestamp(dt: DateTime<Utc>) -> String {
    fmt_dt(dt)
}
