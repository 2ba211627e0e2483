//! The persistent append-only episode log.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use souvenir_core::episode::{Episode, EpisodeType};
use souvenir_core::errors::StorageError;

use crate::rusqlite_err;

fn type_to_str(t: EpisodeType) -> &'static str {
    match t {
        EpisodeType::Conversation => "conversation",
        EpisodeType::Observation => "observation",
        EpisodeType::ToolResult => "toolResult",
        EpisodeType::Error => "error",
        EpisodeType::Decision => "decision",
        EpisodeType::UserDirective => "userDirective",
    }
}

fn type_from_str(s: &str) -> Result<EpisodeType, StorageError> {
    match s {
        "conversation" => Ok(EpisodeType::Conversation),
        "observation" => Ok(EpisodeType::Observation),
        "toolResult" => Ok(EpisodeType::ToolResult),
        "error" => Ok(EpisodeType::Error),
        "decision" => Ok(EpisodeType::Decision),
        "userDirective" => Ok(EpisodeType::UserDirective),
        other => Err(StorageError::SchemaError { details: format!("unknown episode type '{other}'") }),
    }
}

/// Atomic batch insert. Empty batch is a no-op.
pub fn insert(conn: &Connection, batch: &[Episode]) -> Result<(), StorageError> {
    if batch.is_empty() {
        return Ok(());
    }
    let tx = conn.unchecked_transaction().map_err(rusqlite_err)?;
    for ep in batch {
        tx.execute(
            "INSERT INTO episodes (id, session_id, timestamp, type, content, importance, access_count, last_accessed, consolidated)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
            params![
                ep.id,
                ep.session_id,
                ep.timestamp.to_rfc3339(),
                type_to_str(ep.episode_type),
                ep.content,
                ep.importance,
                ep.access_count as i64,
                ep.last_accessed.map(|t| t.to_rfc3339()),
                ep.consolidated as i64,
            ],
        )
        .map_err(rusqlite_err)?;
    }
    tx.commit().map_err(rusqlite_err)
}

pub fn fetch_unconsolidated(conn: &Connection, min_age: chrono::Duration) -> Result<Vec<Episode>, StorageError> {
    let cutoff = (Utc::now() - min_age).to_rfc3339();
    let mut stmt = conn
        .prepare(
            "SELECT id, session_id, timestamp, type, content, importance, access_count, last_accessed, consolidated
             FROM episodes WHERE consolidated = 0 AND timestamp <= ?1 ORDER BY timestamp ASC",
        )
        .map_err(rusqlite_err)?;

    let rows = stmt
        .query_map(params![cutoff], |row| {
            let timestamp: String = row.get(2)?;
            let episode_type: String = row.get(3)?;
            let last_accessed: Option<String> = row.get(7)?;
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                timestamp,
                episode_type,
                row.get::<_, String>(4)?,
                row.get::<_, f64>(5)?,
                row.get::<_, i64>(6)?,
                last_accessed,
                row.get::<_, i64>(8)?,
            ))
        })
        .map_err(rusqlite_err)?;

    let mut out = Vec::new();
    for row in rows {
        let (id, session_id, timestamp, episode_type, content, importance, access_count, last_accessed, consolidated) =
            row.map_err(rusqlite_err)?;
        let timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&timestamp)
            .map_err(|e| StorageError::SchemaError { details: e.to_string() })?
            .with_timezone(&Utc);
        let last_accessed = last_accessed
            .as_deref()
            .map(|s| {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StorageError::SchemaError { details: e.to_string() })
            })
            .transpose()?;
        out.push(Episode {
            id,
            session_id,
            timestamp,
            episode_type: type_from_str(&episode_type)?,
            content,
            importance,
            access_count: access_count as u64,
            last_accessed,
            consolidated: consolidated != 0,
        });
    }
    Ok(out)
}

pub fn mark_consolidated(conn: &Connection, ids: &[String]) -> Result<(), StorageError> {
    let tx = conn.unchecked_transaction().map_err(rusqlite_err)?;
    for id in ids {
        tx.execute("UPDATE episodes SET consolidated = 1 WHERE id = ?1", params![id]).map_err(rusqlite_err)?;
    }
    tx.commit().map_err(rusqlite_err)
}

pub fn delete_consolidated_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
    let count = conn
        .execute(
            "DELETE FROM episodes WHERE consolidated = 1 AND timestamp < ?1",
            params![cutoff.to_rfc3339()],
        )
        .map_err(rusqlite_err)?;
    Ok(count as u64)
}
