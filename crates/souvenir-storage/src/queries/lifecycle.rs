//! Status transitions, decay, tombstone deletion, and stats.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use souvenir_core::errors::StorageError;
use souvenir_core::memory::MemoryStatus;
use souvenir_core::traits::MemoryStats;

use crate::rusqlite_err;

use super::memory_crud::{fmt_timestamp, status_str};

pub fn supersede(conn: &Connection, old_id: &str, new_id: &str) -> Result<(), StorageError> {
    let rows = conn
        .execute(
            "UPDATE memories SET status = 'superseded', superseded_by = ?2, updated_at = ?3 WHERE id = ?1",
            params![old_id, new_id, fmt_timestamp(Utc::now())],
        )
        .map_err(rusqlite_err)?;
    if rows == 0 {
        return Err(StorageError::MemoryNotFound { id: old_id.to_string() });
    }
    Ok(())
}

pub fn expire_item(conn: &Connection, id: &str) -> Result<(), StorageError> {
    let now = fmt_timestamp(Utc::now());
    let rows = conn
        .execute(
            "UPDATE memories SET status = 'expired', invalid_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![id, now],
        )
        .map_err(rusqlite_err)?;
    if rows == 0 {
        return Err(StorageError::MemoryNotFound { id: id.to_string() });
    }
    Ok(())
}

pub fn expire_session(conn: &Connection, session_id: &str, component: &str) -> Result<u64, StorageError> {
    let now = fmt_timestamp(Utc::now());
    let count = conn
        .execute(
            "UPDATE memories SET status = 'expired', invalid_at = ?3, updated_at = ?3
             WHERE session_id = ?1 AND component = ?2 AND status = 'active'
               AND (valid_at IS NULL OR valid_at <= ?3)
               AND (invalid_at IS NULL OR invalid_at > ?3)",
            params![session_id, component, now],
        )
        .map_err(rusqlite_err)?;
    Ok(count as u64)
}

pub fn active_item_count(conn: &Connection, component: &str, session_id: Option<&str>) -> Result<u64, StorageError> {
    let count: i64 = match session_id {
        Some(sid) => conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE component = ?1 AND session_id = ?2 AND status = 'active'",
                params![component, sid],
                |row| row.get(0),
            )
            .map_err(rusqlite_err)?,
        None => conn
            .query_row(
                "SELECT COUNT(*) FROM memories WHERE component = ?1 AND status = 'active'",
                params![component],
                |row| row.get(0),
            )
            .map_err(rusqlite_err)?,
    };
    Ok(count as u64)
}

/// Applies the decay rule to every recallable row in `component` idle
/// longer than `inactive_period`. Floor-check happens before multiply in
/// the same pass (see `souvenir_decay::evaluate`), so no row is ever both.
pub fn apply_importance_decay(
    conn: &Connection,
    component: &str,
    inactive_period: chrono::Duration,
    decay_rate: f64,
    floor_threshold: Option<f64>,
) -> Result<u64, StorageError> {
    let cutoff = Utc::now() - inactive_period;
    let cutoff_str = fmt_timestamp(cutoff);
    let now = fmt_timestamp(Utc::now());

    let mut stmt = conn
        .prepare(
            "SELECT id, importance FROM memories
             WHERE component = ?1 AND status = 'active'
               AND (valid_at IS NULL OR valid_at <= ?3)
               AND (invalid_at IS NULL OR invalid_at > ?3)
               AND (CASE WHEN last_accessed IS NULL THEN updated_at
                         WHEN last_accessed > updated_at THEN last_accessed
                         ELSE updated_at END) < ?2",
        )
        .map_err(rusqlite_err)?;

    let candidates: Vec<(String, f64)> = stmt
        .query_map(params![component, cutoff_str, now], |row| Ok((row.get(0)?, row.get(1)?)))
        .map_err(rusqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(rusqlite_err)?;

    let now = fmt_timestamp(Utc::now());
    let mut floored = 0u64;
    for (id, importance) in candidates {
        match souvenir_decay::evaluate(importance, decay_rate, floor_threshold) {
            souvenir_decay::DecayOutcome::Floored => {
                conn.execute(
                    "UPDATE memories SET status = 'decayed', updated_at = ?2 WHERE id = ?1",
                    params![id, now],
                )
                .map_err(rusqlite_err)?;
                floored += 1;
            }
            souvenir_decay::DecayOutcome::Decayed { new_importance } => {
                conn.execute(
                    "UPDATE memories SET importance = ?2, updated_at = ?3 WHERE id = ?1",
                    params![id, new_importance, now],
                )
                .map_err(rusqlite_err)?;
            }
        }
    }
    Ok(floored)
}

/// Expires the lowest-importance active items for `(component, session_id)`
/// down to `keep`, breaking ties by older `updated_at`.
pub fn expire_lowest_importance(conn: &Connection, component: &str, session_id: &str, keep: usize) -> Result<u64, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT id FROM memories WHERE component = ?1 AND session_id = ?2 AND status = 'active'
             ORDER BY importance ASC, updated_at ASC",
        )
        .map_err(rusqlite_err)?;

    let ids: Vec<String> = stmt
        .query_map(params![component, session_id], |row| row.get(0))
        .map_err(rusqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(rusqlite_err)?;

    if ids.len() <= keep {
        return Ok(0);
    }

    let now = fmt_timestamp(Utc::now());
    let to_expire = &ids[..ids.len() - keep];
    for id in to_expire {
        conn.execute(
            "UPDATE memories SET status = 'decayed', updated_at = ?2 WHERE id = ?1",
            params![id, now],
        )
        .map_err(rusqlite_err)?;
    }
    Ok(to_expire.len() as u64)
}

pub fn delete_tombstoned(conn: &Connection, status: MemoryStatus, cutoff: DateTime<Utc>) -> Result<u64, StorageError> {
    let mut stmt = conn
        .prepare("SELECT id FROM memories WHERE status = ?1 AND updated_at < ?2")
        .map_err(rusqlite_err)?;
    let ids: Vec<String> = stmt
        .query_map(params![status_str(status), fmt_timestamp(cutoff)], |row| row.get(0))
        .map_err(rusqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(rusqlite_err)?;

    for id in &ids {
        super::memory_crud::delete_memory_row(conn, id)?;
    }
    Ok(ids.len() as u64)
}

pub fn stats(conn: &Connection) -> Result<MemoryStats, StorageError> {
    let mut by_status_stmt = conn.prepare("SELECT status, COUNT(*) FROM memories GROUP BY status").map_err(rusqlite_err)?;
    let by_status = by_status_stmt
        .query_map([], |row| {
            let s: String = row.get(0)?;
            let c: i64 = row.get(1)?;
            Ok((s, c as u64))
        })
        .map_err(rusqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(rusqlite_err)?;

    let by_status = by_status
        .into_iter()
        .map(|(s, c)| -> Result<(MemoryStatus, u64), StorageError> {
            let status = match s.as_str() {
                "active" => MemoryStatus::Active,
                "superseded" => MemoryStatus::Superseded,
                "expired" => MemoryStatus::Expired,
                "decayed" => MemoryStatus::Decayed,
                other => return Err(StorageError::SchemaError { details: format!("unknown status '{other}'") }),
            };
            Ok((status, c))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut by_component_stmt = conn.prepare("SELECT component, COUNT(*) FROM memories GROUP BY component").map_err(rusqlite_err)?;
    let by_component = by_component_stmt
        .query_map([], |row| {
            let c: String = row.get(0)?;
            let n: i64 = row.get(1)?;
            Ok((c, n as u64))
        })
        .map_err(rusqlite_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(rusqlite_err)?;

    Ok(MemoryStats { by_status, by_component })
}
