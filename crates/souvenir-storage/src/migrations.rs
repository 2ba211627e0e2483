//! Schema bootstrap. Idempotent: every statement is `CREATE ... IF NOT EXISTS`,
//! so `run_migrations` is safe to call on every `StorageEngine::open`.

use rusqlite::Connection;
use souvenir_core::errors::StorageError;

use crate::rusqlite_err;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS episodes (
    id              TEXT PRIMARY KEY,
    session_id      TEXT NOT NULL,
    timestamp       TEXT NOT NULL,
    type            TEXT NOT NULL,
    content         TEXT NOT NULL,
    importance      REAL NOT NULL,
    access_count    INTEGER NOT NULL DEFAULT 0,
    last_accessed   TEXT,
    consolidated    INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_episodes_unconsolidated ON episodes(consolidated, timestamp);
CREATE INDEX IF NOT EXISTS idx_episodes_session ON episodes(session_id);

CREATE TABLE IF NOT EXISTS memories (
    id                  TEXT PRIMARY KEY,
    content             TEXT NOT NULL,
    component           TEXT NOT NULL,
    category            TEXT NOT NULL,
    importance          REAL NOT NULL,
    session_id          TEXT,
    source_ids          TEXT NOT NULL DEFAULT '[]',
    entity_ids          TEXT NOT NULL DEFAULT '[]',
    embedding           BLOB,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL,
    last_accessed       TEXT,
    access_count        INTEGER NOT NULL DEFAULT 0,
    status              TEXT NOT NULL,
    valid_at            TEXT,
    invalid_at          TEXT,
    superseded_by       TEXT
);
CREATE INDEX IF NOT EXISTS idx_memories_status_component ON memories(status, component);
CREATE INDEX IF NOT EXISTS idx_memories_session ON memories(component, session_id);
CREATE INDEX IF NOT EXISTS idx_memories_updated_at ON memories(updated_at);

-- Deliberately not an external-content FTS5 table: keeping content and
-- memory_id as plain fts5 columns (rather than content='memories' +
-- content_rowid) means sync is a plain insert/delete at the store's write
-- entry points instead of rowid bookkeeping, and a missing row here is
-- trivially self-healing by re-inserting.
CREATE VIRTUAL TABLE IF NOT EXISTS memory_fts USING fts5(
    content,
    memory_id UNINDEXED
);

CREATE TABLE IF NOT EXISTS entities (
    id          TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    name_lower  TEXT NOT NULL UNIQUE,
    type        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationships (
    from_entity     TEXT NOT NULL,
    to_entity       TEXT NOT NULL,
    relation        TEXT NOT NULL,
    confidence      REAL NOT NULL,
    updated_at      TEXT NOT NULL,
    PRIMARY KEY (from_entity, to_entity, relation)
);
CREATE INDEX IF NOT EXISTS idx_relationships_from ON relationships(from_entity);
CREATE INDEX IF NOT EXISTS idx_relationships_to ON relationships(to_entity);
";

pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(SCHEMA).map_err(rusqlite_err)
}
