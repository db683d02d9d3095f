//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Fedimap database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track stage runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stage TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_stage ON runs(stage);

-- One record per federation node; set columns hold JSON arrays
CREATE TABLE IF NOT EXISTS nodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    instance_type TEXT NOT NULL,
    peers TEXT NOT NULL DEFAULT '[]',
    blocked TEXT NOT NULL DEFAULT '[]',
    valid_neighbors TEXT NOT NULL DEFAULT '[]',
    edge_col_status TEXT NOT NULL DEFAULT 'not_started',
    errors TEXT NOT NULL DEFAULT '[]',
    discovered_at TEXT NOT NULL,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_nodes_instance_type ON nodes(instance_type);
CREATE INDEX IF NOT EXISTS idx_nodes_edge_col_status ON nodes(edge_col_status);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
