//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::{EdgeStatus, InstanceType, NodeError};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{NodeFilter, NodeRecord, NodeUpdate, RunRecord, RunStatus, Stage};
use crate::FedimapError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

const NODE_COLUMNS: &str = "name, instance_type, peers, blocked, valid_neighbors, \
     edge_col_status, errors, discovered_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

/// A node row before its JSON columns are decoded
struct RawNode {
    name: String,
    instance_type: String,
    peers: String,
    blocked: String,
    valid_neighbors: String,
    edge_col_status: String,
    errors: String,
    discovered_at: String,
    updated_at: Option<String>,
}

impl RawNode {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            instance_type: row.get(1)?,
            peers: row.get(2)?,
            blocked: row.get(3)?,
            valid_neighbors: row.get(4)?,
            edge_col_status: row.get(5)?,
            errors: row.get(6)?,
            discovered_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    fn decode(self) -> StorageResult<NodeRecord> {
        let instance_type = parse_instance_type(&self.instance_type)?;
        let edge_col_status = EdgeStatus::from_db_string(&self.edge_col_status).ok_or_else(|| {
            StorageError::Serialization(format!(
                "Unknown edge status '{}' for {}",
                self.edge_col_status, self.name
            ))
        })?;

        Ok(NodeRecord {
            instance_type,
            peers: serde_json::from_str(&self.peers)?,
            blocked: serde_json::from_str(&self.blocked)?,
            valid_neighbors: serde_json::from_str(&self.valid_neighbors)?,
            edge_col_status,
            errors: serde_json::from_str::<Vec<NodeError>>(&self.errors)?,
            discovered_at: self.discovered_at,
            updated_at: self.updated_at,
            name: self.name,
        })
    }
}

fn parse_instance_type(s: &str) -> StorageResult<InstanceType> {
    InstanceType::from_db_string(s)
        .ok_or_else(|| StorageError::Serialization(format!("Unknown instance type '{}'", s)))
}

/// Builds a WHERE clause and its positional values for a filter
fn where_clause(filter: &NodeFilter) -> (String, Vec<&'static str>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    if let Some(instance_type) = filter.instance_type {
        values.push(instance_type.to_db_string());
        clauses.push(format!("instance_type = ?{}", values.len()));
    }
    if let Some(status) = filter.edge_col_status {
        values.push(status.to_db_string());
        clauses.push(format!("edge_col_status = ?{}", values.len()));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn encode_set(set: &BTreeSet<String>) -> StorageResult<String> {
    Ok(serde_json::to_string(set)?)
}

impl SqliteStorage {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> Result<Self, FedimapError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, FedimapError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    fn query_run(&self, sql: &str, param: &dyn rusqlite::ToSql) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_row([param], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })
            .optional()?;

        raw.map(|(id, stage, started_at, finished_at, config_hash, status)| {
            Ok(RunRecord {
                id,
                stage: Stage::from_db_string(&stage).ok_or_else(|| {
                    StorageError::Serialization(format!("Unknown stage '{}'", stage))
                })?,
                started_at,
                finished_at,
                config_hash,
                status: RunStatus::from_db_string(&status).ok_or_else(|| {
                    StorageError::Serialization(format!("Unknown run status '{}'", status))
                })?,
            })
        })
        .transpose()
    }
}

impl Storage for SqliteStorage {
    // ===== Node Queries =====

    fn find_batch(
        &self,
        filter: &NodeFilter,
        limit: Option<usize>,
    ) -> StorageResult<Vec<NodeRecord>> {
        let (clause, values) = where_clause(filter);
        let mut sql = format!("SELECT {} FROM nodes{} ORDER BY id", NODE_COLUMNS, clause);
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(values.iter()), RawNode::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawNode::decode).collect()
    }

    fn get_node(&self, name: &str) -> StorageResult<Option<NodeRecord>> {
        let sql = format!("SELECT {} FROM nodes WHERE name = ?1", NODE_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![name], RawNode::from_row)
            .optional()?;

        raw.map(RawNode::decode).transpose()
    }

    fn existing_names(&self, candidates: &[String]) -> StorageResult<HashSet<String>> {
        if candidates.is_empty() {
            return Ok(HashSet::new());
        }

        // One statement for the whole candidate set
        let encoded = serde_json::to_string(candidates)?;
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM nodes WHERE name IN (SELECT value FROM json_each(?1))")?;

        let names = stmt
            .query_map(params![encoded], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(names)
    }

    fn names_where(&self, filter: &NodeFilter) -> StorageResult<HashSet<String>> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT name FROM nodes{}", clause);

        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(names)
    }

    fn count_where(&self, filter: &NodeFilter) -> StorageResult<u64> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM nodes{}", clause);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Node Writes =====

    fn insert_many(&mut self, names: &[String]) -> StorageResult<usize> {
        if names.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO nodes (name, instance_type, discovered_at) VALUES (?1, ?2, ?3)",
            )?;
            for name in names {
                inserted +=
                    stmt.execute(params![name, InstanceType::Unclassified.to_db_string(), now])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn update_one(&mut self, name: &str, update: &NodeUpdate) -> StorageResult<()> {
        let tx = self.conn.transaction()?;

        let current: String = tx
            .query_row(
                "SELECT instance_type FROM nodes WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| StorageError::NodeNotFound(name.to_string()))?;

        if update.is_empty() {
            return Ok(());
        }

        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(next) = update.instance_type {
            let from = parse_instance_type(&current)?;
            if !from.can_transition_to(next) {
                return Err(StorageError::InvalidTransition {
                    name: name.to_string(),
                    from,
                    to: next,
                });
            }
            clauses.push("instance_type");
            values.push(next.to_db_string().to_string());
        }
        if let Some(peers) = &update.peers {
            clauses.push("peers");
            values.push(encode_set(peers)?);
        }
        if let Some(blocked) = &update.blocked {
            clauses.push("blocked");
            values.push(encode_set(blocked)?);
        }
        if let Some(valid) = &update.valid_neighbors {
            clauses.push("valid_neighbors");
            values.push(encode_set(valid)?);
        }
        if let Some(status) = update.edge_col_status {
            clauses.push("edge_col_status");
            values.push(status.to_db_string().to_string());
        }
        if let Some(errors) = &update.errors {
            clauses.push("errors");
            values.push(serde_json::to_string(errors)?);
        }
        clauses.push("updated_at");
        values.push(Utc::now().to_rfc3339());

        let assignments = clauses
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(name.to_string());
        let sql = format!(
            "UPDATE nodes SET {} WHERE name = ?{}",
            assignments,
            values.len()
        );

        tx.execute(&sql, params_from_iter(values.iter()))?;
        tx.commit()?;
        Ok(())
    }

    // ===== Maintenance =====

    fn requeue_instances(&mut self, from: InstanceType) -> StorageResult<u64> {
        if !from.can_transition_to(InstanceType::Unclassified) {
            return Err(StorageError::InvalidTransition {
                name: "*".to_string(),
                from,
                to: InstanceType::Unclassified,
            });
        }

        let changed = self.conn.execute(
            "UPDATE nodes SET instance_type = ?1, updated_at = ?2 WHERE instance_type = ?3",
            params![
                InstanceType::Unclassified.to_db_string(),
                Utc::now().to_rfc3339(),
                from.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    fn reset_edge_status(&mut self, from: EdgeStatus) -> StorageResult<u64> {
        let changed = self.conn.execute(
            "UPDATE nodes SET edge_col_status = ?1, updated_at = ?2 WHERE edge_col_status = ?3",
            params![
                EdgeStatus::NotStarted.to_db_string(),
                Utc::now().to_rfc3339(),
                from.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    // ===== Run Management =====

    fn create_run(&mut self, stage: Stage, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (stage, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                stage.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.query_run(
            "SELECT id, stage, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
            &run_id,
        )?
        .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, stage: Stage) -> StorageResult<Option<RunRecord>> {
        self.query_run(
            "SELECT id, stage, started_at, finished_at, config_hash, status FROM runs
             WHERE stage = ?1 ORDER BY id DESC LIMIT 1",
            &stage.to_db_string(),
        )
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}
