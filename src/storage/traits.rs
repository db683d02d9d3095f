//! Storage traits and error types
//!
//! This module defines the Frontier Store contract the crawl driver, edge
//! validator and edge materializer are written against.

use crate::state::{EdgeStatus, InstanceType};
use crate::storage::{NodeFilter, NodeRecord, NodeUpdate, RunRecord, RunStatus, Stage};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Invalid instance type transition for {name}: {from} -> {to}")]
    InvalidTransition {
        name: String,
        from: InstanceType,
        to: InstanceType,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for Frontier Store implementations
///
/// Nodes are keyed by name. No multi-document transactions are assumed
/// beyond idempotent per-node updates, except that `insert_many` must behave
/// as an atomic insert-if-absent keyed by name.
pub trait Storage {
    // ===== Node Queries =====

    /// Returns up to `limit` nodes matching `filter`, in discovery order
    ///
    /// `None` returns every matching node.
    fn find_batch(&self, filter: &NodeFilter, limit: Option<usize>)
        -> StorageResult<Vec<NodeRecord>>;

    /// Gets a single node by name
    fn get_node(&self, name: &str) -> StorageResult<Option<NodeRecord>>;

    /// Returns which of `candidates` already exist, in a single query
    fn existing_names(&self, candidates: &[String]) -> StorageResult<HashSet<String>>;

    /// Returns the names of all nodes matching `filter`
    fn names_where(&self, filter: &NodeFilter) -> StorageResult<HashSet<String>>;

    /// Counts nodes matching `filter`
    fn count_where(&self, filter: &NodeFilter) -> StorageResult<u64>;

    // ===== Node Writes =====

    /// Inserts unclassified nodes for every name not already present
    ///
    /// Returns the number of nodes actually inserted. Names that already
    /// exist are left untouched.
    fn insert_many(&mut self, names: &[String]) -> StorageResult<usize>;

    /// Applies `update` to the node called `name`
    ///
    /// Fails with `InvalidTransition` if the update would move a terminal
    /// instance type to a different value, and with `NodeNotFound` if no
    /// such node exists.
    fn update_one(&mut self, name: &str, update: &NodeUpdate) -> StorageResult<()>;

    // ===== Maintenance =====

    /// Moves every node with instance type `from` back to `Unclassified`
    fn requeue_instances(&mut self, from: InstanceType) -> StorageResult<u64>;

    /// Moves every node with edge status `from` back to `NotStarted`
    fn reset_edge_status(&mut self, from: EdgeStatus) -> StorageResult<u64>;

    // ===== Run Management =====

    /// Creates a new run of `stage`
    fn create_run(&mut self, stage: Stage, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of `stage`
    fn get_latest_run(&self, stage: Stage) -> StorageResult<Option<RunRecord>>;

    /// Records the final status of a run with a finish timestamp
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;
}
