//! Storage module for persisting node records
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Node classification and edge-validation state
//! - Frontier queries by status
//! - Run tracking for the crawl and validate stages

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{EdgeStatus, InstanceType, NodeError};
use crate::FedimapError;
use std::collections::BTreeSet;
use std::sync::Mutex;

/// A store shared by the concurrent per-node tasks of one round
///
/// The lock is only ever taken inside synchronous closures, so it is never
/// held across an await point.
pub struct SharedStorage<S> {
    inner: Mutex<S>,
}

impl<S: Storage> SharedStorage<S> {
    pub fn new(storage: S) -> Self {
        Self {
            inner: Mutex::new(storage),
        }
    }

    /// Runs `f` with exclusive access to the store
    pub fn with<T>(&self, f: impl FnOnce(&mut S) -> StorageResult<T>) -> Result<T, FedimapError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| FedimapError::Unexpected("storage lock poisoned".to_string()))?;
        Ok(f(&mut *guard)?)
    }

    /// Returns the wrapped store
    pub fn into_inner(self) -> Result<S, FedimapError> {
        self.inner
            .into_inner()
            .map_err(|_| FedimapError::Unexpected("storage lock poisoned".to_string()))
    }
}

/// Represents a node in the database
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub name: String,
    pub instance_type: InstanceType,
    pub peers: BTreeSet<String>,
    pub blocked: BTreeSet<String>,
    pub valid_neighbors: BTreeSet<String>,
    pub edge_col_status: EdgeStatus,
    pub errors: Vec<NodeError>,
    pub discovered_at: String,
    pub updated_at: Option<String>,
}

/// Filter over node status fields
///
/// Unset fields match everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeFilter {
    pub instance_type: Option<InstanceType>,
    pub edge_col_status: Option<EdgeStatus>,
}

impl NodeFilter {
    /// Matches every node
    pub fn all() -> Self {
        Self::default()
    }

    pub fn instance_type(instance_type: InstanceType) -> Self {
        Self {
            instance_type: Some(instance_type),
            edge_col_status: None,
        }
    }

    pub fn edge_status(status: EdgeStatus) -> Self {
        Self {
            instance_type: None,
            edge_col_status: Some(status),
        }
    }

    pub fn with_edge_status(mut self, status: EdgeStatus) -> Self {
        self.edge_col_status = Some(status);
        self
    }
}

/// A partial update to a node; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeUpdate {
    pub instance_type: Option<InstanceType>,
    pub peers: Option<BTreeSet<String>>,
    pub blocked: Option<BTreeSet<String>>,
    pub valid_neighbors: Option<BTreeSet<String>>,
    pub edge_col_status: Option<EdgeStatus>,
    pub errors: Option<Vec<NodeError>>,
}

impl NodeUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Pipeline stage a run belongs to
///
/// Materialization is read-only over the store and is not tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Crawl,
    Validate,
}

impl Stage {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Crawl => "crawl",
            Self::Validate => "validate",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "crawl" => Some(Self::Crawl),
            "validate" => Some(Self::Validate),
            _ => None,
        }
    }
}

/// Represents a run of one pipeline stage
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub stage: Stage,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
