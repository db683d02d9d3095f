//! Edge derivation
//!
//! The second pass of the pipeline:
//! - Validating each confirmed node's neighbors against a confirmed snapshot
//! - Materializing the validated neighbors into a canonical edge list

mod materializer;
mod validator;

pub use materializer::{derive_edges, materialize_edges, write_edges, Edge, MaterializeReport};
pub use validator::{edge_status_for, valid_neighbors, EdgeValidator, ValidationReport};

use crate::config::Config;
use crate::shutdown::Shutdown;
use crate::storage::SqliteStorage;
use crate::FedimapError;
use std::path::Path;

/// Runs the validation pass against the configured database
pub async fn validate(
    config: &Config,
    config_hash: &str,
    shutdown: Shutdown,
) -> Result<ValidationReport, FedimapError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let validator = EdgeValidator::new(config, storage, config_hash)?.with_shutdown(shutdown);
    validator.run().await
}

/// Writes the configured edge file from the configured database
pub fn export(config: &Config) -> Result<MaterializeReport, FedimapError> {
    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    materialize_edges(&storage, Path::new(&config.output.edges_path))
}
