//! Edge validation pass
//!
//! Runs after discovery over confirmed nodes whose edge status is still
//! `NotStarted`. Each node's lists are fetched again and reduced to the
//! neighbors that are confirmed in a snapshot taken once, at start.

use crate::config::Config;
use crate::crawler::{collect_lists, CollectedLists, Fetcher};
use crate::shutdown::Shutdown;
use crate::state::{EdgeStatus, InstanceType, NodeError, Phase};
use crate::storage::{NodeFilter, NodeUpdate, RunStatus, SharedStorage, Stage, Storage};
use crate::FedimapError;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{BTreeSet, HashSet};

/// Totals for a validation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub snapshot_size: usize,
    pub rounds: u32,
    pub processed: u64,
    pub success: u64,
    pub peers_unreachable: u64,
    pub blocklist_unreachable: u64,
    pub failed: u64,
    pub interrupted: bool,
}

impl ValidationReport {
    fn record(&mut self, status: EdgeStatus) {
        self.processed += 1;
        match status {
            EdgeStatus::Success => self.success += 1,
            EdgeStatus::PeersUnreachable => self.peers_unreachable += 1,
            EdgeStatus::BlocklistUnreachable => self.blocklist_unreachable += 1,
            EdgeStatus::Error => self.failed += 1,
            // Never produced by validation
            EdgeStatus::NotStarted => {}
        }
    }
}

/// Computes `(peers - blocked - {name}) ∩ snapshot`
pub fn valid_neighbors(
    name: &str,
    peers: &BTreeSet<String>,
    blocked: &BTreeSet<String>,
    snapshot: &HashSet<String>,
) -> BTreeSet<String> {
    peers
        .iter()
        .filter(|peer| peer.as_str() != name)
        .filter(|peer| !blocked.contains(*peer))
        .filter(|peer| snapshot.contains(*peer))
        .cloned()
        .collect()
}

/// Edge status for a collection outcome; a peers failure takes precedence
pub fn edge_status_for(lists: &CollectedLists) -> EdgeStatus {
    if lists.peers_failed() {
        EdgeStatus::PeersUnreachable
    } else if lists.blocks_failed() {
        EdgeStatus::BlocklistUnreachable
    } else {
        EdgeStatus::Success
    }
}

/// Validates the edges of confirmed nodes against a confirmed snapshot
pub struct EdgeValidator<S> {
    store: SharedStorage<S>,
    fetcher: Fetcher,
    batch_size: usize,
    concurrency: usize,
    config_hash: String,
    shutdown: Shutdown,
}

impl<S: Storage> EdgeValidator<S> {
    pub fn new(config: &Config, store: S, config_hash: &str) -> Result<Self, FedimapError> {
        Ok(Self {
            store: SharedStorage::new(store),
            fetcher: Fetcher::new(&config.fetch, &config.user_agent)?,
            batch_size: config.crawler.batch_size as usize,
            concurrency: config.crawler.concurrency as usize,
            config_hash: config_hash.to_string(),
            shutdown: Shutdown::never(),
        })
    }

    /// Stops dispatching new nodes once `shutdown` fires
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Returns the store
    pub fn into_store(self) -> Result<S, FedimapError> {
        self.store.into_inner()
    }

    /// Validates every pending confirmed node
    pub async fn run(&self) -> Result<ValidationReport, FedimapError> {
        let run_id = self
            .store
            .with(|store| store.create_run(Stage::Validate, &self.config_hash))?;
        tracing::info!("Starting validation run {}", run_id);

        let result = self.drain().await;

        let status = match &result {
            Ok(report) if report.interrupted => RunStatus::Interrupted,
            Ok(_) => RunStatus::Completed,
            Err(_) => RunStatus::Failed,
        };
        let finished = self.store.with(|store| store.finish_run(run_id, status));

        let report = result?;
        finished?;
        Ok(report)
    }

    async fn drain(&self) -> Result<ValidationReport, FedimapError> {
        let snapshot = self
            .store
            .with(|store| store.names_where(&NodeFilter::instance_type(InstanceType::Confirmed)))?;
        tracing::info!("Confirmed snapshot holds {} nodes", snapshot.len());

        let mut report = ValidationReport {
            snapshot_size: snapshot.len(),
            ..ValidationReport::default()
        };

        let pending = NodeFilter::instance_type(InstanceType::Confirmed)
            .with_edge_status(EdgeStatus::NotStarted);

        loop {
            if self.shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            let batch = self
                .store
                .with(|store| store.find_batch(&pending, Some(self.batch_size)))?;
            if batch.is_empty() {
                tracing::info!("All confirmed nodes validated");
                break;
            }

            report.rounds += 1;
            tracing::info!(
                "Starting validation round {} with {} nodes",
                report.rounds,
                batch.len()
            );

            stream::iter(batch.iter())
                .take_while(|_| futures::future::ready(!self.shutdown.is_triggered()))
                .map(|node| self.validate_node(&node.name, &snapshot))
                .buffer_unordered(self.concurrency)
                .try_for_each(|status| {
                    report.record(status);
                    futures::future::ready(Ok(()))
                })
                .await?;
        }

        Ok(report)
    }

    /// Validates one node and records its edge status
    pub async fn validate_node(
        &self,
        name: &str,
        snapshot: &HashSet<String>,
    ) -> Result<EdgeStatus, FedimapError> {
        match self.try_validate(name, snapshot).await {
            Ok(status) => {
                tracing::debug!("{}: {}", status, name);
                Ok(status)
            }
            Err(e) => {
                tracing::warn!("Failed to validate {}: {}", name, e);
                let update = NodeUpdate {
                    edge_col_status: Some(EdgeStatus::Error),
                    errors: Some(vec![NodeError::critical(Phase::Validate, &e)]),
                    ..NodeUpdate::default()
                };
                self.store.with(|store| store.update_one(name, &update))?;
                Ok(EdgeStatus::Error)
            }
        }
    }

    async fn try_validate(
        &self,
        name: &str,
        snapshot: &HashSet<String>,
    ) -> Result<EdgeStatus, FedimapError> {
        let lists = collect_lists(&self.fetcher, name).await;
        let status = edge_status_for(&lists);

        // A failed endpoint contributes an empty list
        let empty = BTreeSet::new();
        let valid = valid_neighbors(
            name,
            lists.peers.as_ref().unwrap_or(&empty),
            lists.blocked.as_ref().unwrap_or(&empty),
            snapshot,
        );

        let update = NodeUpdate {
            valid_neighbors: Some(valid),
            edge_col_status: Some(status),
            errors: Some(lists.errors),
            ..NodeUpdate::default()
        };
        self.store.with(|store| store.update_one(name, &update))?;

        Ok(status)
    }
}
