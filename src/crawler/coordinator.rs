//! Crawl driver - round-based discovery loop
//!
//! Each round pulls a bounded batch of unclassified nodes from the store and
//! takes every node through classification, list collection and discovery
//! expansion before re-querying the frontier. The crawl ends when a round
//! comes back empty.
//!
//! A node only leaves `Unclassified` through its final update, so a crash or
//! shutdown mid-round leaves the rest of the batch resumable as-is.

use crate::config::Config;
use crate::crawler::classifier::classify_node;
use crate::crawler::collector::collect_lists;
use crate::crawler::expander::expand;
use crate::crawler::Fetcher;
use crate::shutdown::Shutdown;
use crate::state::{EdgeStatus, InstanceType, NodeError, Phase};
use crate::storage::{NodeFilter, NodeUpdate, RunStatus, SharedStorage, Stage, Storage};
use crate::url::normalize_node_name;
use crate::FedimapError;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;

/// Result of processing one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Confirmed; `partial` when one of the lists could not be fetched
    Confirmed { discovered: usize, partial: bool },
    NotOfProtocol,
    /// Unexpected failure recorded as `InstanceType::Error`
    Failed,
}

/// Totals for a crawl run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlReport {
    pub rounds: u32,
    pub processed: u64,
    pub confirmed: u64,
    pub partial: u64,
    pub not_of_protocol: u64,
    pub failed: u64,
    pub discovered: u64,
    pub seeded: u64,
    pub interrupted: bool,
}

impl CrawlReport {
    fn record(&mut self, outcome: NodeOutcome) {
        self.processed += 1;
        match outcome {
            NodeOutcome::Confirmed {
                discovered,
                partial,
            } => {
                self.confirmed += 1;
                self.discovered += discovered as u64;
                if partial {
                    self.partial += 1;
                }
            }
            NodeOutcome::NotOfProtocol => self.not_of_protocol += 1,
            NodeOutcome::Failed => self.failed += 1,
        }
    }
}

/// Drives discovery over a store
pub struct CrawlDriver<S> {
    store: SharedStorage<S>,
    fetcher: Fetcher,
    protocol: String,
    batch_size: usize,
    concurrency: usize,
    seeds: Vec<String>,
    config_hash: String,
    shutdown: Shutdown,
}

impl<S: Storage> CrawlDriver<S> {
    /// Creates a driver over `store`
    pub fn new(config: &Config, store: S, config_hash: &str) -> Result<Self, FedimapError> {
        Ok(Self {
            store: SharedStorage::new(store),
            fetcher: Fetcher::new(&config.fetch, &config.user_agent)?,
            protocol: config.protocol.name.clone(),
            batch_size: config.crawler.batch_size as usize,
            concurrency: config.crawler.concurrency as usize,
            seeds: config.crawler.seeds.clone(),
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

    /// Inserts the configured seeds if the store holds no nodes at all
    pub fn seed_if_empty(&self) -> Result<usize, FedimapError> {
        let seeds: Vec<String> = self
            .seeds
            .iter()
            .filter_map(|s| normalize_node_name(s))
            .collect();

        self.store.with(|store| {
            if store.count_where(&NodeFilter::all())? > 0 {
                return Ok(0);
            }
            store.insert_many(&seeds)
        })
    }

    /// Runs rounds until the frontier is empty or shutdown is requested
    ///
    /// Only store failures that cannot be recorded against a node end the run
    /// early; the run is then marked failed.
    pub async fn run(&self) -> Result<CrawlReport, FedimapError> {
        let run_id = self
            .store
            .with(|store| store.create_run(Stage::Crawl, &self.config_hash))?;
        tracing::info!("Starting crawl run {}", run_id);

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

    async fn drain(&self) -> Result<CrawlReport, FedimapError> {
        let start_time = Instant::now();
        let mut report = CrawlReport {
            seeded: self.seed_if_empty()? as u64,
            ..CrawlReport::default()
        };
        if report.seeded > 0 {
            tracing::info!("Inserted {} seeds", report.seeded);
        }

        let frontier = NodeFilter::instance_type(InstanceType::Unclassified);

        loop {
            if self.shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            let batch = self
                .store
                .with(|store| store.find_batch(&frontier, Some(self.batch_size)))?;
            if batch.is_empty() {
                tracing::info!("Frontier is empty, crawl complete");
                break;
            }

            report.rounds += 1;
            tracing::info!(
                "Starting round {} with {} nodes",
                report.rounds,
                batch.len()
            );

            // Round barrier: every dispatched node finishes before the next query
            stream::iter(batch.iter())
                .take_while(|_| futures::future::ready(!self.shutdown.is_triggered()))
                .map(|node| self.process_node(&node.name))
                .buffer_unordered(self.concurrency)
                .try_for_each(|outcome| {
                    report.record(outcome);
                    futures::future::ready(Ok(()))
                })
                .await?;

            tracing::info!(
                "Round {} done: {} processed so far ({} confirmed, {} new nodes) in {:?}",
                report.rounds,
                report.processed,
                report.confirmed,
                report.discovered,
                start_time.elapsed()
            );
        }

        Ok(report)
    }

    /// Processes one node to completion
    ///
    /// Unexpected failures are recorded on the node as `Error` and reported
    /// as `NodeOutcome::Failed`. An `Err` means the failure could not even be
    /// recorded, which is fatal for the run.
    pub async fn process_node(&self, name: &str) -> Result<NodeOutcome, FedimapError> {
        match self.try_process(name).await {
            Ok(outcome) => {
                tracing::debug!("{}: {:?}", name, outcome);
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("Failed to process {}: {}", name, e);
                let update = NodeUpdate {
                    instance_type: Some(InstanceType::Error),
                    errors: Some(vec![NodeError::critical(Phase::Crawl, &e)]),
                    ..NodeUpdate::default()
                };
                self.store.with(|store| store.update_one(name, &update))?;
                Ok(NodeOutcome::Failed)
            }
        }
    }

    async fn try_process(&self, name: &str) -> Result<NodeOutcome, FedimapError> {
        let instance_type = classify_node(&self.fetcher, &self.protocol, name).await;

        if instance_type != InstanceType::Confirmed {
            let update = NodeUpdate {
                instance_type: Some(instance_type),
                errors: Some(Vec::new()),
                ..NodeUpdate::default()
            };
            self.store.with(|store| store.update_one(name, &update))?;
            return Ok(NodeOutcome::NotOfProtocol);
        }

        let lists = collect_lists(&self.fetcher, name).await;
        let partial = !lists.errors.is_empty();
        let candidates = lists.candidates();

        // Expansion happens before the final update, so a crash in between
        // leaves the node unclassified and the expansion is simply repeated.
        let update = NodeUpdate {
            instance_type: Some(InstanceType::Confirmed),
            peers: lists.peers,
            blocked: lists.blocked,
            edge_col_status: Some(EdgeStatus::NotStarted),
            errors: Some(lists.errors),
            ..NodeUpdate::default()
        };
        let expansion = self.store.with(|store| {
            let expansion = expand(store, &candidates)?;
            store.update_one(name, &update)?;
            Ok(expansion)
        })?;

        Ok(NodeOutcome::Confirmed {
            discovered: expansion.inserted,
            partial,
        })
    }
}
