//! Statistics generation from the node database
//!
//! This module provides functionality for extracting and displaying
//! crawl and validation statistics from the storage layer.

use crate::state::{EdgeStatus, InstanceType};
use crate::storage::{NodeFilter, RunRecord, Stage, Storage};
use crate::FedimapError;

/// Node statistics summary
#[derive(Debug, Clone)]
pub struct NodeStatistics {
    /// Total number of nodes known to the store
    pub total_nodes: u64,

    /// Count of nodes per instance type, in declaration order
    pub nodes_by_type: Vec<(InstanceType, u64)>,

    /// Count of confirmed nodes per edge status, in declaration order
    pub edges_by_status: Vec<(EdgeStatus, u64)>,

    /// Latest run of each stage
    pub latest_crawl: Option<RunRecord>,

    pub latest_validation: Option<RunRecord>,
}

impl NodeStatistics {
    pub fn count_of_type(&self, instance_type: InstanceType) -> u64 {
        self.nodes_by_type
            .iter()
            .find(|(t, _)| *t == instance_type)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn count_of_status(&self, status: EdgeStatus) -> u64 {
        self.edges_by_status
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

/// Loads statistics from storage
pub fn load_statistics<S: Storage + ?Sized>(storage: &S) -> Result<NodeStatistics, FedimapError> {
    let total_nodes = storage.count_where(&NodeFilter::all())?;

    let mut nodes_by_type = Vec::new();
    for instance_type in InstanceType::all_types() {
        let count = storage.count_where(&NodeFilter::instance_type(instance_type))?;
        nodes_by_type.push((instance_type, count));
    }

    let mut edges_by_status = Vec::new();
    for status in EdgeStatus::all_statuses() {
        let filter = NodeFilter::instance_type(InstanceType::Confirmed).with_edge_status(status);
        edges_by_status.push((status, storage.count_where(&filter)?));
    }

    Ok(NodeStatistics {
        total_nodes,
        nodes_by_type,
        edges_by_status,
        latest_crawl: storage.get_latest_run(Stage::Crawl)?,
        latest_validation: storage.get_latest_run(Stage::Validate)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &NodeStatistics) {
    println!("=== Node Statistics ===\n");

    println!("Overview:");
    println!("  Total nodes known: {}", stats.total_nodes);
    println!();

    println!("Nodes by Type:");
    for (instance_type, count) in &stats.nodes_by_type {
        let percentage = if stats.total_nodes > 0 {
            (*count as f64 / stats.total_nodes as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", instance_type, count, percentage);
    }
    println!();

    let confirmed = stats.count_of_type(InstanceType::Confirmed);
    println!("Edge Validation ({} confirmed):", confirmed);
    for (status, count) in &stats.edges_by_status {
        println!("  {}: {}", status, count);
    }
    println!();

    for (label, run) in [
        ("Latest crawl", &stats.latest_crawl),
        ("Latest validation", &stats.latest_validation),
    ] {
        match run {
            Some(run) => println!(
                "{}: run {} {} (started {}, finished {})",
                label,
                run.id,
                run.status.to_db_string(),
                run.started_at,
                run.finished_at.as_deref().unwrap_or("-")
            ),
            None => println!("{}: never", label),
        }
    }
}
