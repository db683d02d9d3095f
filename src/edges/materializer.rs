//! Edge list materialization
//!
//! Reads validated nodes and writes a deduplicated undirected edge list,
//! one `<a> <b>` pair per line with `a < b`. The file is rebuilt from scratch
//! on every run.

use crate::state::EdgeStatus;
use crate::storage::{NodeFilter, NodeRecord, Storage};
use crate::FedimapError;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// An undirected edge with its endpoints in lexicographic order
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Edge {
    a: String,
    b: String,
}

impl Edge {
    /// Canonical edge between two names; `None` for a self-loop
    pub fn new(x: &str, y: &str) -> Option<Self> {
        match x.cmp(y) {
            std::cmp::Ordering::Less => Some(Self {
                a: x.to_string(),
                b: y.to_string(),
            }),
            std::cmp::Ordering::Greater => Some(Self {
                a: y.to_string(),
                b: x.to_string(),
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn a(&self) -> &str {
        &self.a
    }

    pub fn b(&self) -> &str {
        &self.b
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.a, self.b)
    }
}

/// Summary of one materialization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    /// Nodes with a successful validation
    pub nodes: usize,
    pub edges: usize,
    pub path: PathBuf,
}

/// Derives the edge set from validated nodes
///
/// Only nodes passed in count as valid endpoints: a neighbor that is not
/// itself among `nodes` is dropped.
pub fn derive_edges(nodes: &[NodeRecord]) -> BTreeSet<Edge> {
    let valid_names: HashSet<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    let mut edges = BTreeSet::new();

    for node in nodes {
        for neighbor in &node.valid_neighbors {
            if !valid_names.contains(neighbor.as_str()) {
                continue;
            }
            if let Some(edge) = Edge::new(&node.name, neighbor) {
                edges.insert(edge);
            }
        }
    }

    edges
}

/// Writes `edges` to `path`, replacing any previous file
///
/// The list goes to a sibling temporary file first and is renamed into
/// place, so readers never see a half-written list.
pub fn write_edges(edges: &BTreeSet<Edge>, path: &Path) -> Result<(), FedimapError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut writer = BufWriter::new(fs::File::create(&tmp)?);
        for edge in edges {
            writeln!(writer, "{}", edge)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;

    Ok(())
}

/// Materializes the edge list of every successfully validated node
pub fn materialize_edges<S: Storage + ?Sized>(
    storage: &S,
    path: &Path,
) -> Result<MaterializeReport, FedimapError> {
    let nodes = storage.find_batch(&NodeFilter::edge_status(EdgeStatus::Success), None)?;
    let edges = derive_edges(&nodes);

    write_edges(&edges, path)?;
    tracing::info!(
        "Wrote {} edges between {} nodes to {}",
        edges.len(),
        nodes.len(),
        path.display()
    );

    Ok(MaterializeReport {
        nodes: nodes.len(),
        edges: edges.len(),
        path: path.to_path_buf(),
    })
}
