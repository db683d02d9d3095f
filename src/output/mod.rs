//! Output module for reporting on the node database
//!
//! This module handles:
//! - Counting nodes by classification and edge status
//! - Printing statistics for the `--stats` mode

pub mod stats;

pub use stats::{load_statistics, print_statistics, NodeStatistics};
