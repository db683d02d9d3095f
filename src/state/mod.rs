//! State module for tracking node progress
//!
//! This module provides the status values a node moves through during
//! discovery and edge validation.
//!
//! # Components
//!
//! - `InstanceType`: Protocol classification of a node (unclassified, confirmed, ...)
//! - `EdgeStatus`: Progress of edge validation for a confirmed node
//! - `NodeError`: Structured `{phase, message}` error records kept on a node

mod edge_status;
mod instance_type;
mod node_error;

// Re-export main types
pub use edge_status::EdgeStatus;
pub use instance_type::InstanceType;
pub use node_error::{NodeError, Phase};
