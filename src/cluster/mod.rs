//! Cluster membership health.
//!
//! # Responsibilities
//! - Hold the shared node table with per-node status
//! - Ping nodes that are not known to be healthy
//! - Periodically apply ping results until shutdown
//!
//! # Design Decisions
//! - Status is an atomic per node; readers never lock
//! - `ping_node` only reports; the caller applies the status change
//! - Healthy nodes are not probed; request failures mark them failed

pub mod monitor;
pub mod node;
pub mod ping;

pub use monitor::ClusterMonitor;
pub use node::{ClusterNode, ClusterNodes, NodeStatus};
pub use ping::{ping_node, PingOutcome};
