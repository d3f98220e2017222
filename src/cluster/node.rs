//! Cluster node records.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::config::NodeConfig;

/// Node status.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unknown = 0,
    Ok = 1,
    Failed = 2,
}

impl From<u8> for NodeStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => NodeStatus::Ok,
            2 => NodeStatus::Failed,
            _ => NodeStatus::Unknown,
        }
    }
}

/// A single cluster node.
#[derive(Debug)]
pub struct ClusterNode {
    /// Empty for an unused slot.
    pub name: String,
    /// "host:port" of the node's uwsgi socket.
    pub address: String,
    status: AtomicU8,
}

impl ClusterNode {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            status: AtomicU8::new(NodeStatus::Unknown as u8),
        }
    }

    pub fn status(&self) -> NodeStatus {
        NodeStatus::from(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: NodeStatus) {
        let prev = NodeStatus::from(self.status.swap(status as u8, Ordering::AcqRel));
        if prev != status {
            tracing::info!(node = %self.name, from = ?prev, to = ?status, "node status changed");
        }
    }

    pub fn mark_ok(&self) {
        self.set_status(NodeStatus::Ok);
    }

    pub fn mark_failed(&self) {
        self.set_status(NodeStatus::Failed);
    }

    pub fn is_ok(&self) -> bool {
        self.status() == NodeStatus::Ok
    }

    /// True for an unnamed slot.
    pub fn is_vacant(&self) -> bool {
        self.name.is_empty()
    }
}

/// The shared node table.
#[derive(Debug, Default)]
pub struct ClusterNodes {
    nodes: Vec<Arc<ClusterNode>>,
}

impl ClusterNodes {
    pub fn from_config(configs: &[NodeConfig]) -> Self {
        Self {
            nodes: configs
                .iter()
                .map(|c| Arc::new(ClusterNode::new(c.name.clone(), c.address.clone())))
                .collect(),
        }
    }

    pub fn all(&self) -> &[Arc<ClusterNode>] {
        &self.nodes
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ClusterNode>> {
        self.nodes.iter().find(|n| !n.is_vacant() && n.name == name)
    }

    /// Nodes currently marked healthy.
    pub fn healthy(&self) -> impl Iterator<Item = &Arc<ClusterNode>> {
        self.nodes.iter().filter(|n| n.is_ok())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
