//! Periodic cluster health checks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::cluster::node::ClusterNodes;
use crate::cluster::ping::{ping_node, PingOutcome};
use crate::config::ClusterConfig;
use crate::observability::metrics;

pub struct ClusterMonitor {
    nodes: Arc<ClusterNodes>,
    interval: Duration,
    timeout_secs: u64,
}

impl ClusterMonitor {
    pub fn new(nodes: Arc<ClusterNodes>, config: &ClusterConfig, timeout_secs: u64) -> Self {
        Self {
            nodes,
            interval: Duration::from_secs(config.ping_interval_secs.max(1)),
            timeout_secs,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.nodes.is_empty() {
            tracing::info!("No cluster nodes configured, monitor not started");
            return;
        }

        tracing::info!(
            nodes = self.nodes.len(),
            interval_secs = self.interval.as_secs(),
            "Cluster monitor starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Cluster monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Pings every node once and applies the results.
    pub async fn check_all(&self) {
        for node in self.nodes.all() {
            match ping_node(node, self.timeout_secs).await {
                PingOutcome::Ok => {
                    node.mark_ok();
                    metrics::record_node_health(&node.name, true);
                }
                PingOutcome::Unreachable => {
                    node.mark_failed();
                    metrics::record_node_health(&node.name, false);
                }
                PingOutcome::AlreadyOk | PingOutcome::Vacant => {}
            }
        }
    }
}
