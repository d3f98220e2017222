//! Node liveness ping.

use crate::cluster::node::ClusterNode;
use crate::net::client::connect;
use crate::net::exchange::{receive_response, send_message, FrameParser};
use crate::protocol::header::{MAX_PAYLOAD_SIZE, MODIFIER_PING};

/// Result of [`ping_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingOutcome {
    /// The node answered.
    Ok,
    /// Already healthy; not probed.
    AlreadyOk,
    /// Unnamed slot; not probed.
    Vacant,
    /// Connect, send or receive failed.
    Unreachable,
}

/// Pings `node` with an empty frame tagged [`MODIFIER_PING`].
///
/// Any well-formed response frame counts as alive; its content is ignored.
/// The node's status is left to the caller.
pub async fn ping_node(node: &ClusterNode, timeout_secs: u64) -> PingOutcome {
    if node.is_vacant() {
        return PingOutcome::Vacant;
    }
    if node.is_ok() {
        return PingOutcome::AlreadyOk;
    }

    let result = async {
        let mut stream = connect(&node.address, timeout_secs).await?;
        send_message(&mut stream, MODIFIER_PING, 0, &[]).await?;
        let mut parser = FrameParser::new(MAX_PAYLOAD_SIZE);
        receive_response(&mut stream, timeout_secs, &mut parser).await
    }
    .await;

    match result {
        Ok(()) => {
            tracing::debug!(node = %node.name, "ping answered");
            PingOutcome::Ok
        }
        Err(e) => {
            tracing::warn!(node = %node.name, addr = %node.address, error = %e, "ping failed");
            PingOutcome::Unreachable
        }
    }
}
