//! Metrics collection.
//!
//! # Metrics
//! - `gateway_requests_rejected_total` (counter): requests dropped, by reason
//! - `gateway_cache_hits_total` (counter): requests answered from the cache
//! - `gateway_cache_entries` (gauge): entries held by the memory cache
//! - `gateway_static_responses_total` (counter): static file outcomes
//! - `gateway_messages_sent_total` (counter): messages forwarded to peers
//! - `gateway_node_health` (gauge): 1=ok, 0=failed, per cluster node

use metrics::{counter, gauge};

pub fn record_rejected(reason: &'static str) {
    counter!("gateway_requests_rejected_total", "reason" => reason).increment(1);
}

pub fn record_cache_hit(source: &'static str) {
    counter!("gateway_cache_hits_total", "source" => source).increment(1);
}

pub fn record_cache_size(entries: usize) {
    gauge!("gateway_cache_entries").set(entries as f64);
}

pub fn record_static(outcome: &'static str) {
    counter!("gateway_static_responses_total", "outcome" => outcome).increment(1);
}

pub fn record_message_sent(kind: &'static str) {
    counter!("gateway_messages_sent_total", "kind" => kind).increment(1);
}

pub fn record_node_health(node: &str, healthy: bool) {
    gauge!("gateway_node_health", "node" => node.to_string()).set(if healthy { 1.0 } else { 0.0 });
}
