//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer size, slot budget)
//! - Check mountpoints and node addresses are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.buffer_size == 0 {
        errors.push(ValidationError::new("buffer_size", "must be greater than 0"));
    }

    // A request needs at least one key/value pair.
    if config.vars.max_slots < 2 {
        errors.push(ValidationError::new("vars.max_slots", "must be at least 2"));
    }

    if config.limits.post_buffering > 0 && config.limits.post_buffering_bufsize == 0 {
        errors.push(ValidationError::new(
            "limits.post_buffering_bufsize",
            "must be greater than 0 when post buffering is enabled",
        ));
    }

    for (i, map) in config.static_files.static_maps.iter().enumerate() {
        if !map.mountpoint.starts_with('/') {
            errors.push(ValidationError::new(
                format!("static_files.static_maps[{}].mountpoint", i),
                "must start with '/'",
            ));
        }
        if map.document_root.is_empty() {
            errors.push(ValidationError::new(
                format!("static_files.static_maps[{}].document_root", i),
                "must not be empty",
            ));
        }
    }

    if let Some(dir) = &config.static_files.check_static {
        if dir.is_empty() {
            errors.push(ValidationError::new("static_files.check_static", "must not be empty"));
        }
    }

    for (i, app) in config.apps.iter().enumerate() {
        if !app.mountpoint.starts_with('/') {
            errors.push(ValidationError::new(
                format!("apps[{}].mountpoint", i),
                "must start with '/'",
            ));
        }
    }

    for (i, node) in config.cluster.nodes.iter().enumerate() {
        if node.address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                format!("cluster.nodes[{}].address", i),
                format!("invalid socket address '{}'", node.address),
            ));
        }
    }

    if config.cluster.ping_interval_secs == 0 {
        errors.push(ValidationError::new("cluster.ping_interval_secs", "must be greater than 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
