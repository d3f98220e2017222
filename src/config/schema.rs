//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway wire layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Largest accepted frame payload in bytes.
    pub buffer_size: u16,

    /// Request variable table settings.
    pub vars: VarsConfig,

    /// Request body limits and buffering.
    pub limits: LimitsConfig,

    /// Response cache lookups.
    pub cache: CacheConfig,

    /// Static file serving.
    pub static_files: StaticFilesConfig,

    /// Application mountpoints used for SCRIPT_NAME/PATH_INFO rewriting.
    pub apps: Vec<AppMountConfig>,

    /// Cluster membership and health checks.
    pub cluster: ClusterConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            buffer_size: 4096,
            vars: VarsConfig::default(),
            limits: LimitsConfig::default(),
            cache: CacheConfig::default(),
            static_files: StaticFilesConfig::default(),
            apps: Vec::new(),
            cluster: ClusterConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Request variable table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VarsConfig {
    /// Maximum number of slots (a key and its value take two).
    pub max_slots: usize,

    /// Select the host from HTTP_HOST instead of SERVER_NAME.
    pub vhost_host: bool,

    /// Rewrite SCRIPT_NAME/PATH_INFO from the application mount table.
    pub manage_script_name: bool,
}

impl Default for VarsConfig {
    fn default() -> Self {
        Self {
            max_slots: 128,
            vhost_host: false,
            manage_script_name: false,
        }
    }
}

/// Request body limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum CONTENT_LENGTH accepted (0 = unlimited).
    pub limit_post: u64,

    /// Bodies at or above this size are spilled to a temporary file
    /// (0 disables body buffering).
    pub post_buffering: u64,

    /// Chunk size used while reading a buffered body.
    pub post_buffering_bufsize: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            limit_post: 0,
            post_buffering: 0,
            post_buffering_bufsize: 8192,
        }
    }
}

/// Response cache configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Honour the UWSGI_CACHE_GET request variable.
    pub enabled: bool,

    /// Serve GET requests straight from the cache keyed by REQUEST_URI.
    pub check_cache: bool,
}

/// How a found static file is handed back to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileServeMode {
    /// Stream the file body from this process.
    #[default]
    Passthrough,
    /// Emit an `X-Accel-Redirect` header for the front end to follow.
    XAccelRedirect,
    /// Emit an `X-Sendfile` header for the front end to follow.
    XSendfile,
}

/// Static file serving configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Delivery strategy for found files.
    pub file_serve_mode: FileServeMode,

    /// Directory checked for every PATH_INFO before the static maps.
    pub check_static: Option<String>,

    /// Mountpoint to document root mappings, consulted in order.
    pub static_maps: Vec<StaticMapConfig>,

    /// Header lines appended verbatim to every static response.
    pub additional_headers: Vec<String>,
}

/// A single static map entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticMapConfig {
    /// PATH_INFO prefix (e.g., "/static").
    pub mountpoint: String,

    /// Directory the rest of the path is resolved under.
    pub document_root: String,
}

/// An application mountpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppMountConfig {
    /// SCRIPT_NAME prefix owned by the application (e.g., "/app").
    pub mountpoint: String,
}

/// Cluster configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Known cluster nodes.
    pub nodes: Vec<NodeConfig>,

    /// Interval between health check rounds in seconds.
    pub ping_interval_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            ping_interval_secs: 10,
        }
    }
}

/// A single cluster node.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeConfig {
    /// Node name; an empty name marks an unused slot.
    pub name: String,

    /// Node address (e.g., "10.0.0.2:3031").
    pub address: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Socket timeout in seconds for connects, polls and relays.
    pub socket_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { socket_secs: 4 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
