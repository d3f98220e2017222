//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into read-only tables (static maps, mount table)
//!     → shared via Arc with the request pipeline and cluster monitor
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; every component receives it explicitly
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AppMountConfig;
pub use schema::ClusterConfig;
pub use schema::FileServeMode;
pub use schema::GatewayConfig;
pub use schema::NodeConfig;
pub use schema::StaticMapConfig;
