//! uwsgi gateway wire layer.
//!
//! Framing, request decoding, static file serving and message exchange for
//! the uwsgi binary protocol, plus a FastCGI record encoder.

// Wire format
pub mod protocol;

// Request handling
pub mod env;
pub mod request;
pub mod statics;

// Output and transport
pub mod http;
pub mod net;

// Cluster
pub mod cluster;

// Cross-cutting concerns
pub mod cache;
pub mod config;
pub mod error;
pub mod observability;

pub use cache::{MemoryCache, ResponseCache};
pub use config::GatewayConfig;
pub use error::{WireError, WireResult};
pub use protocol::FrameHeader;
pub use request::{Disposition, Request, RequestPipeline, VarTable};
