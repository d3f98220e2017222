//! Request decoding subsystem.
//!
//! # Data Flow
//! ```text
//! frame payload (borrowed)
//!     → vars.rs (pairs into slots, well-known fields via keys.rs)
//!     → body.rs (optional body buffering)
//!     → mount.rs (SCRIPT_NAME / PATH_INFO split)
//!     → pipeline.rs (cache and static short-circuits)
//! ```
//!
//! # Design Decisions
//! - The table lives exactly as long as the receive buffer it borrows
//! - Configuration is compiled once into read-only tables shared by all requests
//! - Process environment changes go through an `EnvironmentSink`

pub mod body;
pub mod keys;
pub mod mount;
pub mod pipeline;
pub mod vars;

pub use body::{read_body, BodyOptions, RequestBody};
pub use keys::WellKnownKey;
pub use mount::MountTable;
pub use pipeline::{Disposition, Request, RequestPipeline};
pub use vars::{parse_content_length, BuildOptions, RequestVars, VarTable};
