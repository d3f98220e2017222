//! Static file short-circuit.
//!
//! # Data Flow
//! ```text
//! PATH_INFO
//!     → map.rs (check-static root, then static maps in registration order)
//!     → serve.rs (resolve, contain, 304 / 200 + delivery strategy)
//!     → ResponseSink
//! ```
//!
//! # Design Decisions
//! - Document roots are canonicalized once when the tables are built
//! - Containment is checked on path components, so `/srv/www2` is not under `/srv/www`
//! - A file escaping its root is never opened

pub mod map;
pub mod serve;

pub use map::{StaticMap, StaticMapTable, StaticRoot};
pub use serve::{serve_file, ServeContext, ServeOutcome};
