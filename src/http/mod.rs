//! HTTP surface of the gateway.
//!
//! # Data Flow
//! ```text
//! Static file hit
//!     → date.rs (Last-Modified / If-Modified-Since)
//!     → response.rs (status line, headers, file body into a sink)
//!     → front end
//! ```

pub mod date;
pub mod response;

pub use date::{format_http_date, format_last_modified, parse_http_date, HTTP_DATE_LEN, LAST_MODIFIED_LEN};
pub use response::{ResponseSink, StreamSink};
