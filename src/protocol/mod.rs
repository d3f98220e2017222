//! Wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Socket bytes
//!     → header.rs (4-byte frame header: modifier1, LE length, modifier2)
//!     → tlv.rs (payload as array or key/value dictionary)
//!     → request variable table / caller hook
//!
//! fastcgi.rs: independent record/parameter encoder for FastCGI peers
//! ```
//!
//! # Design Decisions
//! - Little-endian lengths regardless of host byte order (to_le/from_le on both paths)
//! - Decoders borrow from the receive buffer and never read past it
//! - Oversized outgoing data is an error, never silently truncated

pub mod fastcgi;
pub mod header;
pub mod tlv;

pub use header::{encode_frame, FrameHeader, HEADER_SIZE, MODIFIER_PING};
pub use tlv::{decode_array, decode_dict, encode_dict, encode_item, parse_dict, DictIter};
