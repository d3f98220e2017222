//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Outgoing message
//!     → exchange.rs (header + payload, optional fd pass or relay)
//!     → peer
//!     → exchange.rs (receive_response feeding a ResponseParser)
//!
//! client.rs: connect / enqueue / one-shot request-response over TCP
//! udp.rs: single-datagram frames
//! fdpass.rs: SCM_RIGHTS ancillary data on Unix sockets
//! ```
//!
//! # Design Decisions
//! - Every wait is a `tokio::time::timeout`; there are no unbounded reads
//! - Callers own the sockets; helpers never close what they were handed

pub mod client;
pub mod exchange;
pub mod fdpass;
pub mod udp;

pub use client::{connect, enqueue_message, simple_message, simple_send_items};
pub use exchange::{
    receive_response, send_message, send_message_relay, send_message_with_fd, FrameParser, ParseStatus,
    ResponseParser,
};
pub use udp::{recv_dict_frame, recv_frame, send_empty_packet, send_frame_to, send_udp_message};
