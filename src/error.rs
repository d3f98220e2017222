//! Error types for the wire layer.
//!
//! Every per-request decode error aborts only the request that produced it.
//! Connection-level errors abort the outstanding call; closing the channel is
//! left to the caller.

use thiserror::Error;

/// Errors raised while framing, decoding or exchanging uwsgi messages.
#[derive(Debug, Error)]
pub enum WireError {
    /// Frame header is short or declares more payload than the buffer allows.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A length prefix declares more bytes than remain in the buffer.
    #[error("truncated item: declared {declared} bytes, {remaining} remaining")]
    TruncatedItem { declared: usize, remaining: usize },

    /// Dictionary key with zero length.
    #[error("dictionary key cannot be empty")]
    EmptyKey,

    /// The request variable table is full.
    #[error("variable table capacity of {capacity} slots exceeded")]
    CapacityExceeded { capacity: usize },

    /// CONTENT_LENGTH above the configured body limit.
    #[error("request body of {size} bytes exceeds limit of {limit}")]
    BodyTooLarge { size: u64, limit: u64 },

    /// `UWSGI_SETENV` value without a `=` separator.
    #[error("invalid UWSGI_SETENV value")]
    InvalidSetenv,

    /// Outgoing message does not fit the frame or datagram.
    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Deadline elapsed while waiting on a socket.
    #[error("timed out after {0} seconds")]
    Timeout(u64),

    /// Could not connect to the remote peer.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Resolved file path escapes the document root.
    #[error("security error: {path} is not under {root}")]
    SecurityError { path: String, root: String },

    /// Malformed date or FastCGI record, or a peer response the parser rejected.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Datagram carried different modifiers than expected.
    #[error("unexpected modifiers {modifier1}/{modifier2}")]
    UnexpectedModifiers { modifier1: u8, modifier2: u8 },

    /// Socket or file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WireError::MalformedFrame(_) => "malformed_frame",
            WireError::TruncatedItem { .. } => "truncated_item",
            WireError::EmptyKey => "empty_key",
            WireError::CapacityExceeded { .. } => "capacity_exceeded",
            WireError::BodyTooLarge { .. } => "body_too_large",
            WireError::InvalidSetenv => "invalid_setenv",
            WireError::MessageTooLarge { .. } => "message_too_large",
            WireError::Timeout(_) => "timeout",
            WireError::ConnectFailed { .. } => "connect_failed",
            WireError::SecurityError { .. } => "security_error",
            WireError::ParseError(_) => "parse_error",
            WireError::UnexpectedModifiers { .. } => "unexpected_modifiers",
            WireError::Io(_) => "io",
        }
    }
}

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_sizes() {
        let err = WireError::TruncatedItem { declared: 10, remaining: 3 };
        assert_eq!(err.to_string(), "truncated item: declared 10 bytes, 3 remaining");
        assert_eq!(err.kind(), "truncated_item");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: WireError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
