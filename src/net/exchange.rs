//! Message exchange over stream sockets.
//!
//! # Responsibilities
//! - Send one framed message, optionally passing a descriptor or relaying
//!   bytes from a second source
//! - Wait for a response, feeding an incremental parser until it completes
//!
//! # Design Decisions
//! - Every wait is bounded by a per-wait timeout; an elapsed wait fails the call
//! - Nothing is retried; the caller owns the channel and decides whether to close it
//! - Read errors while waiting are returned, never fatal to the process

use std::os::fd::BorrowedFd;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::{WireError, WireResult};
use crate::net::fdpass;
use crate::observability::metrics;
use crate::protocol::header::{FrameHeader, HEADER_SIZE};

/// Chunk size used when relaying and receiving.
pub const RELAY_CHUNK_SIZE: usize = 4096;

/// Socket timeout used when a send is given zero.
pub const DEFAULT_SOCKET_TIMEOUT_SECS: u64 = 4;

/// Response wait used when a receive is given zero.
pub const DEFAULT_RESPONSE_TIMEOUT_SECS: u64 = 1;

/// Writes the header then the payload; returns bytes written.
pub async fn send_message<W>(conn: &mut W, modifier1: u8, modifier2: u8, payload: &[u8]) -> WireResult<usize>
where
    W: AsyncWrite + Unpin,
{
    let header = FrameHeader::for_payload(modifier1, modifier2, payload)?;
    conn.write_all(&header.encode()).await.inspect_err(|e| {
        tracing::error!(error = %e, "write() of message header failed");
    })?;
    conn.write_all(payload).await.inspect_err(|e| {
        tracing::error!(error = %e, "write() of message payload failed");
    })?;
    metrics::record_message_sent("plain");
    Ok(HEADER_SIZE + payload.len())
}

/// Sends a message, then forwards up to `relay_len` bytes from `source`.
///
/// Each wait on `source` is bounded by `timeout_secs` (the socket default
/// when zero). Reaching EOF early is not an error: the bytes written so far
/// are returned.
pub async fn send_message_relay<W, R>(
    conn: &mut W,
    modifier1: u8,
    modifier2: u8,
    payload: &[u8],
    source: &mut R,
    relay_len: u64,
    timeout_secs: u64,
) -> WireResult<u64>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    let timeout_secs = if timeout_secs == 0 {
        DEFAULT_SOCKET_TIMEOUT_SECS
    } else {
        timeout_secs
    };
    let wait = Duration::from_secs(timeout_secs);

    let mut total = send_message(conn, modifier1, modifier2, payload).await? as u64;
    let mut remaining = relay_len;
    let mut chunk = [0u8; RELAY_CHUNK_SIZE];

    while remaining > 0 {
        let want = remaining.min(RELAY_CHUNK_SIZE as u64) as usize;
        let n = match tokio::time::timeout(wait, source.read(&mut chunk[..want])).await {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => {
                tracing::error!(error = %e, "read() from relay source failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(timeout_secs, "timeout waiting for socket data");
                return Err(WireError::Timeout(timeout_secs));
            }
        };
        if n == 0 {
            tracing::debug!(relayed = total, remaining, "relay source closed early");
            return Ok(total);
        }
        conn.write_all(&chunk[..n]).await?;
        total += n as u64;
        remaining -= n as u64;
    }

    Ok(total)
}

/// Sends a message with `fd` attached to the header write.
pub async fn send_message_with_fd(
    conn: &mut UnixStream,
    modifier1: u8,
    modifier2: u8,
    payload: &[u8],
    fd: BorrowedFd<'_>,
) -> WireResult<usize> {
    let header = FrameHeader::for_payload(modifier1, modifier2, payload)?.encode();

    tracing::debug!("passing fd");
    let sent = fdpass::send_with_fd(conn, &header, fd).await?;
    if sent != HEADER_SIZE {
        return Err(WireError::Io(std::io::Error::new(
            std::io::ErrorKind::WriteZero,
            format!("short header write: {sent} of {HEADER_SIZE} bytes"),
        )));
    }
    conn.write_all(payload).await?;
    metrics::record_message_sent("fd");
    Ok(HEADER_SIZE + payload.len())
}

/// Result of feeding bytes to a [`ResponseParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// Need more bytes.
    Again,
    Complete,
    Error,
}

/// Incremental response parser driven by [`receive_response`].
pub trait ResponseParser {
    /// Consumes the next chunk. An empty chunk means the peer closed.
    fn parse(&mut self, chunk: &[u8]) -> ParseStatus;
}

/// Parses one uwsgi frame: header, then exactly `payload_len` bytes.
#[derive(Debug, Clone)]
pub struct FrameParser {
    buffer_size: usize,
    header: Option<FrameHeader>,
    buf: Vec<u8>,
}

impl FrameParser {
    /// A parser rejecting payloads larger than `buffer_size`.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            header: None,
            buf: Vec::new(),
        }
    }

    pub fn header(&self) -> Option<FrameHeader> {
        self.header
    }

    /// Payload bytes received so far.
    pub fn payload(&self) -> &[u8] {
        self.buf.get(HEADER_SIZE..).unwrap_or_default()
    }

    /// The complete frame, if one was parsed.
    pub fn into_frame(self) -> Option<(FrameHeader, Vec<u8>)> {
        let header = self.header?;
        if self.buf.len() < HEADER_SIZE + header.payload_len as usize {
            return None;
        }
        Some((header, self.buf[HEADER_SIZE..].to_vec()))
    }
}

impl ResponseParser for FrameParser {
    fn parse(&mut self, chunk: &[u8]) -> ParseStatus {
        if chunk.is_empty() {
            return ParseStatus::Error;
        }
        self.buf.extend_from_slice(chunk);

        if self.header.is_none() {
            let Ok(header) = FrameHeader::decode(&self.buf) else {
                return ParseStatus::Again;
            };
            if header.validate_payload_len(self.buffer_size).is_err() {
                tracing::warn!(
                    payload_len = header.payload_len,
                    buffer_size = self.buffer_size,
                    "response frame larger than buffer"
                );
                return ParseStatus::Error;
            }
            self.header = Some(header);
        }

        let wanted = HEADER_SIZE + self.header.map_or(0, |h| h.payload_len as usize);
        if self.buf.len() >= wanted {
            self.buf.truncate(wanted);
            ParseStatus::Complete
        } else {
            ParseStatus::Again
        }
    }
}

/// Reads from `conn` until `parser` completes.
///
/// Each wait is bounded by `timeout_secs`, or one second when zero. A wait
/// that elapses yields [`WireError::Timeout`]; a parser error yields
/// [`WireError::ParseError`]; read errors are propagated to the caller. A peer
/// closing while the parser still wants bytes is an `UnexpectedEof` error.
pub async fn receive_response<R, P>(conn: &mut R, timeout_secs: u64, parser: &mut P) -> WireResult<()>
where
    R: AsyncRead + Unpin,
    P: ResponseParser + ?Sized,
{
    let timeout_secs = if timeout_secs == 0 {
        DEFAULT_RESPONSE_TIMEOUT_SECS
    } else {
        timeout_secs
    };
    let wait = Duration::from_secs(timeout_secs);
    let mut chunk = [0u8; RELAY_CHUNK_SIZE];

    loop {
        let n = match tokio::time::timeout(wait, conn.read(&mut chunk)).await {
            Ok(result) => result.inspect_err(|e| {
                tracing::error!(error = %e, "poll() failed while waiting for response");
            })?,
            Err(_) => {
                tracing::warn!(timeout_secs, "timeout waiting for header, skipping request");
                return Err(WireError::Timeout(timeout_secs));
            }
        };

        match parser.parse(&chunk[..n]) {
            ParseStatus::Complete => return Ok(()),
            ParseStatus::Again if n == 0 => {
                tracing::warn!("peer closed before the response was complete");
                return Err(WireError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed before the response was complete",
                )));
            }
            ParseStatus::Again => continue,
            ParseStatus::Error => {
                tracing::warn!("error parsing response");
                return Err(WireError::ParseError("invalid response".to_string()));
            }
        }
    }
}
