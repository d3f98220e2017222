//! Request body buffering.
//!
//! Bodies at or above the configured threshold spill to an anonymous
//! temporary file; smaller ones are kept in memory.

use std::io::SeekFrom;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::config::GatewayConfig;
use crate::error::{WireError, WireResult};

/// How to buffer a body.
#[derive(Debug, Clone, Copy)]
pub struct BodyOptions {
    /// Spill threshold in bytes; 0 disables buffering.
    pub threshold: u64,
    /// Read chunk size.
    pub chunk_size: usize,
    /// Deadline for each read.
    pub timeout: Duration,
}

impl BodyOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            threshold: config.limits.post_buffering,
            chunk_size: config.limits.post_buffering_bufsize.max(1),
            timeout: Duration::from_secs(config.timeouts.socket_secs),
        }
    }

    pub fn enabled(&self) -> bool {
        self.threshold > 0
    }
}

/// A fully read request body.
#[derive(Debug)]
pub enum RequestBody {
    Memory(Vec<u8>),
    /// Spilled body, rewound to the start.
    File(File),
}

impl RequestBody {
    pub fn is_file(&self) -> bool {
        matches!(self, RequestBody::File(_))
    }
}

async fn read_chunk<R>(conn: &mut R, buf: &mut [u8], timeout: Duration) -> WireResult<usize>
where
    R: AsyncRead + Unpin,
{
    let n = tokio::time::timeout(timeout, conn.read(buf))
        .await
        .map_err(|_| WireError::Timeout(timeout.as_secs()))??;
    if n == 0 {
        return Err(WireError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "client closed before sending the whole body",
        )));
    }
    Ok(n)
}

// The declared length is untrusted; grow past one chunk only as bytes arrive.
fn initial_capacity(len: u64, opts: &BodyOptions) -> usize {
    len.min(opts.chunk_size as u64) as usize
}

/// Reads exactly `len` body bytes from `conn`.
pub async fn read_body<R>(conn: &mut R, len: u64, opts: &BodyOptions) -> WireResult<RequestBody>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; opts.chunk_size];
    let mut remaining = len;

    if len >= opts.threshold {
        let mut file = File::from_std(tempfile::tempfile()?);
        while remaining > 0 {
            let want = remaining.min(chunk.len() as u64) as usize;
            let n = read_chunk(conn, &mut chunk[..want], opts.timeout).await?;
            file.write_all(&chunk[..n]).await?;
            remaining -= n as u64;
        }
        file.flush().await?;
        file.seek(SeekFrom::Start(0)).await?;
        tracing::debug!(bytes = len, "request body buffered to file");
        return Ok(RequestBody::File(file));
    }

    let mut body = Vec::with_capacity(initial_capacity(len, opts));
    while remaining > 0 {
        let want = remaining.min(chunk.len() as u64) as usize;
        let n = read_chunk(conn, &mut chunk[..want], opts.timeout).await?;
        body.extend_from_slice(&chunk[..n]);
        remaining -= n as u64;
    }
    Ok(RequestBody::Memory(body))
}
