//! One-shot stream clients.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::{WireError, WireResult};
use crate::net::exchange::{receive_response, send_message, FrameParser, DEFAULT_SOCKET_TIMEOUT_SECS};
use crate::protocol::header::{encode_frame, FrameHeader};
use crate::protocol::tlv::encode_item;

fn effective_timeout(timeout_secs: u64) -> u64 {
    if timeout_secs == 0 {
        DEFAULT_SOCKET_TIMEOUT_SECS
    } else {
        timeout_secs
    }
}

/// Connects to `addr` ("host:port"), bounded by `timeout_secs`.
pub async fn connect(addr: &str, timeout_secs: u64) -> WireResult<TcpStream> {
    let timeout_secs = effective_timeout(timeout_secs);
    match tokio::time::timeout(Duration::from_secs(timeout_secs), TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(addr = %addr, error = %e, "unable to set TCP_NODELAY");
            }
            Ok(stream)
        }
        Ok(Err(source)) => {
            tracing::warn!(addr = %addr, error = %source, "connect() failed");
            Err(WireError::ConnectFailed {
                addr: addr.to_string(),
                source,
            })
        }
        Err(_) => {
            tracing::warn!(addr = %addr, timeout_secs, "connect() timed out");
            Err(WireError::Timeout(timeout_secs))
        }
    }
}

/// Connects and sends one message, handing the open stream back.
pub async fn enqueue_message(
    addr: &str,
    modifier1: u8,
    modifier2: u8,
    payload: &[u8],
    timeout_secs: u64,
) -> WireResult<TcpStream> {
    let mut stream = connect(addr, timeout_secs).await?;
    send_message(&mut stream, modifier1, modifier2, payload).await?;
    Ok(stream)
}

/// Sends one message and waits for one response frame.
pub async fn simple_message(
    addr: &str,
    modifier1: u8,
    modifier2: u8,
    payload: &[u8],
    buffer_size: usize,
    timeout_secs: u64,
) -> WireResult<(FrameHeader, Vec<u8>)> {
    let mut stream = enqueue_message(addr, modifier1, modifier2, payload, timeout_secs).await?;
    let mut parser = FrameParser::new(buffer_size);
    receive_response(&mut stream, timeout_secs, &mut parser).await?;
    parser
        .into_frame()
        .ok_or_else(|| WireError::ParseError("incomplete response frame".to_string()))
}

/// Sends a frame whose payload is `items` as length-prefixed items, then closes.
pub async fn simple_send_items(
    addr: &str,
    modifier1: u8,
    modifier2: u8,
    items: &[&[u8]],
    timeout_secs: u64,
) -> WireResult<()> {
    let mut payload = Vec::new();
    for item in items {
        encode_item(&mut payload, item)?;
    }
    let frame = encode_frame(modifier1, modifier2, &payload)?;

    let mut stream = connect(addr, timeout_secs).await?;
    if let Err(e) = stream.write_all(&frame).await {
        tracing::error!(addr = %addr, error = %e, "writev() failed");
        return Err(e.into());
    }
    stream.shutdown().await?;
    Ok(())
}
