//! Datagram helpers.
//!
//! Datagrams carry the same 4-byte header as stream frames; one datagram
//! holds exactly one frame.

use std::net::SocketAddr;

use tokio::net::UdpSocket;

use crate::error::{WireError, WireResult};
use crate::protocol::header::{encode_frame, FrameHeader, HEADER_SIZE};
use crate::protocol::tlv::parse_dict;

/// Largest datagram built by [`send_udp_message`], header included.
pub const UDP_MAX_DATAGRAM: usize = 1024;

/// Header plus the smallest pair (1-byte key, empty value).
pub const MIN_DICT_DATAGRAM: usize = HEADER_SIZE + 2 + 1 + 2;

/// Sends `payload` to `host` ("ip:port") from a fresh socket, with modifier2 0.
pub async fn send_udp_message(modifier1: u8, host: &str, payload: &[u8]) -> WireResult<usize> {
    if payload.len() + HEADER_SIZE > UDP_MAX_DATAGRAM {
        return Err(WireError::MessageTooLarge {
            size: payload.len() + HEADER_SIZE,
            max: UDP_MAX_DATAGRAM,
        });
    }
    let target: SocketAddr = host
        .parse()
        .map_err(|_| WireError::ParseError(format!("invalid udp address {host}")))?;

    let bind: SocketAddr = if target.is_ipv4() {
        ([0u8; 4], 0).into()
    } else {
        ([0u16; 8], 0).into()
    };
    let socket = UdpSocket::bind(bind).await?;
    let datagram = encode_frame(modifier1, 0, payload)?;
    let sent = socket.send_to(&datagram, target).await.inspect_err(|e| {
        tracing::error!(target = %target, error = %e, "sendto() failed");
    })?;
    Ok(sent)
}

/// Sends a header-only datagram, to `target` or on a connected socket.
pub async fn send_empty_packet(
    socket: &UdpSocket,
    target: Option<SocketAddr>,
    modifier1: u8,
    modifier2: u8,
) -> WireResult<usize> {
    let header = FrameHeader::new(modifier1, modifier2, 0).encode();
    let sent = match target {
        Some(addr) => socket.send_to(&header, addr).await,
        None => socket.send(&header).await,
    }
    .inspect_err(|e| tracing::error!(error = %e, "sendto() failed"))?;
    Ok(sent)
}

/// Sends one framed datagram to `addr`.
pub async fn send_frame_to(
    socket: &UdpSocket,
    modifier1: u8,
    modifier2: u8,
    addr: SocketAddr,
    payload: &[u8],
) -> WireResult<usize> {
    let datagram = encode_frame(modifier1, modifier2, payload)?;
    let sent = socket.send_to(&datagram, addr).await.inspect_err(|e| {
        tracing::error!(target = %addr, error = %e, "sendto() failed");
    })?;
    Ok(sent)
}

/// Receives one frame whose payload fits `buffer_size`.
pub async fn recv_frame(socket: &UdpSocket, buffer_size: usize) -> WireResult<(FrameHeader, Vec<u8>, SocketAddr)> {
    let mut buf = vec![0u8; buffer_size + HEADER_SIZE];
    let (len, peer) = socket.recv_from(&mut buf).await?;
    tracing::debug!(peer = %peer, bytes = len, "datagram received");

    if len < HEADER_SIZE {
        tracing::warn!(peer = %peer, "invalid uwsgi packet");
        return Err(WireError::MalformedFrame(format!("datagram of {len} bytes")));
    }
    let header = FrameHeader::decode(&buf[..len])?;
    header.validate_payload_len(buffer_size).inspect_err(|_| {
        tracing::warn!(peer = %peer, "invalid uwsgi packet size, buffer size may need increasing");
    })?;

    let end = len.min(HEADER_SIZE + header.payload_len as usize);
    Ok((header, buf[HEADER_SIZE..end].to_vec(), peer))
}

/// Receives one dictionary datagram and feeds each pair to `hook`.
///
/// The datagram must carry the expected modifiers. A header declaring more
/// payload than arrived is clamped to the received bytes.
pub async fn recv_dict_frame<F>(
    socket: &UdpSocket,
    buffer_len: usize,
    modifier1: u8,
    modifier2: u8,
    hook: F,
) -> WireResult<SocketAddr>
where
    F: FnMut(&[u8], &[u8]),
{
    let mut buf = vec![0u8; buffer_len.max(MIN_DICT_DATAGRAM)];
    let (len, peer) = socket.recv_from(&mut buf).await?;

    if len < MIN_DICT_DATAGRAM {
        tracing::warn!(peer = %peer, bytes = len, "invalid uwsgi dictionary");
        return Err(WireError::MalformedFrame(format!("dictionary datagram of {len} bytes")));
    }

    let header = FrameHeader::decode(&buf[..len])?;
    if header.modifier1 != modifier1 || header.modifier2 != modifier2 {
        tracing::warn!(
            peer = %peer,
            modifier1 = header.modifier1,
            modifier2 = header.modifier2,
            "invalid uwsgi dictionary received"
        );
        return Err(WireError::UnexpectedModifiers {
            modifier1: header.modifier1,
            modifier2: header.modifier2,
        });
    }

    let received = len - HEADER_SIZE;
    let payload_len = if header.payload_len as usize > received {
        tracing::warn!(
            declared = header.payload_len,
            received,
            "uwsgi dictionary received is too big, data will be truncated"
        );
        received
    } else {
        header.payload_len as usize
    };

    parse_dict(&buf[HEADER_SIZE..HEADER_SIZE + payload_len], hook)?;
    Ok(peer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tlv::encode_dict;

    async fn pair() -> (UdpSocket, UdpSocket) {
        let a = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (a, b)
    }

    #[tokio::test]
    async fn udp_message_size_limit() {
        let payload = vec![0u8; UDP_MAX_DATAGRAM - HEADER_SIZE + 1];
        let err = send_udp_message(1, "127.0.0.1:9", &payload).await.unwrap_err();
        assert!(matches!(err, WireError::MessageTooLarge { .. }));

        let err = send_udp_message(1, "127.0.0.1", b"x").await.unwrap_err();
        assert!(matches!(err, WireError::ParseError(_)));
    }

    #[tokio::test]
    async fn udp_message_arrives_framed() {
        let (rx, _) = pair().await;
        let addr = rx.local_addr().unwrap().to_string();
        send_udp_message(48, &addr, b"hi").await.unwrap();

        let (header, payload, _) = recv_frame(&rx, 64).await.unwrap();
        assert_eq!(header, FrameHeader::new(48, 0, 2));
        assert_eq!(payload, b"hi");
    }

    #[tokio::test]
    async fn dict_datagram_reaches_hook() {
        let (rx, tx) = pair().await;
        let payload = encode_dict(&[("node", "n1"), ("load", "3")]).unwrap();
        send_frame_to(&tx, 99, 1, rx.local_addr().unwrap(), &payload).await.unwrap();

        let mut seen = Vec::new();
        recv_dict_frame(&rx, 4096, 99, 1, |k, v| seen.push((k.to_vec(), v.to_vec())))
            .await
            .unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], (b"node".to_vec(), b"n1".to_vec()));
    }

    #[tokio::test]
    async fn dict_datagram_modifiers_checked() {
        let (rx, tx) = pair().await;
        let payload = encode_dict(&[("k", "v")]).unwrap();
        send_frame_to(&tx, 5, 0, rx.local_addr().unwrap(), &payload).await.unwrap();

        let err = recv_dict_frame(&rx, 4096, 99, 0, |_, _| {}).await.unwrap_err();
        assert!(matches!(err, WireError::UnexpectedModifiers { modifier1: 5, modifier2: 0 }));
    }

    #[tokio::test]
    async fn empty_packet_is_header_only() {
        let (rx, tx) = pair().await;
        send_empty_packet(&tx, Some(rx.local_addr().unwrap()), 100, 0).await.unwrap();
        let (header, payload, _) = recv_frame(&rx, 16).await.unwrap();
        assert_eq!(header, FrameHeader::new(100, 0, 0));
        assert!(payload.is_empty());
    }
}
