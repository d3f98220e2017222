//! Frame header encoding and decoding.

use crate::error::{WireError, WireResult};

/// Frame header size in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload a header can declare.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Modifier used for cluster health checks.
pub const MODIFIER_PING: u8 = 100;

/// Frame header prefixing every packet.
///
/// Wire format (4 bytes):
/// - Byte 0: modifier1
/// - Bytes 1-2: payload length (u16, little-endian on every host)
/// - Byte 3: modifier2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader {
    /// Selects the request handler on the receiving side.
    pub modifier1: u8,
    /// Length of the payload in bytes.
    pub payload_len: u16,
    /// Handler-specific sub-selector.
    pub modifier2: u8,
}

impl FrameHeader {
    /// Creates a new frame header.
    #[must_use]
    pub const fn new(modifier1: u8, modifier2: u8, payload_len: u16) -> Self {
        Self {
            modifier1,
            payload_len,
            modifier2,
        }
    }

    /// Creates a header for a payload, rejecting payloads over 64 KiB.
    pub fn for_payload(modifier1: u8, modifier2: u8, payload: &[u8]) -> WireResult<Self> {
        let len = u16::try_from(payload.len()).map_err(|_| WireError::MessageTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD_SIZE,
        })?;
        Ok(Self::new(modifier1, modifier2, len))
    }

    /// Encodes the frame header to bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = self.payload_len.to_le_bytes();
        [self.modifier1, len[0], len[1], self.modifier2]
    }

    /// Decodes a frame header from the first four bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> WireResult<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(WireError::MalformedFrame(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            modifier1: bytes[0],
            payload_len: u16::from_le_bytes([bytes[1], bytes[2]]),
            modifier2: bytes[3],
        })
    }

    /// Rejects headers declaring more payload than the receive buffer holds.
    pub fn validate_payload_len(&self, buffer_size: usize) -> WireResult<()> {
        if self.payload_len as usize > buffer_size {
            return Err(WireError::MalformedFrame(format!(
                "payload of {} bytes exceeds buffer size {}",
                self.payload_len, buffer_size
            )));
        }
        Ok(())
    }
}

/// Encodes a complete frame (header + payload).
pub fn encode_frame(modifier1: u8, modifier2: u8, payload: &[u8]) -> WireResult<Vec<u8>> {
    let header = FrameHeader::for_payload(modifier1, modifier2, payload)?;
    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    Ok(frame)
}
