//! FastCGI record encoding.
//!
//! Records carry an 8-byte header (version, type, request id, big-endian
//! content length, padding length, reserved). Parameters use a 1-byte length
//! for values up to 127 bytes and a 4-byte length with the high bit set above.
//! Every record produced here belongs to request id 1 and carries no padding.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{WireError, WireResult};

pub const FASTCGI_VERSION: u8 = 1;

/// Record header size in bytes.
pub const RECORD_HEADER_SIZE: usize = 8;

/// Request id used for every record written by the gateway.
pub const REQUEST_ID: u16 = 1;

/// Longest length encoded with a single byte.
const SHORT_LEN_MAX: usize = 127;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    BeginRequest = 1,
    AbortRequest = 2,
    EndRequest = 3,
    Params = 4,
    Stdin = 5,
    Stdout = 6,
    Stderr = 7,
    Data = 8,
    GetValues = 9,
    GetValuesResult = 10,
    UnknownType = 11,
}

impl RecordType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::BeginRequest),
            2 => Some(Self::AbortRequest),
            3 => Some(Self::EndRequest),
            4 => Some(Self::Params),
            5 => Some(Self::Stdin),
            6 => Some(Self::Stdout),
            7 => Some(Self::Stderr),
            8 => Some(Self::Data),
            9 => Some(Self::GetValues),
            10 => Some(Self::GetValuesResult),
            11 => Some(Self::UnknownType),
            _ => None,
        }
    }
}

/// Decoded record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub version: u8,
    pub record_type: u8,
    pub request_id: u16,
    pub content_length: u16,
    pub padding_length: u8,
}

impl RecordHeader {
    fn new(record_type: u8, content_length: u16) -> Self {
        Self {
            version: FASTCGI_VERSION,
            record_type,
            request_id: REQUEST_ID,
            content_length,
            padding_length: 0,
        }
    }

    pub fn encode(&self) -> [u8; RECORD_HEADER_SIZE] {
        let id = self.request_id.to_be_bytes();
        let cl = self.content_length.to_be_bytes();
        [
            self.version,
            self.record_type,
            id[0],
            id[1],
            cl[0],
            cl[1],
            self.padding_length,
            0,
        ]
    }

    pub fn decode(bytes: &[u8; RECORD_HEADER_SIZE]) -> Self {
        Self {
            version: bytes[0],
            record_type: bytes[1],
            request_id: u16::from_be_bytes([bytes[2], bytes[3]]),
            content_length: u16::from_be_bytes([bytes[4], bytes[5]]),
            padding_length: bytes[6],
        }
    }
}

fn push_len(out: &mut Vec<u8>, len: usize) -> WireResult<()> {
    if len <= SHORT_LEN_MAX {
        out.push(len as u8);
        return Ok(());
    }
    let len = u32::try_from(len)
        .ok()
        .filter(|l| *l <= 0x7fff_ffff)
        .ok_or(WireError::MessageTooLarge {
            size: len,
            max: 0x7fff_ffff,
        })?;
    out.extend_from_slice(&(len | 0x8000_0000).to_be_bytes());
    Ok(())
}

fn content_len(len: usize) -> WireResult<u16> {
    u16::try_from(len).map_err(|_| WireError::MessageTooLarge {
        size: len,
        max: u16::MAX as usize,
    })
}

/// Encodes one name/value pair as a complete PARAMS record.
pub fn encode_param(name: &[u8], value: &[u8]) -> WireResult<Vec<u8>> {
    let mut body = Vec::with_capacity(name.len() + value.len() + 8);
    push_len(&mut body, name.len())?;
    push_len(&mut body, value.len())?;
    body.extend_from_slice(name);
    body.extend_from_slice(value);
    encode_record(RecordType::Params as u8, &body)
}

/// Encodes a generic record around `payload`.
pub fn encode_record(record_type: u8, payload: &[u8]) -> WireResult<Vec<u8>> {
    let header = RecordHeader::new(record_type, content_len(payload.len())?);
    let mut record = Vec::with_capacity(RECORD_HEADER_SIZE + payload.len());
    record.extend_from_slice(&header.encode());
    record.extend_from_slice(payload);
    Ok(record)
}

/// Writes a PARAMS record for one name/value pair.
pub async fn send_param<W>(writer: &mut W, name: &[u8], value: &[u8]) -> WireResult<usize>
where
    W: AsyncWrite + Unpin,
{
    let record = encode_param(name, value)?;
    writer.write_all(&record).await?;
    Ok(record.len())
}

/// Writes a generic record.
pub async fn send_record<W>(writer: &mut W, record_type: u8, payload: &[u8]) -> WireResult<usize>
where
    W: AsyncWrite + Unpin,
{
    let record = encode_record(record_type, payload)?;
    writer.write_all(&record).await?;
    Ok(record.len())
}

/// Reads one complete record, waiting for short reads to fill.
///
/// Returns the content of STDOUT records. Any other record type, or a peer
/// closing mid-record, yields `None`, which callers treat as end of stream.
pub async fn decode_record<R>(reader: &mut R) -> WireResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header_bytes = [0u8; RECORD_HEADER_SIZE];
    match reader.read_exact(&mut header_bytes).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let header = RecordHeader::decode(&header_bytes);

    if header.version != FASTCGI_VERSION {
        return Err(WireError::ParseError(format!(
            "unexpected FastCGI version {}",
            header.version
        )));
    }

    let total = header.content_length as usize + header.padding_length as usize;
    let mut content = vec![0u8; total];
    match reader.read_exact(&mut content).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    if RecordType::from_u8(header.record_type) != Some(RecordType::Stdout) {
        tracing::debug!(record_type = header.record_type, "non-stdout FastCGI record ends the stream");
        return Ok(None);
    }

    content.truncate(header.content_length as usize);
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_name_and_value_use_one_byte_lengths() {
        let record = encode_param(b"QUERY_STRING", b"a=1").unwrap();
        assert_eq!(&record[..8], &[1, 4, 0, 1, 0, 17, 0, 0]);
        assert_eq!(record[8], 12);
        assert_eq!(record[9], 3);
        assert_eq!(&record[10..22], b"QUERY_STRING");
        assert_eq!(&record[22..], b"a=1");
    }

    #[test]
    fn long_name_uses_four_byte_length() {
        let name = vec![b'N'; 130];
        let value = vec![b'v'; 10];
        let record = encode_param(&name, &value).unwrap();

        let body = &record[RECORD_HEADER_SIZE..];
        assert_eq!(&body[..4], &[0x80, 0x00, 0x00, 130]);
        assert_eq!(body[4], 10);
        assert_eq!(body.len(), 4 + 1 + 130 + 10);

        let header = RecordHeader::decode(record[..8].try_into().unwrap());
        assert_eq!(header.content_length as usize, body.len());
    }

    #[test]
    fn boundary_127_is_short_128_is_long() {
        let short = encode_param(&[b'k'; 127], b"").unwrap();
        assert_eq!(short[8], 127);
        let long = encode_param(&[b'k'; 128], b"").unwrap();
        assert_eq!(&long[8..12], &[0x80, 0, 0, 128]);
    }

    #[test]
    fn record_header_layout() {
        let record = encode_record(RecordType::Stdin as u8, &[0u8; 300]).unwrap();
        assert_eq!(&record[..8], &[1, 5, 0, 1, 0x01, 0x2c, 0, 0]);
        assert_eq!(record.len(), 308);
    }

    #[test]
    fn oversized_record_rejected() {
        let payload = vec![0u8; 70_000];
        assert!(encode_record(RecordType::Stdin as u8, &payload).is_err());
    }

    #[tokio::test]
    async fn decode_stdout_record_with_padding() {
        let mut bytes = vec![1, 6, 0, 1, 0, 5, 3, 0];
        bytes.extend_from_slice(b"hello");
        bytes.extend_from_slice(&[0, 0, 0]);

        let mut reader = &bytes[..];
        let content = decode_record(&mut reader).await.unwrap();
        assert_eq!(content.as_deref(), Some(&b"hello"[..]));
        assert!(reader.is_empty());
    }

    #[tokio::test]
    async fn decode_end_request_is_end_of_stream() {
        let bytes = [1, 3, 0, 1, 0, 0, 0, 0];
        let mut reader = &bytes[..];
        assert!(decode_record(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decode_short_read_is_end_of_stream() {
        let bytes = [1, 6, 0, 1, 0, 10, 0, 0, b'x'];
        let mut reader = &bytes[..];
        assert!(decode_record(&mut reader).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decode_rejects_bad_version() {
        let bytes = [2, 6, 0, 1, 0, 0, 0, 0];
        let mut reader = &bytes[..];
        assert!(matches!(
            decode_record(&mut reader).await.unwrap_err(),
            WireError::ParseError(_)
        ));
    }

    #[tokio::test]
    async fn send_helpers_write_records() {
        let mut out = Vec::new();
        let n = send_param(&mut out, b"A", b"B").await.unwrap();
        let m = send_record(&mut out, RecordType::Stdin as u8, b"").await.unwrap();
        assert_eq!(n + m, out.len());
        assert_eq!(&out[n..], &[1, 5, 0, 1, 0, 0, 0, 0]);
    }
}
