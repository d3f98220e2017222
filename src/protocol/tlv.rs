//! Length-prefixed item decoding.
//!
//! A payload is a flat run of `[u16 little-endian length][bytes]` items,
//! read either as an array of independent items or as key/value pairs.
//!
//! # Design Decisions
//! - Decoders borrow from the receive buffer; nothing is copied
//! - Any length prefix overrunning the buffer aborts the whole decode
//! - Every loop iteration consumes at least two bytes, so decoding terminates

use crate::error::{WireError, WireResult};

/// Size of an item length prefix.
pub const LEN_PREFIX_SIZE: usize = 2;

/// Forward-only cursor over a TLV payload.
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TlvReader<'a> {
    /// Creates a reader over `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Returns true when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_len(&mut self) -> WireResult<usize> {
        if self.remaining() < LEN_PREFIX_SIZE {
            return Err(WireError::TruncatedItem {
                declared: LEN_PREFIX_SIZE,
                remaining: self.remaining(),
            });
        }
        let len = u16::from_le_bytes([self.buf[self.pos], self.buf[self.pos + 1]]) as usize;
        self.pos += LEN_PREFIX_SIZE;
        Ok(len)
    }

    fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(WireError::TruncatedItem {
                declared: len,
                remaining: self.remaining(),
            });
        }
        let item = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(item)
    }

    /// Reads one length-prefixed item (which may be empty).
    pub fn read_item(&mut self) -> WireResult<&'a [u8]> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Reads one key/value pair. Keys must be non-empty; values may be empty.
    pub fn read_pair(&mut self) -> WireResult<(&'a [u8], &'a [u8])> {
        let key_len = self.read_len()?;
        if key_len == 0 {
            return Err(WireError::EmptyKey);
        }
        let key = self.read_bytes(key_len)?;
        let value = self.read_item()?;
        Ok((key, value))
    }
}

/// Iterator over the key/value pairs of a dictionary payload.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct DictIter<'a> {
    reader: TlvReader<'a>,
    failed: bool,
}

impl<'a> DictIter<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            reader: TlvReader::new(buf),
            failed: false,
        }
    }
}

impl<'a> Iterator for DictIter<'a> {
    type Item = WireResult<(&'a [u8], &'a [u8])>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_empty() {
            return None;
        }
        let pair = self.reader.read_pair();
        if pair.is_err() {
            self.failed = true;
        }
        Some(pair)
    }
}

/// Decodes up to `max_items` non-empty items.
///
/// Zero-length items are skipped without taking an output slot. Decoding
/// stops quietly once `max_items` items were produced.
pub fn decode_array(buf: &[u8], max_items: usize) -> WireResult<Vec<&[u8]>> {
    let mut reader = TlvReader::new(buf);
    let mut items = Vec::new();

    while !reader.is_empty() && items.len() < max_items {
        let item = reader.read_item().inspect_err(|e| {
            tracing::warn!(error = %e, "invalid uwsgi array, skipping request");
        })?;
        if item.is_empty() {
            continue;
        }
        items.push(item);
    }

    Ok(items)
}

/// Decodes a dictionary into ordered pairs; duplicates are kept.
pub fn decode_dict(buf: &[u8]) -> WireResult<Vec<(&[u8], &[u8])>> {
    DictIter::new(buf).collect()
}

/// Walks a dictionary, calling `hook` for each pair.
///
/// Pairs before a malformed one have already been delivered when this fails.
pub fn parse_dict<'a, F>(buf: &'a [u8], mut hook: F) -> WireResult<()>
where
    F: FnMut(&'a [u8], &'a [u8]),
{
    for pair in DictIter::new(buf) {
        let (key, value) = pair?;
        hook(key, value);
    }
    Ok(())
}

/// Appends one length-prefixed item to `out`.
pub fn encode_item(out: &mut Vec<u8>, item: &[u8]) -> WireResult<()> {
    let len = u16::try_from(item.len()).map_err(|_| WireError::MessageTooLarge {
        size: item.len(),
        max: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(item);
    Ok(())
}

/// Encodes key/value pairs as a dictionary payload.
pub fn encode_dict<K, V>(pairs: &[(K, V)]) -> WireResult<Vec<u8>>
where
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    let mut out = Vec::new();
    for (key, value) in pairs {
        if key.as_ref().is_empty() {
            return Err(WireError::EmptyKey);
        }
        encode_item(&mut out, key.as_ref())?;
        encode_item(&mut out, value.as_ref())?;
    }
    Ok(out)
}
