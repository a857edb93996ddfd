//! Growable byte sink with big-endian primitive encoders.
//!
//! Every multi-byte value in the container is big-endian. The sink grows by
//! doubling its capacity until a write fits; previously written bytes are
//! never disturbed. A monotonically increasing cursor is the only state.

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;

use crate::error::{Error, Result};

/// Initial sink capacity; doubled on demand.
const INITIAL_CAPACITY: usize = 16 * 1024;

/// An in-memory byte sink with a write cursor.
pub struct ByteSink {
    data: Vec<u8>,
    len: usize,
}

impl ByteSink {
    /// Create a sink with the default initial capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create a sink with an explicit initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity.max(1)],
            len: 0,
        }
    }

    /// Grow by doubling until `additional` more bytes fit.
    fn ensure(&mut self, additional: usize) {
        let needed = self.len + additional;
        if needed > self.data.len() {
            let mut capacity = self.data.len();
            while capacity < needed {
                capacity *= 2;
            }
            self.data.resize(capacity, 0);
        }
    }

    /// Current write position.
    pub fn position(&self) -> usize {
        self.len
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    /// Append `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) {
        self.ensure(count);
        self.data[self.len..self.len + count].fill(0);
        self.len += count;
    }

    /// Append an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Append a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&[value as u8]);
    }

    /// Append a big-endian u16.
    pub fn write_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a big-endian i16.
    pub fn write_i16(&mut self, value: i16) {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a big-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a big-endian i32.
    pub fn write_i32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a big-endian f32.
    pub fn write_f32(&mut self, value: f32) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a big-endian f64.
    pub fn write_f64(&mut self, value: f64) {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, value);
        self.write_bytes(&buf);
    }

    /// Append a 16.16 fixed-point value (resolution fields).
    pub fn write_fixed_16_16(&mut self, value: f64) {
        self.write_i32((value * 65536.0).round() as i32);
    }

    /// Append an 8.24 fixed-point value (normalized path coordinates).
    pub fn write_fixed_8_24(&mut self, value: f64) {
        self.write_i32((value * 16_777_216.0).round() as i32);
    }

    /// Append a 4-byte format signature.
    ///
    /// Fails with [`Error::InvalidSignature`] unless `signature` is exactly
    /// 4 ASCII characters.
    pub fn write_signature(&mut self, signature: &str) -> Result<()> {
        if signature.len() != 4 || !signature.is_ascii() {
            return Err(Error::InvalidSignature(signature.to_string()));
        }
        self.write_bytes(signature.as_bytes());
        Ok(())
    }

    /// Append a length-prefixed byte string, padded with zeros so the whole
    /// field (length byte included) is a multiple of `pad_to`.
    ///
    /// Non-ASCII characters are replaced by `?`; the name is capped at 255
    /// bytes.
    pub fn write_pascal_string(&mut self, value: &str, pad_to: usize) {
        let bytes: Vec<u8> = value
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .take(255)
            .collect();
        self.write_u8(bytes.len() as u8);
        self.write_bytes(&bytes);
        let written = 1 + bytes.len();
        self.write_zeros(written.next_multiple_of(pad_to) - written);
    }

    /// Append a length-prefixed UTF-16BE string without a terminator.
    ///
    /// The prefix counts UTF-16 code units.
    pub fn write_unicode_string(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_u32(units.len() as u32);
        for unit in units {
            self.write_u16(unit);
        }
    }

    /// Append a length-prefixed UTF-16BE string with a trailing NUL unit,
    /// counted by the prefix.
    pub fn write_unicode_string_nul(&mut self, value: &str) {
        let units: Vec<u16> = value.encode_utf16().collect();
        self.write_u32(units.len() as u32 + 1);
        for unit in units {
            self.write_u16(unit);
        }
        self.write_u16(0);
    }

    /// Overwrite 4 bytes at `offset` with a big-endian u32.
    ///
    /// Supports length backpatching; `offset + 4` must not exceed the cursor.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        debug_assert!(offset + 4 <= self.len);
        BigEndian::write_u32(&mut self.data[offset..offset + 4], value);
    }

    /// The written range as a zero-copy view.
    ///
    /// Only for consumers that can guarantee no further writes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The written range as an owned, immutable snapshot.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }
}

impl Default for ByteSink {
    fn default() -> Self {
        Self::new()
    }
}
