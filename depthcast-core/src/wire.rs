//! Primitive field encoding shared by every packet.
//!
//! Layout matches a little-endian binary writer:
//!
//! ```text
//! string:  7-bit varint byte count | UTF-8 bytes
//! bool:    u8 (0 = false, non-zero = true)
//! i32:     4 bytes LE
//! f32:     4 bytes LE
//! f64:     8 bytes LE
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::DecodeError;

/// A varint never needs more than five bytes for a `u32`.
const MAX_VARINT_BYTES: usize = 5;

// ── WireWriter ───────────────────────────────────────────────────

/// Append-only packet builder.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: BytesMut,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_varint(value.len() as u32);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32_le(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buf.put_f32_le(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buf.put_f64_le(value);
    }

    /// Raw bytes with no length prefix.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.buf.put_slice(value);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    fn write_varint(&mut self, mut value: u32) {
        while value >= 0x80 {
            self.buf.put_u8((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.put_u8(value as u8);
    }
}

// ── WireReader ───────────────────────────────────────────────────

/// Bounds-checked cursor over a received packet.
///
/// Every read checks the remaining length first, so a short packet
/// surfaces as [`DecodeError::UnexpectedEof`] instead of a panic.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_varint()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        self.ensure(1)?;
        Ok(self.buf.get_u8() != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        self.ensure(4)?;
        Ok(self.buf.get_f32_le())
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        self.ensure(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Borrow exactly `len` bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Borrow everything that is left.
    pub fn read_remainder(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }

    /// Fail unless the packet has been consumed completely.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.buf.len() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }

    fn read_varint(&mut self) -> Result<u32, DecodeError> {
        let mut value: u32 = 0;
        for i in 0..MAX_VARINT_BYTES {
            self.ensure(1)?;
            let byte = self.buf.get_u8();
            value |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::MalformedVarint)
    }

    fn ensure(&self, needed: usize) -> Result<(), DecodeError> {
        if self.buf.len() < needed {
            return Err(DecodeError::UnexpectedEof {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_prefix_is_single_byte_for_short_tags() {
        let mut w = WireWriter::new();
        w.write_string("DEPTHFRAME");
        let bytes = w.finish();
        assert_eq!(bytes[0], 10);
        assert_eq!(&bytes[1..], b"DEPTHFRAME");
    }

    #[test]
    fn long_string_uses_multi_byte_varint() {
        let long = "x".repeat(300);
        let mut w = WireWriter::new();
        w.write_string(&long);
        let bytes = w.finish();
        // 300 = 0b1_0010_1100 → [0xAC, 0x02]
        assert_eq!(&bytes[..2], &[0xAC, 0x02]);

        let mut r = WireReader::new(&bytes);
        assert_eq!(r.read_string().unwrap(), long);
        r.finish().unwrap();
    }

    #[test]
    fn primitives_are_little_endian() {
        let mut w = WireWriter::new();
        w.write_i32(1);
        w.write_bool(true);
        w.write_f32(1.0);
        let bytes = w.finish();
        assert_eq!(&bytes[..], &[1, 0, 0, 0, 1, 0x00, 0x00, 0x80, 0x3F]);
    }

    #[test]
    fn short_read_is_eof_error() {
        let mut r = WireReader::new(&[1, 2]);
        assert_eq!(
            r.read_i32(),
            Err(DecodeError::UnexpectedEof {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn overlong_varint_rejected() {
        let mut r = WireReader::new(&[0xFF; 6]);
        assert_eq!(r.read_string(), Err(DecodeError::MalformedVarint));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut r = WireReader::new(&[2, 0xC3, 0x28]);
        assert_eq!(r.read_string(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn non_zero_bool_is_true() {
        let mut r = WireReader::new(&[0, 7]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn finish_reports_trailing_bytes() {
        let mut r = WireReader::new(&[0, 0, 0, 0, 9, 9]);
        r.read_i32().unwrap();
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(2)));
    }
}
