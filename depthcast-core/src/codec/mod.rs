//! Length-prefixed framing for packets on a TCP stream.
//!
//! ```text
//! length:  u32 LE   byte count of the packet that follows
//! packet:  [u8]     tag + payload, see `crate::packet`
//! ```
//!
//! Framing violations are [`TransportError`]s. They are the transport's
//! concern; a correctly framed packet with a bad payload is a
//! `DecodeError` raised later by the packet codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::TransportError;

const LENGTH_PREFIX: usize = 4;

/// Largest packet accepted on the wire (16 MiB). An uncompressed
/// 448×450 intrinsics table is ~1.6 MB, so compressed payloads sit
/// well below this.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct DepthCodec {
    max_frame_size: usize,
}

impl DepthCodec {
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for DepthCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DepthCodec {
    type Item = Bytes;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < LENGTH_PREFIX {
            return Ok(None);
        }

        let len = u32::from_le_bytes([src[0], src[1], src[2], src[3]]) as usize;
        if len > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if src.len() < LENGTH_PREFIX + len {
            src.reserve(LENGTH_PREFIX + len - src.len());
            return Ok(None);
        }

        src.advance(LENGTH_PREFIX);
        Ok(Some(src.split_to(len).freeze()))
    }
}

impl Encoder<Bytes> for DepthCodec {
    type Error = TransportError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_frame_size {
            return Err(TransportError::FrameTooLarge {
                size: item.len(),
                max: self.max_frame_size,
            });
        }
        dst.reserve(LENGTH_PREFIX + item.len());
        dst.put_u32_le(item.len() as u32);
        dst.extend_from_slice(&item);
        Ok(())
    }
}
