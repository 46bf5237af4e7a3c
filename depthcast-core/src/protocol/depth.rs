//! Depth capture payloads.
//!
//! # Wire Protocol
//!
//! ## Capture toggle
//! ```text
//! Observer ──[DEPTHCAPTURE]──────────────────► Provider
//!   want_frames:            bool
//!   want_intrinsics_table:  bool
//! ```
//!
//! ## Depth frames (continuous)
//! ```text
//! Provider ──[DEPTHFRAME]────────────────────► Observer   (repeated)
//!   timestamp:       f32       seconds since connection
//!   extrinsics:      f32 × 16  row-major view-from-world
//!   compressed_len:  i32
//!   compressed:      [u8; compressed_len]
//! ```
//!
//! ## Intrinsics table (one-shot)
//! ```text
//! Provider ──[DEPTHINTRINSICS]───────────────► Observer
//!   compressed:      [u8]      remainder of packet, no length prefix
//! ```

use bytes::Bytes;

use crate::error::DecodeError;
use crate::wire::{WireReader, WireWriter};

// ── CaptureRequest ───────────────────────────────────────────────

/// Remote capture toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureRequest {
    pub want_frames: bool,
    pub want_intrinsics_table: bool,
}

impl CaptureRequest {
    pub fn new(want_frames: bool, want_intrinsics_table: bool) -> Self {
        Self {
            want_frames,
            want_intrinsics_table,
        }
    }

    /// Start streaming, optionally asking for the intrinsics table.
    pub fn start(with_table: bool) -> Self {
        Self::new(true, with_table)
    }

    pub fn stop() -> Self {
        Self::new(false, false)
    }

    pub fn encode(&self, w: &mut WireWriter) {
        w.write_bool(self.want_frames);
        w.write_bool(self.want_intrinsics_table);
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            want_frames: r.read_bool()?,
            want_intrinsics_table: r.read_bool()?,
        })
    }
}

// ── Extrinsics ───────────────────────────────────────────────────

/// Camera pose (view-from-world) as a row-major 4×4 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extrinsics(pub [f32; 16]);

impl Extrinsics {
    pub const IDENTITY: Self = Self([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Pure translation.
    pub fn translation(x: f32, y: f32, z: f32) -> Self {
        let mut m = Self::IDENTITY;
        m.0[3] = x;
        m.0[7] = y;
        m.0[11] = z;
        m
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.0[row * 4 + col]
    }

    pub fn encode(&self, w: &mut WireWriter) {
        for v in self.0 {
            w.write_f32(v);
        }
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let mut m = [0.0f32; 16];
        for v in &mut m {
            *v = r.read_f32()?;
        }
        Ok(Self(m))
    }
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ── DepthFramePacket ─────────────────────────────────────────────

/// One depth frame as it travels on the wire (pixels still compressed).
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFramePacket {
    pub timestamp: f32,
    pub extrinsics: Extrinsics,
    pub compressed: Bytes,
}

impl DepthFramePacket {
    pub fn encode(&self, w: &mut WireWriter) {
        w.write_f32(self.timestamp);
        self.extrinsics.encode(w);
        w.write_i32(self.compressed.len() as i32);
        w.write_bytes(&self.compressed);
    }

    /// The declared length must match the remaining bytes exactly.
    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let timestamp = r.read_f32()?;
        let extrinsics = Extrinsics::decode(r)?;
        let declared = r.read_i32()?;
        let remaining = r.remaining();
        if declared < 0 || declared as usize != remaining {
            return Err(DecodeError::LengthMismatch {
                declared: declared as i64,
                remaining,
            });
        }
        let compressed = Bytes::copy_from_slice(r.read_bytes(remaining)?);
        Ok(Self {
            timestamp,
            extrinsics,
            compressed,
        })
    }
}

// ── DepthIntrinsicsPacket ────────────────────────────────────────

/// The compressed intrinsics table. Length is implicit: the payload
/// runs to the end of the packet.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthIntrinsicsPacket {
    pub compressed: Bytes,
}

impl DepthIntrinsicsPacket {
    pub fn encode(&self, w: &mut WireWriter) {
        w.write_bytes(&self.compressed);
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            compressed: Bytes::copy_from_slice(r.read_remainder()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_request_layout() {
        let mut w = WireWriter::new();
        CaptureRequest::start(true).encode(&mut w);
        assert_eq!(&w.finish()[..], &[1, 1]);

        let mut w = WireWriter::new();
        CaptureRequest::stop().encode(&mut w);
        assert_eq!(&w.finish()[..], &[0, 0]);
    }

    #[test]
    fn extrinsics_are_row_major() {
        let m = Extrinsics::translation(1.0, 2.0, 3.0);
        assert_eq!(m.get(0, 3), 1.0);
        assert_eq!(m.get(1, 3), 2.0);
        assert_eq!(m.get(2, 3), 3.0);

        let mut w = WireWriter::new();
        m.encode(&mut w);
        let bytes = w.finish();
        assert_eq!(bytes.len(), 64);
        // element [0][3] is the fourth float on the wire
        assert_eq!(&bytes[12..16], &1.0f32.to_le_bytes());
    }

    #[test]
    fn frame_declared_length_too_long() {
        let pkt = DepthFramePacket {
            timestamp: 0.5,
            extrinsics: Extrinsics::IDENTITY,
            compressed: Bytes::from_static(&[1, 2, 3, 4]),
        };
        let mut w = WireWriter::new();
        pkt.encode(&mut w);
        let bytes = w.finish();
        let truncated = &bytes[..bytes.len() - 1];

        let mut r = WireReader::new(truncated);
        assert_eq!(
            DepthFramePacket::decode(&mut r),
            Err(DecodeError::LengthMismatch {
                declared: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn frame_declared_length_too_short() {
        let pkt = DepthFramePacket {
            timestamp: 0.5,
            extrinsics: Extrinsics::IDENTITY,
            compressed: Bytes::from_static(&[1, 2]),
        };
        let mut w = WireWriter::new();
        pkt.encode(&mut w);
        w.write_bytes(&[0xEE]);
        let bytes = w.finish();

        let mut r = WireReader::new(&bytes);
        assert_eq!(
            DepthFramePacket::decode(&mut r),
            Err(DecodeError::LengthMismatch {
                declared: 2,
                remaining: 3
            })
        );
    }

    #[test]
    fn frame_negative_length_rejected() {
        let mut w = WireWriter::new();
        w.write_f32(0.0);
        Extrinsics::IDENTITY.encode(&mut w);
        w.write_i32(-5);
        let bytes = w.finish();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            DepthFramePacket::decode(&mut r),
            Err(DecodeError::LengthMismatch { declared: -5, .. })
        ));
    }

    #[test]
    fn intrinsics_takes_remainder() {
        let mut r = WireReader::new(&[9, 8, 7]);
        let pkt = DepthIntrinsicsPacket::decode(&mut r).unwrap();
        assert_eq!(&pkt.compressed[..], &[9, 8, 7]);
        assert_eq!(r.remaining(), 0);
    }
}
