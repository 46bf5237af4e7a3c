//! Shared types for the depth capture pipeline.
//!
//! These are **internal** frame representations used between pipeline
//! stages. They are distinct from [`crate::protocol::DepthFramePacket`],
//! which is the wire form carried inside packets.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::depth::intrinsics::UnitPlaneMapper;
use crate::protocol::Extrinsics;

/// Bytes per depth sample (16-bit).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes per intrinsics entry (two `f32`).
pub const BYTES_PER_TABLE_ENTRY: usize = 8;

// ── FrameSize ────────────────────────────────────────────────────

/// Fixed depth image geometry. Both ends must agree on it; the
/// protocol never transmits it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    /// Long-throw time-of-flight sensor resolution.
    pub const SENSOR_DEFAULT: Self = Self {
        width: 448,
        height: 450,
    };

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Uncompressed size of one depth frame.
    pub const fn frame_bytes(self) -> usize {
        self.pixel_count() * BYTES_PER_SAMPLE
    }

    /// Uncompressed size of one intrinsics table.
    pub const fn table_bytes(self) -> usize {
        self.pixel_count() * BYTES_PER_TABLE_ENTRY
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::SENSOR_DEFAULT
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ── CapturedFrame ────────────────────────────────────────────────

/// A frame as delivered by the capture device.
#[derive(Clone)]
pub struct CapturedFrame {
    pub size: FrameSize,
    /// Row-major 16-bit depth samples, `size.pixel_count()` entries.
    pub pixels: Vec<u16>,
    pub extrinsics: Extrinsics,
    /// Per-pixel calibration query, when the device exposes one.
    pub intrinsics: Option<Arc<dyn UnitPlaneMapper>>,
    /// When the device produced the frame. The wire timestamp is taken
    /// from this, not from when the frame leaves the queue.
    pub captured_at: Instant,
}

impl CapturedFrame {
    pub fn new(size: FrameSize, pixels: Vec<u16>, extrinsics: Extrinsics) -> Self {
        Self {
            size,
            pixels,
            extrinsics,
            intrinsics: None,
            captured_at: Instant::now(),
        }
    }

    pub fn with_intrinsics(mut self, mapper: Arc<dyn UnitPlaneMapper>) -> Self {
        self.intrinsics = Some(mapper);
        self
    }

    /// Little-endian sample bytes, ready for compression.
    pub fn pixel_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * BYTES_PER_SAMPLE);
        for px in &self.pixels {
            out.extend_from_slice(&px.to_le_bytes());
        }
        out
    }
}

impl fmt::Debug for CapturedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedFrame")
            .field("size", &self.size)
            .field("pixels", &self.pixels.len())
            .field("extrinsics", &self.extrinsics)
            .field("intrinsics", &self.intrinsics.is_some())
            .field("captured_at", &self.captured_at)
            .finish()
    }
}

// ── DepthImage ───────────────────────────────────────────────────

/// The observer's view of the last received frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthImage {
    pub timestamp: f32,
    pub extrinsics: Extrinsics,
    pub size: FrameSize,
    pub pixels: Vec<u16>,
}

impl DepthImage {
    /// A zeroed image of the given size.
    pub fn blank(size: FrameSize) -> Self {
        Self {
            timestamp: 0.0,
            extrinsics: Extrinsics::IDENTITY,
            size,
            pixels: vec![0; size.pixel_count()],
        }
    }

    /// Overwrite the samples in place from little-endian bytes.
    ///
    /// `bytes` must be exactly `size.frame_bytes()` long; callers check
    /// this through the decompressor.
    pub fn copy_from_le_bytes(&mut self, bytes: &[u8]) {
        for (px, chunk) in self
            .pixels
            .iter_mut()
            .zip(bytes.chunks_exact(BYTES_PER_SAMPLE))
        {
            *px = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
    }

    /// Sample at `(x, y)`, or `None` outside the image.
    pub fn sample(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }
}
