//! Per-pixel calibration lookup table.
//!
//! Maps every image pixel to its point on the camera's unit focal plane
//! (z = 1), which lets the observer turn a depth sample into a 3D ray.
//! The device supplies the mapping as a [`UnitPlaneMapper`]; a query
//! that fails for one pixel only poisons that entry with `(NaN, NaN)`.

use std::io::Write;
use std::path::Path;

use crate::depth::types::{BYTES_PER_TABLE_ENTRY, FrameSize};
use crate::error::DepthError;

// ── UnitPlanePoint ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPlanePoint {
    pub x: f32,
    pub y: f32,
}

impl UnitPlanePoint {
    pub const INVALID: Self = Self {
        x: f32::NAN,
        y: f32::NAN,
    };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

// ── UnitPlaneMapper ──────────────────────────────────────────────

/// Device calibration query: image point → unit-plane point.
///
/// Returns `None` where the mapping is undefined or the underlying
/// query failed.
pub trait UnitPlaneMapper: Send + Sync {
    fn map_image_point(&self, x: f32, y: f32) -> Option<UnitPlanePoint>;
}

impl<F> UnitPlaneMapper for F
where
    F: Fn(f32, f32) -> Option<UnitPlanePoint> + Send + Sync,
{
    fn map_image_point(&self, x: f32, y: f32) -> Option<UnitPlanePoint> {
        self(x, y)
    }
}

// ── IntrinsicsTable ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct IntrinsicsTable {
    size: FrameSize,
    entries: Vec<UnitPlanePoint>,
}

impl IntrinsicsTable {
    /// Query `mapper` once per pixel in row-major order.
    ///
    /// This is the most expensive operation in the pipeline
    /// (`width * height` queries); run it off the async executor.
    pub fn build(mapper: &dyn UnitPlaneMapper, size: FrameSize) -> Self {
        let mut entries = Vec::with_capacity(size.pixel_count());
        for y in 0..size.height {
            for x in 0..size.width {
                let point = mapper
                    .map_image_point(x as f32, y as f32)
                    .unwrap_or(UnitPlanePoint::INVALID);
                entries.push(point);
            }
        }
        Self { size, entries }
    }

    /// A table with every entry invalid.
    pub fn empty(size: FrameSize) -> Self {
        Self {
            size,
            entries: vec![UnitPlanePoint::INVALID; size.pixel_count()],
        }
    }

    pub fn size(&self) -> FrameSize {
        self.size
    }

    pub fn entries(&self) -> &[UnitPlanePoint] {
        &self.entries
    }

    pub fn get(&self, x: u32, y: u32) -> Option<UnitPlanePoint> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.entries
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }

    pub fn valid_count(&self) -> usize {
        self.entries.iter().filter(|p| p.is_valid()).count()
    }

    /// Two little-endian `f32` per pixel.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * BYTES_PER_TABLE_ENTRY);
        for p in &self.entries {
            out.extend_from_slice(&p.x.to_le_bytes());
            out.extend_from_slice(&p.y.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8], size: FrameSize) -> Result<Self, DepthError> {
        let mut table = Self::empty(size);
        table.copy_from_bytes(bytes)?;
        Ok(table)
    }

    /// Overwrite every entry in place.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<(), DepthError> {
        let expected = self.size.table_bytes();
        if bytes.len() != expected {
            return Err(DepthError::DataCorruption {
                expected,
                actual: bytes.len(),
            });
        }
        for (entry, chunk) in self
            .entries
            .iter_mut()
            .zip(bytes.chunks_exact(BYTES_PER_TABLE_ENTRY))
        {
            entry.x = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            entry.y = f32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        }
        Ok(())
    }

    /// Write one `x\ty` line per pixel, row-major.
    pub fn write_tsv(&self, path: &Path) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let mut out = std::io::BufWriter::new(file);
        for p in &self.entries {
            writeln!(out, "{}\t{}", p.x, p.y)?;
        }
        out.flush()
    }
}
