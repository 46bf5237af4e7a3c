//! Stream advertisement payload (`STREAMDESCR`).
//!
//! ```text
//! Provider ──[STREAMDESCR]──────────────────► Observer(s)   (broadcast)
//!   count: i32
//!   count × { name: string, id: string,
//!             width: i32, height: i32, framerate: f64,
//!             camera_type: i32 }
//! ```
//!
//! Sent on every new connection once the device is initialized, and
//! again when initialization completes while a connection is open.

use std::fmt;

use crate::error::DecodeError;
use crate::wire::{WireReader, WireWriter};

// ── CameraType ───────────────────────────────────────────────────

/// Kind of sensor behind a stream.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CameraType {
    #[default]
    Custom = 0,
    Color = 1,
    Infrared = 2,
    Depth = 3,
}

impl TryFrom<i32> for CameraType {
    type Error = DecodeError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CameraType::Custom),
            1 => Ok(CameraType::Color),
            2 => Ok(CameraType::Infrared),
            3 => Ok(CameraType::Depth),
            _ => Err(DecodeError::UnknownVariant {
                type_name: "CameraType",
                value: value as i64,
            }),
        }
    }
}

impl fmt::Display for CameraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ── StreamResolution ─────────────────────────────────────────────

/// Width and height travel as `i32`; values above
/// [`MAX_DIMENSION`](Self::MAX_DIMENSION) are sent clamped to it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamResolution {
    pub width: u32,
    pub height: u32,
    pub framerate: f64,
}

impl StreamResolution {
    pub const MAX_DIMENSION: u32 = i32::MAX as u32;

    pub fn new(width: u32, height: u32, framerate: f64) -> Self {
        Self {
            width,
            height,
            framerate,
        }
    }
}

// ── StreamDescription ────────────────────────────────────────────

/// One capture stream offered by the device.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescription {
    /// Human-readable source name, e.g. `"Sensor Streaming"`.
    pub source_name: String,
    /// Platform source identifier, e.g. `"Source#2"`.
    pub source_id: String,
    pub resolution: StreamResolution,
    pub camera_type: CameraType,
}

impl StreamDescription {
    pub fn new(
        source_name: impl Into<String>,
        source_id: impl Into<String>,
        resolution: StreamResolution,
        camera_type: CameraType,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_id: source_id.into(),
            resolution,
            camera_type,
        }
    }

    /// Both filters must be substrings of the respective fields.
    pub fn matches(&self, name_filter: &str, id_filter: &str) -> bool {
        self.source_name.contains(name_filter) && self.source_id.contains(id_filter)
    }

    pub fn encode(&self, w: &mut WireWriter) {
        w.write_string(&self.source_name);
        w.write_string(&self.source_id);
        w.write_i32(wire_dimension(self.resolution.width));
        w.write_i32(wire_dimension(self.resolution.height));
        w.write_f64(self.resolution.framerate);
        w.write_i32(self.camera_type as i32);
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let source_name = r.read_string()?;
        let source_id = r.read_string()?;
        let width = read_dimension(r, "width")?;
        let height = read_dimension(r, "height")?;
        let framerate = r.read_f64()?;
        let camera_type = CameraType::try_from(r.read_i32()?)?;
        Ok(Self {
            source_name,
            source_id,
            resolution: StreamResolution::new(width, height, framerate),
            camera_type,
        })
    }
}

impl fmt::Display for StreamDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\" ({}) {}x{}@{} {}",
            self.source_name,
            self.source_id,
            self.resolution.width,
            self.resolution.height,
            self.resolution.framerate,
            self.camera_type,
        )
    }
}

// ── Sequence codec ───────────────────────────────────────────────

/// Write `count` followed by every description, in order.
pub fn encode_descriptions(descriptions: &[StreamDescription], w: &mut WireWriter) {
    w.write_i32(descriptions.len() as i32);
    for descr in descriptions {
        descr.encode(w);
    }
}

/// Read a count-prefixed description list.
pub fn decode_descriptions(r: &mut WireReader<'_>) -> Result<Vec<StreamDescription>, DecodeError> {
    let count = r.read_i32()?;
    if count < 0 {
        return Err(DecodeError::NegativeValue {
            field: "stream count",
            value: count,
        });
    }
    // Cap the pre-allocation: a hostile count must not reserve gigabytes.
    let mut out = Vec::with_capacity((count as usize).min(r.remaining()));
    for _ in 0..count {
        out.push(StreamDescription::decode(r)?);
    }
    Ok(out)
}

fn wire_dimension(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn read_dimension(r: &mut WireReader<'_>, field: &'static str) -> Result<u32, DecodeError> {
    let value = r.read_i32()?;
    u32::try_from(value).map_err(|_| DecodeError::NegativeValue { field, value })
}
