//! Stateless per-payload compression with zstd.
//!
//! Used on the real-time path once per frame (and once per armed
//! intrinsics request), so the default level favours speed over ratio.
//! No dictionary or stream state is carried between calls.

use std::io::Read;

use crate::error::DepthError;

/// zstd level 1: fastest standard preset.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 1;

#[derive(Debug, Clone, Copy)]
pub struct FrameCompressor {
    level: i32,
}

impl FrameCompressor {
    pub fn new() -> Self {
        Self::with_level(DEFAULT_COMPRESSION_LEVEL)
    }

    /// Levels outside zstd's accepted range are clamped to 1..=19.
    pub fn with_level(level: i32) -> Self {
        Self {
            level: level.clamp(1, 19),
        }
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, DepthError> {
        zstd::encode_all(data, self.level)
            .map_err(|e| DepthError::Other(format!("zstd encode failed: {e}")))
    }

    /// Decompress `data`, requiring exactly `expected_len` output bytes.
    ///
    /// Output is bounded to `expected_len + 1` bytes while decoding so an
    /// oversized stream is detected without inflating it completely.
    pub fn decompress(&self, data: &[u8], expected_len: usize) -> Result<Vec<u8>, DepthError> {
        let corrupt = |actual| DepthError::DataCorruption {
            expected: expected_len,
            actual,
        };

        let decoder = zstd::stream::read::Decoder::new(data).map_err(|_| corrupt(0))?;
        let mut out = Vec::with_capacity(expected_len);
        decoder
            .take(expected_len as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|_| corrupt(out.len()))?;

        if out.len() != expected_len {
            return Err(corrupt(out.len()));
        }
        Ok(out)
    }
}

impl Default for FrameCompressor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth_ramp(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i / 7 % 251) as u8).collect()
    }

    #[test]
    fn roundtrip_is_byte_identical() {
        let c = FrameCompressor::new();
        for data in [Vec::new(), vec![0xAB; 1], depth_ramp(448 * 450 * 2)] {
            let packed = c.compress(&data).unwrap();
            assert_eq!(c.decompress(&packed, data.len()).unwrap(), data);
        }
    }

    #[test]
    fn repetitive_data_shrinks() {
        let c = FrameCompressor::new();
        let data = vec![0u8; 64 * 1024];
        assert!(c.compress(&data).unwrap().len() < data.len() / 10);
    }

    #[test]
    fn wrong_expected_length_is_corruption() {
        let c = FrameCompressor::new();
        let data = depth_ramp(1000);
        let packed = c.compress(&data).unwrap();

        match c.decompress(&packed, 1200) {
            Err(DepthError::DataCorruption { expected, actual }) => {
                assert_eq!(expected, 1200);
                assert_eq!(actual, 1000);
            }
            other => panic!("expected corruption, got {other:?}"),
        }

        assert!(matches!(
            c.decompress(&packed, 999),
            Err(DepthError::DataCorruption { expected: 999, .. })
        ));
    }

    #[test]
    fn truncated_stream_is_corruption() {
        let c = FrameCompressor::new();
        let data = depth_ramp(4096);
        let packed = c.compress(&data).unwrap();
        let truncated = &packed[..packed.len() / 2];
        assert!(matches!(
            c.decompress(truncated, data.len()),
            Err(DepthError::DataCorruption { .. })
        ));
    }

    #[test]
    fn garbage_is_corruption() {
        let c = FrameCompressor::new();
        assert!(matches!(
            c.decompress(b"definitely not zstd", 16),
            Err(DepthError::DataCorruption { .. })
        ));
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(FrameCompressor::with_level(0).level(), 1);
        assert_eq!(FrameCompressor::with_level(42).level(), 19);
    }
}
