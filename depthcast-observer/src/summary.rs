//! One-line statistics of a received depth frame.

use std::fmt;

use depthcast_core::DepthImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSummary {
    pub timestamp: f32,
    /// Sample at the image centre.
    pub center: u16,
    /// Smallest and largest non-zero sample; zero means no return.
    pub min: Option<u16>,
    pub max: Option<u16>,
    /// Share of pixels with a non-zero sample.
    pub coverage: f32,
    /// Camera position taken from the extrinsics translation column.
    pub position: [f32; 3],
}

impl FrameSummary {
    pub fn of(image: &DepthImage) -> Self {
        let valid = || image.pixels.iter().copied().filter(|d| *d != 0);
        let count = valid().count();
        let coverage = if image.pixels.is_empty() {
            0.0
        } else {
            count as f32 / image.pixels.len() as f32
        };
        let center = image
            .sample(image.size.width / 2, image.size.height / 2)
            .unwrap_or(0);
        let e = &image.extrinsics;

        Self {
            timestamp: image.timestamp,
            center,
            min: valid().min(),
            max: valid().max(),
            coverage,
            position: [e.get(0, 3), e.get(1, 3), e.get(2, 3)],
        }
    }
}

impl fmt::Display for FrameSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={:.3}s center={}mm", self.timestamp, self.center)?;
        match (self.min, self.max) {
            (Some(min), Some(max)) => write!(f, " range={min}..{max}mm")?,
            _ => write!(f, " range=none")?,
        }
        let [x, y, z] = self.position;
        write!(
            f,
            " coverage={:.1}% pos=({x:.2}, {y:.2}, {z:.2})",
            self.coverage * 100.0
        )
    }
}
