//! Hardware-free depth device.
//!
//! Advertises a depth sensor stream plus a colour stream and, once
//! continuous capture starts, produces a moving depth ramp on its own
//! thread at the stream framerate. Frames carry a pinhole intrinsics
//! mapper that is undefined outside a circular field of view, so tables
//! built from it contain real `(NaN, NaN)` entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use depthcast_core::{
    CameraType, CapturedFrame, DepthDevice, DepthError, Extrinsics, FrameSink, FrameSize,
    StreamDescription, StreamResolution, UnitPlaneMapper, UnitPlanePoint,
};

/// Nearest and farthest synthetic depth, in millimetres.
const NEAR_MM: u16 = 500;
const FAR_MM: u16 = 4000;

// ── PinholeMapper ────────────────────────────────────────────────

/// Ideal pinhole model centred on the image.
#[derive(Debug, Clone, Copy)]
pub struct PinholeMapper {
    cx: f32,
    cy: f32,
    focal: f32,
    /// Unit-plane radius beyond which the mapping is undefined.
    valid_radius: f32,
}

impl PinholeMapper {
    /// 90° horizontal field of view.
    pub fn new(size: FrameSize, valid_radius: f32) -> Self {
        Self {
            cx: (size.width as f32 - 1.0) / 2.0,
            cy: (size.height as f32 - 1.0) / 2.0,
            focal: size.width as f32 / 2.0,
            valid_radius,
        }
    }
}

impl UnitPlaneMapper for PinholeMapper {
    fn map_image_point(&self, x: f32, y: f32) -> Option<UnitPlanePoint> {
        let u = (x - self.cx) / self.focal;
        let v = (y - self.cy) / self.focal;
        if u * u + v * v > self.valid_radius * self.valid_radius {
            return None;
        }
        Some(UnitPlanePoint::new(u, v))
    }
}

// ── SyntheticDevice ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Name and id of the advertised depth stream.
    pub sensor_name: String,
    pub sensor_id: String,
    pub size: FrameSize,
    pub framerate: f64,
    pub valid_radius: f32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sensor_name: "Sensor Streaming".into(),
            sensor_id: "Source#2".into(),
            size: FrameSize::SENSOR_DEFAULT,
            framerate: 5.0,
            valid_radius: 1.2,
        }
    }
}

pub struct SyntheticDevice {
    config: SyntheticConfig,
    mapper: Arc<PinholeMapper>,
    initialized: AtomicBool,
    open: Mutex<Option<StreamDescription>>,
    running: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SyntheticDevice {
    pub fn new(config: SyntheticConfig) -> Self {
        let mapper = Arc::new(PinholeMapper::new(config.size, config.valid_radius));
        Self {
            config,
            mapper,
            initialized: AtomicBool::new(false),
            open: Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One frame of the ramp at tick `n`.
    pub fn render(size: FrameSize, n: u64) -> Vec<u16> {
        let span = u64::from(FAR_MM - NEAR_MM);
        let mut pixels = Vec::with_capacity(size.pixel_count());
        for y in 0..size.height as u64 {
            for x in 0..size.width as u64 {
                let offset = (x * 7 + y * 3 + n * 25) % span;
                pixels.push(NEAR_MM + offset as u16);
            }
        }
        pixels
    }

    fn capture_loop(
        size: FrameSize,
        interval: Duration,
        mapper: Arc<PinholeMapper>,
        running: Arc<AtomicBool>,
        sink: FrameSink,
    ) {
        let mut tick: u64 = 0;
        let mut dropped: u64 = 0;
        while running.load(Ordering::SeqCst) {
            let started = Instant::now();

            let sway = (tick as f32 * 0.05).sin() * 0.25;
            let frame = CapturedFrame::new(
                size,
                Self::render(size, tick),
                Extrinsics::translation(sway, 0.0, 0.0),
            )
            .with_intrinsics(Arc::clone(&mapper) as Arc<dyn UnitPlaneMapper>);

            if !sink.deliver(frame) {
                if sink.is_closed() {
                    debug!("frame sink closed, capture thread exiting");
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                dropped += 1;
            }
            tick += 1;

            if let Some(rest) = interval.checked_sub(started.elapsed()) {
                std::thread::sleep(rest);
            }
        }
        info!(frames = tick, dropped, "synthetic capture stopped");
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl DepthDevice for SyntheticDevice {
    fn initialize(&self) -> Result<(), DepthError> {
        if self.config.size.pixel_count() == 0 {
            return Err(DepthError::Device(format!(
                "invalid sensor size {}",
                self.config.size
            )));
        }
        self.initialized.store(true, Ordering::SeqCst);
        info!(size = %self.config.size, "synthetic depth device ready");
        Ok(())
    }

    fn stream_descriptions(&self) -> Vec<StreamDescription> {
        let size = self.config.size;
        vec![
            StreamDescription::new(
                self.config.sensor_name.clone(),
                self.config.sensor_id.clone(),
                StreamResolution::new(size.width, size.height, self.config.framerate),
                CameraType::Depth,
            ),
            StreamDescription::new(
                "Color",
                "Source#1",
                StreamResolution::new(1920, 1080, 30.0),
                CameraType::Color,
            ),
        ]
    }

    fn start(&self, stream: &StreamDescription) -> Result<(), DepthError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(DepthError::Device("device not initialized".into()));
        }
        let mut open = lock(&self.open);
        if let Some(current) = open.as_ref() {
            return Err(DepthError::Device(format!("stream already open: {current}")));
        }
        info!(%stream, "stream opened");
        *open = Some(stream.clone());
        Ok(())
    }

    fn start_continuous_capture(&self, sink: FrameSink) -> Result<(), DepthError> {
        if lock(&self.open).is_none() {
            return Err(DepthError::Device("no stream open".into()));
        }
        let mut worker = lock(&self.worker);
        if worker.is_some() {
            return Err(DepthError::Device("continuous capture already running".into()));
        }

        let fps = self.config.framerate.max(0.1);
        let interval = Duration::from_secs_f64(1.0 / fps);
        let size = self.config.size;
        let mapper = Arc::clone(&self.mapper);
        let running = Arc::clone(&self.running);
        running.store(true, Ordering::SeqCst);

        let handle = std::thread::Builder::new()
            .name("synthetic-capture".into())
            .spawn(move || Self::capture_loop(size, interval, mapper, running, sink))
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                DepthError::Device(format!("failed to spawn capture thread: {e}"))
            })?;
        *worker = Some(handle);
        Ok(())
    }

    fn stop_continuous_capture(&self) -> Result<(), DepthError> {
        self.running.store(false, Ordering::SeqCst);
        let handle = lock(&self.worker).take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| DepthError::Device("capture thread panicked".into()))?;
        }
        Ok(())
    }

    fn stop(&self) -> Result<(), DepthError> {
        if self.is_streaming() {
            warn!("stop called while continuous capture is running");
            self.stop_continuous_capture()?;
        }
        if let Some(stream) = lock(&self.open).take() {
            info!(%stream, "stream closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use depthcast_core::IntrinsicsTable;

    use super::*;

    fn small() -> SyntheticDevice {
        SyntheticDevice::new(SyntheticConfig {
            size: FrameSize::new(16, 12),
            framerate: 200.0,
            ..Default::default()
        })
    }

    #[test]
    fn advertises_sensor_first() {
        let device = small();
        let streams = device.stream_descriptions();
        assert_eq!(streams.len(), 2);
        assert!(streams[0].matches("Sensor Streaming", "Source#2"));
        assert_eq!(streams[0].resolution.width, 16);
        assert_eq!(streams[1].camera_type, CameraType::Color);
    }

    #[test]
    fn start_requires_initialize() {
        let device = small();
        let stream = device.stream_descriptions().remove(0);
        assert!(device.start(&stream).is_err());
        device.initialize().unwrap();
        device.start(&stream).unwrap();
        assert!(device.start(&stream).is_err());
        device.stop().unwrap();
        device.start(&stream).unwrap();
    }

    #[test]
    fn render_stays_in_range() {
        let size = FrameSize::new(32, 8);
        let a = SyntheticDevice::render(size, 0);
        let b = SyntheticDevice::render(size, 1);
        assert_eq!(a.len(), size.pixel_count());
        assert!(a.iter().all(|d| (NEAR_MM..FAR_MM).contains(d)));
        assert_ne!(a, b);
    }

    #[test]
    fn pinhole_edges_are_invalid() {
        let size = FrameSize::new(64, 64);
        let table = IntrinsicsTable::build(&PinholeMapper::new(size, 1.0), size);
        assert!(!table.get(0, 0).unwrap().is_valid());
        assert!(table.get(32, 32).unwrap().is_valid());
        assert!(table.valid_count() < size.pixel_count());
    }

    #[test]
    fn continuous_capture_delivers_frames() {
        let device = small();
        device.initialize().unwrap();
        device.start(&device.stream_descriptions()[0]).unwrap();

        let (sink, mut frames) = FrameSink::channel(8);
        device.start_continuous_capture(sink).unwrap();
        assert!(device.is_streaming());

        let deadline = Instant::now() + Duration::from_secs(5);
        let frame = loop {
            if let Ok(frame) = frames.try_recv() {
                break frame;
            }
            assert!(Instant::now() < deadline, "no frame");
            std::thread::sleep(Duration::from_millis(5));
        };
        assert_eq!(frame.pixels.len(), 16 * 12);
        assert!(frame.intrinsics.is_some());

        device.stop_continuous_capture().unwrap();
        assert!(!device.is_streaming());
        device.stop().unwrap();
    }
}
