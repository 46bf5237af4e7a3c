//! Provider-side capture controller.
//!
//! A single task owns the [`CaptureSession`] and serialises every
//! transition. It drains four sources:
//!
//! 1. the device-init result (posted once by a blocking worker),
//! 2. connection events from the transport,
//! 3. `DEPTHCAPTURE` packets from the transport,
//! 4. frames pushed by the device into its [`FrameSink`].
//!
//! Blocking device calls run through `spawn_blocking` and are awaited
//! in place, so no other event is handled while the device is starting
//! or stopping.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::depth::compressor::{DEFAULT_COMPRESSION_LEVEL, FrameCompressor};
use crate::depth::device::{DepthDevice, FrameSink};
use crate::depth::intrinsics::IntrinsicsTable;
use crate::depth::types::CapturedFrame;
use crate::error::DepthError;
use crate::message::PacketTag;
use crate::network::{ConnectionEvent, ConnectionId, InboundPacket, Transport};
use crate::packet::Packet;
use crate::protocol::{CaptureRequest, DepthFramePacket, DepthIntrinsicsPacket, StreamDescription};
use crate::state::{CaptureSession, CaptureState};

// ── ControllerConfig ─────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Substring the selected stream's name must contain.
    pub name_filter: String,
    /// Substring the selected stream's id must contain.
    pub id_filter: String,
    /// Frames buffered between the device thread and the controller.
    pub frame_queue: usize,
    pub compression_level: i32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            name_filter: "Sensor Streaming".into(),
            id_filter: "Source#2".into(),
            frame_queue: 4,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

/// First advertised stream whose name and id contain the filters.
pub fn select_stream(
    descriptions: &[StreamDescription],
    name_filter: &str,
    id_filter: &str,
) -> Result<StreamDescription, DepthError> {
    descriptions
        .iter()
        .find(|d| d.matches(name_filter, id_filter))
        .cloned()
        .ok_or_else(|| {
            DepthError::Configuration(format!(
                "no stream matches name {name_filter:?} and id {id_filter:?}"
            ))
        })
}

// ── CaptureController ────────────────────────────────────────────

pub struct CaptureController {
    device: Arc<dyn DepthDevice>,
    transport: Arc<dyn Transport>,
    config: ControllerConfig,
    compressor: FrameCompressor,
    session: CaptureSession,

    init_tx: mpsc::Sender<Result<(), DepthError>>,
    init_rx: mpsc::Receiver<Result<(), DepthError>>,
    sink: FrameSink,
    frames: mpsc::Receiver<CapturedFrame>,
    requests: mpsc::Receiver<InboundPacket>,
    events: mpsc::Receiver<ConnectionEvent>,
}

impl CaptureController {
    /// Registers the `DEPTHCAPTURE` handler and connection listener on
    /// `transport`. Does not touch the device.
    pub fn new(
        device: Arc<dyn DepthDevice>,
        transport: Arc<dyn Transport>,
        config: ControllerConfig,
    ) -> Self {
        let requests = transport.register_handler(PacketTag::DepthCapture);
        let events = transport.subscribe_connections();
        let (sink, frames) = FrameSink::channel(config.frame_queue);
        let (init_tx, init_rx) = mpsc::channel(1);
        let compressor = FrameCompressor::with_level(config.compression_level);

        Self {
            device,
            transport,
            config,
            compressor,
            session: CaptureSession::new(),
            init_tx,
            init_rx,
            sink,
            frames,
            requests,
            events,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.session.state()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Start device bring-up on a blocking worker and return at once.
    /// The result is picked up by [`run`](Self::run).
    pub fn begin_initialize(&mut self) -> Result<(), DepthError> {
        self.session.state_mut().begin_initialize()?;
        info!("initializing capture device");

        let device = Arc::clone(&self.device);
        let done = self.init_tx.clone();
        task::spawn_blocking(move || {
            let result = device.initialize();
            // Receiver gone means the controller already shut down.
            let _ = done.blocking_send(result);
        });
        Ok(())
    }

    /// Bring the device up and wait for the result.
    pub async fn initialize(&mut self) -> Result<(), DepthError> {
        self.session.state_mut().begin_initialize()?;
        let device = Arc::clone(&self.device);
        let result = match task::spawn_blocking(move || device.initialize()).await {
            Ok(result) => result,
            Err(e) => Err(e.into()),
        };
        let failure = result.as_ref().err().map(ToString::to_string);
        self.handle_device_initialized(result).await;
        match failure {
            Some(e) => Err(DepthError::Device(e)),
            None => Ok(()),
        }
    }

    /// Event loop. Returns after `shutdown` fires and the device has
    /// been stopped.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), DepthError> {
        self.begin_initialize()?;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(result) = self.init_rx.recv() => {
                    self.handle_device_initialized(result).await;
                }
                Some(event) = self.events.recv() => match event {
                    ConnectionEvent::Connected(id) => self.handle_connected(id).await,
                    ConnectionEvent::Disconnected(id) => self.handle_disconnected(id),
                },
                Some(packet) = self.requests.recv() => self.handle_packet(packet).await,
                Some(frame) = self.frames.recv() => self.handle_frame(frame).await,
                else => break,
            }
        }

        self.shutdown().await
    }

    // ── Event handlers ───────────────────────────────────────────

    pub async fn handle_device_initialized(&mut self, result: Result<(), DepthError>) {
        if let Err(e) = self.session.state_mut().complete_initialize(result.is_ok()) {
            warn!("unexpected init result: {e}");
            return;
        }
        match result {
            Ok(()) => {
                info!("capture device initialized");
                if self.transport.is_connected() {
                    self.broadcast_descriptions().await;
                }
            }
            Err(e) => error!("device initialization failed, capture unavailable: {e}"),
        }
    }

    pub async fn handle_connected(&mut self, connection: ConnectionId) {
        info!(connection, "observer connected");
        self.session.reset_clock();
        if self.session.state().is_initialized() {
            self.broadcast_descriptions().await;
        }
    }

    pub fn handle_disconnected(&mut self, connection: ConnectionId) {
        if self.session.release_target(connection) {
            info!(connection, "frame delivery target disconnected");
        }
    }

    async fn handle_packet(&mut self, packet: InboundPacket) {
        let request = match Packet::decode_as(PacketTag::DepthCapture, &packet.bytes) {
            Ok(Packet::DepthCapture(request)) => request,
            Ok(other) => {
                debug!(connection = packet.connection, tag = %other.tag(), "unexpected packet");
                return;
            }
            Err(e) => {
                warn!(connection = packet.connection, "malformed capture request: {e}");
                return;
            }
        };
        if let Err(e) = self.handle_capture_request(packet.connection, request).await {
            warn!(connection = packet.connection, ?request, "capture request failed: {e}");
        }
    }

    /// Apply one remote toggle.
    ///
    /// The intrinsics flag is taken from every accepted request, even
    /// when the `want_frames` part changes nothing.
    pub async fn handle_capture_request(
        &mut self,
        connection: ConnectionId,
        request: CaptureRequest,
    ) -> Result<(), DepthError> {
        match self.session.state() {
            CaptureState::Failed => return Err(DepthError::FeatureUnavailable),
            state if !state.is_initialized() => {
                return Err(DepthError::InvalidTransition(
                    "capture request before device initialization",
                ));
            }
            _ => {}
        }

        self.session
            .set_intrinsics_pending(request.want_intrinsics_table);

        if request.want_frames {
            if let Some(previous) = self.session.retarget(connection) {
                info!(connection, previous, "frame delivery retargeted");
            }
        }

        if request.want_frames == self.session.is_capturing() {
            debug!(connection, want_frames = request.want_frames, "capture already in requested state");
            return Ok(());
        }

        if request.want_frames {
            self.start_capture().await
        } else {
            self.stop_capture().await
        }
    }

    /// Emit one captured frame to the current target.
    ///
    /// Every failure drops this frame only.
    pub async fn handle_frame(&mut self, frame: CapturedFrame) {
        if !self.session.is_capturing() {
            debug!("frame outside capture, dropped");
            return;
        }
        let Some(target) = self.session.target() else {
            debug!("no delivery target, frame dropped");
            return;
        };
        if let Err(e) = self.emit_frame(target, frame).await {
            warn!(connection = target, "frame dropped: {e}");
        }
    }

    /// Halt capture if running. Continuous capture is halted before the
    /// stream is stopped.
    pub async fn shutdown(&mut self) -> Result<(), DepthError> {
        if self.session.state() == CaptureState::Capturing {
            self.stop_capture().await?;
        }
        info!("capture controller stopped");
        Ok(())
    }

    // ── Device lifecycle ─────────────────────────────────────────

    async fn start_capture(&mut self) -> Result<(), DepthError> {
        let stream = select_stream(
            &self.device.stream_descriptions(),
            &self.config.name_filter,
            &self.config.id_filter,
        )?;

        self.session.state_mut().begin_start()?;
        info!(%stream, "starting capture");

        let device = Arc::clone(&self.device);
        let sink = self.sink.clone();
        let selected = stream.clone();
        let result = task::spawn_blocking(move || -> Result<(), DepthError> {
            device.start(&selected)?;
            if let Err(e) = device.start_continuous_capture(sink) {
                if let Err(stop) = device.stop() {
                    warn!("stop after failed continuous capture: {stop}");
                }
                return Err(e);
            }
            Ok(())
        })
        .await
        .unwrap_or_else(|e| Err(e.into()));

        self.session.state_mut().complete_start(result.is_ok())?;
        result?;
        self.session.set_stream(stream);
        info!("capture started");
        Ok(())
    }

    async fn stop_capture(&mut self) -> Result<(), DepthError> {
        self.session.state_mut().begin_stop()?;
        info!("stopping capture");

        let device = Arc::clone(&self.device);
        let result = task::spawn_blocking(move || {
            let halted = device.stop_continuous_capture();
            let stopped = device.stop();
            halted.and(stopped)
        })
        .await
        .unwrap_or_else(|e| Err(e.into()));

        self.session.state_mut().complete_stop()?;
        let stale = self.discard_queued_frames();
        if stale > 0 {
            debug!(stale, "discarded frames queued before stop");
        }
        if let Err(e) = &result {
            warn!("device stop reported an error: {e}");
        }
        info!("capture stopped");
        result
    }

    /// Empty the frame queue. Continuous capture is halted by now, so
    /// nothing refills it until the next start.
    fn discard_queued_frames(&mut self) -> usize {
        let mut count = 0;
        while self.frames.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    // ── Emission ─────────────────────────────────────────────────

    async fn broadcast_descriptions(&self) {
        let descriptions = self.device.stream_descriptions();
        let count = descriptions.len();
        let packet = Packet::StreamDescriptions(descriptions).encode();
        match self.transport.broadcast(packet).await {
            Ok(()) => debug!(count, "stream descriptions sent"),
            Err(e) => debug!("stream descriptions not sent: {e}"),
        }
    }

    async fn emit_frame(
        &mut self,
        target: ConnectionId,
        frame: CapturedFrame,
    ) -> Result<(), DepthError> {
        let expected = frame.size.pixel_count();
        if frame.pixels.len() != expected {
            return Err(DepthError::DataCorruption {
                expected,
                actual: frame.pixels.len(),
            });
        }

        let pending = self.session.intrinsics_pending();
        let send_table = pending && frame.intrinsics.is_some();
        if pending && !send_table {
            debug!("frame has no intrinsics mapper, table request stays armed");
        }

        let timestamp = self.session.secs_at(frame.captured_at);
        let compressor = self.compressor;
        let (pixels, table, extrinsics) = task::spawn_blocking(move || {
            let table = match frame.intrinsics.as_deref() {
                Some(mapper) if send_table => {
                    let table = IntrinsicsTable::build(mapper, frame.size);
                    debug!(valid = table.valid_count(), "intrinsics table built");
                    Some(compressor.compress(&table.to_bytes())?)
                }
                _ => None,
            };
            let pixels = compressor.compress(&frame.pixel_bytes())?;
            Ok::<_, DepthError>((pixels, table, frame.extrinsics))
        })
        .await??;

        if let Some(table) = table {
            let packet = Packet::from(DepthIntrinsicsPacket {
                compressed: Bytes::from(table),
            });
            self.transport.send_to(target, packet.encode()).await?;
        }

        let packet = Packet::from(DepthFramePacket {
            timestamp,
            extrinsics,
            compressed: Bytes::from(pixels),
        });
        self.transport.send_to(target, packet.encode()).await?;

        if send_table {
            self.session.set_intrinsics_pending(false);
            info!(connection = target, "intrinsics table delivered");
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
