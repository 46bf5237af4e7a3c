//! Observer-side packet handling.
//!
//! Decodes inbound packets into an [`ObserverState`] that always holds
//! the most recent values. Nothing is queued: a slow reader simply
//! misses intermediate frames. A `watch` sequence number ticks on every
//! accepted packet so readers can await changes.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::depth::compressor::FrameCompressor;
use crate::depth::intrinsics::IntrinsicsTable;
use crate::depth::types::{DepthImage, FrameSize};
use crate::error::DepthError;
use crate::message::PacketTag;
use crate::network::{InboundPacket, Transport};
use crate::packet::Packet;
use crate::protocol::{CaptureRequest, DepthFramePacket, StreamDescription};
use crate::state::{ObserverState, ReceiverStats};

pub struct ObserverReceiver {
    compressor: FrameCompressor,
    state: Mutex<ObserverState>,
    updates: watch::Sender<u64>,
}

impl ObserverReceiver {
    /// `size` must match the provider's stream; it is not transmitted.
    pub fn new(size: FrameSize) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            compressor: FrameCompressor::new(),
            state: Mutex::new(ObserverState::new(size)),
            updates,
        }
    }

    pub fn size(&self) -> FrameSize {
        self.lock().size()
    }

    /// Ticks once per accepted packet.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    pub fn streams(&self) -> Vec<StreamDescription> {
        self.lock().streams().to_vec()
    }

    pub fn latest_frame(&self) -> Option<DepthImage> {
        self.lock().frame().cloned()
    }

    pub fn intrinsics(&self) -> Option<IntrinsicsTable> {
        self.lock().intrinsics().cloned()
    }

    pub fn stats(&self) -> ReceiverStats {
        self.lock().stats()
    }

    /// Run `f` against the state without cloning it.
    pub fn with_state<R>(&self, f: impl FnOnce(&ObserverState) -> R) -> R {
        f(&self.lock())
    }

    // ── Packet handling ──────────────────────────────────────────

    /// Decode one packet and apply it. A failed packet is counted as
    /// dropped and leaves the state untouched.
    pub fn handle_packet(&self, bytes: &[u8]) -> Result<PacketTag, DepthError> {
        let result = Packet::decode(bytes)
            .map_err(DepthError::from)
            .and_then(|packet| self.apply(packet));
        match result {
            Ok(tag) => {
                self.updates.send_modify(|seq| *seq += 1);
                Ok(tag)
            }
            Err(e) => {
                self.lock().record_dropped();
                Err(e)
            }
        }
    }

    fn apply(&self, packet: Packet) -> Result<PacketTag, DepthError> {
        let tag = packet.tag();
        match packet {
            Packet::StreamDescriptions(streams) => self.on_descriptions(streams),
            Packet::DepthFrame(frame) => self.on_frame(frame)?,
            Packet::DepthIntrinsics(table) => self.on_intrinsics(&table.compressed)?,
            Packet::DepthCapture(_) => {
                return Err(DepthError::Other(format!("unexpected {tag} packet")));
            }
        }
        Ok(tag)
    }

    fn on_descriptions(&self, streams: Vec<StreamDescription>) {
        info!(count = streams.len(), "stream descriptions received");
        for stream in &streams {
            info!("  {stream}");
        }
        self.lock().set_streams(streams);
    }

    fn on_frame(&self, frame: DepthFramePacket) -> Result<(), DepthError> {
        let expected = self.size().frame_bytes();
        let raw = self.compressor.decompress(&frame.compressed, expected)?;

        let mut state = self.lock();
        let image = state.frame_mut();
        image.timestamp = frame.timestamp;
        image.extrinsics = frame.extrinsics;
        image.copy_from_le_bytes(&raw);
        Ok(())
    }

    fn on_intrinsics(&self, compressed: &[u8]) -> Result<(), DepthError> {
        let expected = self.size().table_bytes();
        let raw = self.compressor.decompress(compressed, expected)?;

        let mut state = self.lock();
        state.intrinsics_mut().copy_from_bytes(&raw)?;
        debug!(valid = state.intrinsics().map(|t| t.valid_count()), "intrinsics table received");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, ObserverState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ── Transport wiring ─────────────────────────────────────────

    /// Register handlers for the three inbound tags and drain them in a
    /// background task until `shutdown` fires.
    ///
    /// Registration happens before this returns, so packets arriving
    /// right after a subsequent connect are not missed.
    pub fn spawn(
        self: &Arc<Self>,
        transport: &dyn Transport,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let mut descriptions = transport.register_handler(PacketTag::StreamDescriptions);
        let mut frames = transport.register_handler(PacketTag::DepthFrame);
        let mut tables = transport.register_handler(PacketTag::DepthIntrinsics);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                let packet = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    Some(p) = descriptions.recv() => p,
                    Some(p) = frames.recv() => p,
                    Some(p) = tables.recv() => p,
                    else => break,
                };
                this.handle_inbound(packet);
            }
            debug!("observer receiver stopped");
        })
    }

    fn handle_inbound(&self, packet: InboundPacket) {
        if let Err(e) = self.handle_packet(&packet.bytes) {
            warn!(connection = packet.connection, tag = %packet.tag, "packet dropped: {e}");
        }
    }

    /// Send the observer's capture toggle to every connected provider.
    pub async fn request_capture(
        transport: &dyn Transport,
        want_frames: bool,
        want_intrinsics_table: bool,
    ) -> Result<(), DepthError> {
        let request = CaptureRequest::new(want_frames, want_intrinsics_table);
        transport
            .broadcast(Packet::DepthCapture(request).encode())
            .await?;
        info!(want_frames, want_intrinsics_table, "capture request sent");
        Ok(())
    }
}
