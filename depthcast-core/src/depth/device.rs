//! Capture device abstraction.
//!
//! The physical acquisition pipeline lives outside this crate. A device
//! implementation exposes a blocking lifecycle (`initialize`, `start`,
//! `start_continuous_capture`, `stop_continuous_capture`, `stop`) and
//! pushes captured frames into a [`FrameSink`] from its own thread.
//!
//! Lifecycle calls are blocking and are only ever issued by the
//! [`CaptureController`] task via `spawn_blocking`, never from inside the
//! device's frame delivery path.
//!
//! [`CaptureController`]: crate::depth::controller::CaptureController

use tokio::sync::mpsc;
use tracing::debug;

use crate::depth::types::CapturedFrame;
use crate::error::DepthError;
use crate::protocol::StreamDescription;

/// Blocking capture device lifecycle.
pub trait DepthDevice: Send + Sync + 'static {
    /// Bring up the hardware. Called once, on a blocking worker.
    fn initialize(&self) -> Result<(), DepthError>;

    /// Streams the device can be started with, in advertisement order.
    fn stream_descriptions(&self) -> Vec<StreamDescription>;

    /// Open `stream`. Does not begin frame delivery.
    fn start(&self, stream: &StreamDescription) -> Result<(), DepthError>;

    /// Begin pushing frames into `sink` until halted.
    fn start_continuous_capture(&self, sink: FrameSink) -> Result<(), DepthError>;

    /// Halt frame delivery. Must be called before [`stop`](Self::stop).
    fn stop_continuous_capture(&self) -> Result<(), DepthError>;

    /// Close the open stream.
    fn stop(&self) -> Result<(), DepthError>;
}

// ── FrameSink ────────────────────────────────────────────────────

/// Non-blocking frame hand-off from the device thread to the controller.
///
/// There is no backpressure: when the queue is full the frame is
/// dropped so the capture thread never stalls on a slow transport.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<CapturedFrame>,
}

impl FrameSink {
    pub fn new(tx: mpsc::Sender<CapturedFrame>) -> Self {
        Self { tx }
    }

    /// A sink plus its receiving end, holding at most `depth` frames.
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<CapturedFrame>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (Self { tx }, rx)
    }

    /// Hand a frame over. Returns `false` if it was dropped.
    pub fn deliver(&self, frame: CapturedFrame) -> bool {
        match self.tx.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("frame queue full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Whether the controller side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::depth::types::FrameSize;
    use crate::protocol::Extrinsics;

    fn frame() -> CapturedFrame {
        CapturedFrame::new(FrameSize::new(1, 1), vec![7], Extrinsics::IDENTITY)
    }

    #[test]
    fn full_queue_drops() {
        let (sink, mut rx) = FrameSink::channel(1);
        assert!(sink.deliver(frame()));
        assert!(!sink.deliver(frame()));
        assert_eq!(rx.try_recv().unwrap().pixels, vec![7]);
        assert!(sink.deliver(frame()));
    }

    #[test]
    fn closed_receiver_drops() {
        let (sink, rx) = FrameSink::channel(4);
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.deliver(frame()));
    }
}
