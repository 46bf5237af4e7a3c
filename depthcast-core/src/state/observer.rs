//! Observer-side state: the latest values only, no history.

use crate::depth::intrinsics::IntrinsicsTable;
use crate::depth::types::{DepthImage, FrameSize};
use crate::protocol::StreamDescription;

/// Counters for the receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub frames: u64,
    pub tables: u64,
    /// Packets dropped for decode or corruption errors.
    pub dropped: u64,
}

#[derive(Debug, Clone)]
pub struct ObserverState {
    streams: Vec<StreamDescription>,
    frame: DepthImage,
    has_frame: bool,
    intrinsics: IntrinsicsTable,
    has_intrinsics: bool,
    stats: ReceiverStats,
}

impl ObserverState {
    /// Buffers for `size` are allocated once and overwritten in place.
    pub fn new(size: FrameSize) -> Self {
        Self {
            streams: Vec::new(),
            frame: DepthImage::blank(size),
            has_frame: false,
            intrinsics: IntrinsicsTable::empty(size),
            has_intrinsics: false,
            stats: ReceiverStats::default(),
        }
    }

    pub fn size(&self) -> FrameSize {
        self.frame.size
    }

    pub fn streams(&self) -> &[StreamDescription] {
        &self.streams
    }

    pub fn set_streams(&mut self, streams: Vec<StreamDescription>) {
        self.streams = streams;
    }

    /// Last received frame, if any arrived.
    pub fn frame(&self) -> Option<&DepthImage> {
        self.has_frame.then_some(&self.frame)
    }

    /// Mutable access to the frame buffer. Marks it as received.
    pub fn frame_mut(&mut self) -> &mut DepthImage {
        self.has_frame = true;
        self.stats.frames += 1;
        &mut self.frame
    }

    pub fn intrinsics(&self) -> Option<&IntrinsicsTable> {
        self.has_intrinsics.then_some(&self.intrinsics)
    }

    /// Mutable access to the table buffer. Marks it as received.
    pub fn intrinsics_mut(&mut self) -> &mut IntrinsicsTable {
        self.has_intrinsics = true;
        self.stats.tables += 1;
        &mut self.intrinsics
    }

    pub fn record_dropped(&mut self) {
        self.stats.dropped += 1;
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }
}
