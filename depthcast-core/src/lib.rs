//! # depthcast-core
//!
//! Protocol library for streaming depth-sensor frames and a per-pixel
//! calibration table from a capture provider to a remote observer.
//!
//! This crate contains:
//! - **Wire**: `WireWriter` / `WireReader` little-endian primitives
//! - **Protocol types**: `StreamDescription`, `CaptureRequest`, `DepthFramePacket`, `DepthIntrinsicsPacket`
//! - **Packet**: tag-dispatched `Packet` enum and `PacketTag`
//! - **Codec**: `DepthCodec` for length-prefixed framing via `tokio_util`
//! - **Network**: the `Transport` trait and its `TcpTransport` implementation
//! - **Depth**: compression, intrinsics tables, the capture controller and the observer receiver
//! - **State**: capture lifecycle state machine and observer state
//! - **Error**: `DepthError`, `DecodeError`, `TransportError` via `thiserror`

pub mod codec;
pub mod depth;
pub mod error;
pub mod message;
pub mod network;
pub mod packet;
pub mod protocol;
pub mod state;
pub mod wire;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use codec::{DepthCodec, MAX_FRAME_SIZE};
pub use depth::{
    CaptureController, CapturedFrame, ControllerConfig, DepthDevice, DepthImage, FrameCompressor,
    FrameSize, FrameSink, IntrinsicsTable, ObserverReceiver, UnitPlaneMapper, UnitPlanePoint,
};
pub use error::{DecodeError, DepthError, TransportError};
pub use message::PacketTag;
pub use network::{ConnectionEvent, ConnectionId, TcpTransport, Transport};
pub use packet::Packet;
pub use protocol::{
    CameraType, CaptureRequest, DepthFramePacket, DepthIntrinsicsPacket, Extrinsics,
    StreamDescription, StreamResolution,
};
pub use state::{CaptureState, ObserverState, ReceiverStats};
