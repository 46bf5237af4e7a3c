//! Payload definitions for the depthcast protocol.
//!
//! Each sub-module defines the structured payloads for one side of the
//! exchange. Payloads are hand-encoded with [`WireWriter`]/[`WireReader`]
//! and carried inside [`Packet`] bodies after the ASCII tag.
//!
//! [`WireWriter`]: crate::wire::WireWriter
//! [`WireReader`]: crate::wire::WireReader
//! [`Packet`]: crate::packet::Packet

pub mod depth;
pub mod stream;

pub use depth::{CaptureRequest, DepthFramePacket, DepthIntrinsicsPacket, Extrinsics};
pub use stream::{CameraType, StreamDescription, StreamResolution};
