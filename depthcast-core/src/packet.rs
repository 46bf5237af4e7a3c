//! Tagged packets: the unit handed to and received from the transport.
//!
//! A packet is its ASCII tag (as a length-prefixed string) followed by
//! the payload for that tag. Decoding verifies the tag before touching
//! the payload and requires every byte to be consumed.

use bytes::Bytes;

use crate::error::DecodeError;
use crate::message::PacketTag;
use crate::protocol::stream::{decode_descriptions, encode_descriptions};
use crate::protocol::{CaptureRequest, DepthFramePacket, DepthIntrinsicsPacket, StreamDescription};
use crate::wire::{WireReader, WireWriter};

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    StreamDescriptions(Vec<StreamDescription>),
    DepthCapture(CaptureRequest),
    DepthFrame(DepthFramePacket),
    DepthIntrinsics(DepthIntrinsicsPacket),
}

impl Packet {
    pub fn tag(&self) -> PacketTag {
        match self {
            Packet::StreamDescriptions(_) => PacketTag::StreamDescriptions,
            Packet::DepthCapture(_) => PacketTag::DepthCapture,
            Packet::DepthFrame(_) => PacketTag::DepthFrame,
            Packet::DepthIntrinsics(_) => PacketTag::DepthIntrinsics,
        }
    }

    pub fn encode(&self) -> Bytes {
        let hint = match self {
            Packet::DepthFrame(f) => f.compressed.len() + 96,
            Packet::DepthIntrinsics(i) => i.compressed.len() + 16,
            _ => 64,
        };
        let mut w = WireWriter::with_capacity(hint);
        w.write_string(self.tag().as_str());
        match self {
            Packet::StreamDescriptions(d) => encode_descriptions(d, &mut w),
            Packet::DepthCapture(req) => req.encode(&mut w),
            Packet::DepthFrame(frame) => frame.encode(&mut w),
            Packet::DepthIntrinsics(table) => table.encode(&mut w),
        }
        w.finish()
    }

    /// Decode any packet, dispatching on its tag.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(bytes);
        let tag = PacketTag::try_from(r.read_string()?.as_str())?;
        Self::decode_payload(tag, r)
    }

    /// Decode a packet that must carry `expected`.
    pub fn decode_as(expected: PacketTag, bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = WireReader::new(bytes);
        let found = r.read_string()?;
        if found != expected.as_str() {
            return Err(DecodeError::TagMismatch {
                expected: expected.as_str(),
                found,
            });
        }
        Self::decode_payload(expected, r)
    }

    fn decode_payload(tag: PacketTag, mut r: WireReader<'_>) -> Result<Self, DecodeError> {
        let packet = match tag {
            PacketTag::StreamDescriptions => {
                Packet::StreamDescriptions(decode_descriptions(&mut r)?)
            }
            PacketTag::DepthCapture => Packet::DepthCapture(CaptureRequest::decode(&mut r)?),
            PacketTag::DepthFrame => Packet::DepthFrame(DepthFramePacket::decode(&mut r)?),
            PacketTag::DepthIntrinsics => {
                Packet::DepthIntrinsics(DepthIntrinsicsPacket::decode(&mut r)?)
            }
        };
        r.finish()?;
        Ok(packet)
    }
}

/// Read only the tag of a packet, for dispatch.
pub fn peek_tag(bytes: &[u8]) -> Result<PacketTag, DecodeError> {
    let mut r = WireReader::new(bytes);
    PacketTag::try_from(r.read_string()?.as_str())
}

impl From<CaptureRequest> for Packet {
    fn from(req: CaptureRequest) -> Self {
        Packet::DepthCapture(req)
    }
}

impl From<DepthFramePacket> for Packet {
    fn from(frame: DepthFramePacket) -> Self {
        Packet::DepthFrame(frame)
    }
}

impl From<DepthIntrinsicsPacket> for Packet {
    fn from(table: DepthIntrinsicsPacket) -> Self {
        Packet::DepthIntrinsics(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CameraType, Extrinsics, StreamResolution};

    fn descriptors(n: usize) -> Vec<StreamDescription> {
        (0..n)
            .map(|i| {
                StreamDescription::new(
                    format!("Stream {i}"),
                    format!("Source#{i}"),
                    StreamResolution::new(320 + i as u32, 240, 15.0 + i as f64),
                    CameraType::try_from((i % 4) as i32).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn stream_descriptions_preserve_order_for_any_count() {
        for n in [0usize, 1, 2, 7, 130] {
            let packet = Packet::StreamDescriptions(descriptors(n));
            let decoded = Packet::decode(&packet.encode()).unwrap();
            assert_eq!(decoded, packet, "count {n}");
        }
    }

    #[test]
    fn empty_descriptions_are_tag_plus_zero_count() {
        let bytes = Packet::StreamDescriptions(Vec::new()).encode();
        assert_eq!(bytes.len(), 1 + "STREAMDESCR".len() + 4);
    }

    #[test]
    fn depth_frame_through_packet() {
        let packet = Packet::DepthFrame(DepthFramePacket {
            timestamp: 12.25,
            extrinsics: Extrinsics::translation(0.1, 0.2, 0.3),
            compressed: Bytes::from_static(b"zstd-bytes"),
        });
        let bytes = packet.encode();
        assert_eq!(peek_tag(&bytes).unwrap(), PacketTag::DepthFrame);
        assert_eq!(Packet::decode_as(PacketTag::DepthFrame, &bytes).unwrap(), packet);
    }

    #[test]
    fn decode_as_rejects_other_tag() {
        let bytes = Packet::DepthCapture(CaptureRequest::start(false)).encode();
        assert_eq!(
            Packet::decode_as(PacketTag::DepthFrame, &bytes),
            Err(DecodeError::TagMismatch {
                expected: "DEPTHFRAME",
                found: "DEPTHCAPTURE".into()
            })
        );
    }

    #[test]
    fn capture_with_trailing_byte_rejected() {
        let mut bytes = Packet::DepthCapture(CaptureRequest::start(true)).encode().to_vec();
        bytes.push(0);
        assert_eq!(Packet::decode(&bytes), Err(DecodeError::TrailingBytes(1)));
    }

    #[test]
    fn unknown_tag_rejected() {
        let mut w = WireWriter::new();
        w.write_string("HELLO");
        assert!(matches!(
            Packet::decode(&w.finish()),
            Err(DecodeError::UnknownTag(_))
        ));
    }

    #[test]
    fn intrinsics_has_no_length_prefix() {
        let bytes = Packet::DepthIntrinsics(DepthIntrinsicsPacket {
            compressed: Bytes::from_static(&[1, 2, 3]),
        })
        .encode();
        let header = 1 + "DEPTHINTRINSICS".len();
        assert_eq!(bytes.len(), header + 3);
        assert_eq!(&bytes[header..], &[1, 2, 3]);
    }
}
