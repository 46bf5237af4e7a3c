//! Packet tags used for command dispatch.
//!
//! Every packet starts with one of these ASCII tags. Uses `TryFrom`:
//! an unknown tag is a [`DecodeError`], never a panic.

use std::fmt;

use crate::error::DecodeError;

/// The four commands understood by the depthcast protocol.
///
/// | Tag                 | Direction            |
/// |---------------------|----------------------|
/// | `STREAMDESCR`       | provider → observer  |
/// | `DEPTHCAPTURE`      | observer → provider  |
/// | `DEPTHFRAME`        | provider → observer  |
/// | `DEPTHINTRINSICS`   | provider → observer  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketTag {
    /// Advertised stream descriptions.
    StreamDescriptions,
    /// Capture toggle request.
    DepthCapture,
    /// One compressed depth frame.
    DepthFrame,
    /// The compressed per-pixel intrinsics table.
    DepthIntrinsics,
}

impl PacketTag {
    /// All tags, in wire-table order.
    pub const ALL: [PacketTag; 4] = [
        PacketTag::StreamDescriptions,
        PacketTag::DepthCapture,
        PacketTag::DepthFrame,
        PacketTag::DepthIntrinsics,
    ];

    /// The ASCII tag written at the start of the packet.
    pub const fn as_str(self) -> &'static str {
        match self {
            PacketTag::StreamDescriptions => "STREAMDESCR",
            PacketTag::DepthCapture => "DEPTHCAPTURE",
            PacketTag::DepthFrame => "DEPTHFRAME",
            PacketTag::DepthIntrinsics => "DEPTHINTRINSICS",
        }
    }
}

impl TryFrom<&str> for PacketTag {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        PacketTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == value)
            .ok_or_else(|| DecodeError::UnknownTag(value.to_string()))
    }
}

impl fmt::Display for PacketTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for tag in PacketTag::ALL {
            assert_eq!(PacketTag::try_from(tag.as_str()).unwrap(), tag);
        }
    }

    #[test]
    fn tag_invalid() {
        assert_eq!(
            PacketTag::try_from("DEPTHFRAMES"),
            Err(DecodeError::UnknownTag("DEPTHFRAMES".into()))
        );
    }

    #[test]
    fn display_is_wire_tag() {
        assert_eq!(PacketTag::DepthIntrinsics.to_string(), "DEPTHINTRINSICS");
    }
}
