//! Domain-specific error types for the depthcast protocol.
//!
//! All fallible operations return `Result<T, DepthError>` or one of the
//! narrower enums below. No panics on invalid input: a malformed packet is
//! a typed, recoverable error that drops that packet only.

use thiserror::Error;

/// The canonical error type for depthcast.
#[derive(Debug, Error)]
pub enum DepthError {
    // ── Capture Errors ───────────────────────────────────────────
    /// No advertised stream matched the configured name/id filters.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The capture device reported a failed init or start.
    #[error("device error: {0}")]
    Device(String),

    /// Device initialization failed earlier; capture is unavailable
    /// until the process restarts.
    #[error("capture feature unavailable: device initialization failed")]
    FeatureUnavailable,

    /// A state machine transition was attempted from the wrong state.
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),

    // ── Payload Errors ───────────────────────────────────────────
    /// Decompressed payload did not have the expected length, or the
    /// compressed stream itself was corrupt.
    #[error("data corruption: expected {expected} bytes, got {actual}")]
    DataCorruption { expected: usize, actual: usize },

    /// A packet payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    // ── Transport Errors ─────────────────────────────────────────
    /// The transport rejected a send or violated framing.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The TCP/IO layer reported an error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── DecodeError ───────────────────────────────────────────────────

/// Errors raised while interpreting a packet payload.
///
/// These are distinct from [`TransportError`]: the transport guarantees
/// framing, so a `DecodeError` always means the bytes inside a correctly
/// framed packet disagree with the packet layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload ended before a field could be read.
    #[error("unexpected end of packet: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The packet tag is not one this protocol knows.
    #[error("unknown packet tag: {0:?}")]
    UnknownTag(String),

    /// The packet tag differs from the one the handler expected.
    #[error("tag mismatch: expected {expected}, found {found}")]
    TagMismatch { expected: &'static str, found: String },

    /// A declared length field disagrees with the bytes actually present.
    #[error("length mismatch: declared {declared}, remaining {remaining}")]
    LengthMismatch { declared: i64, remaining: usize },

    /// Bytes were left over after every declared field was consumed.
    #[error("{0} trailing bytes after packet")]
    TrailingBytes(usize),

    /// A count or dimension field was negative.
    #[error("negative {field}: {value}")]
    NegativeValue { field: &'static str, value: i32 },

    /// A 7-bit encoded length ran past five bytes.
    #[error("malformed variable-length integer")]
    MalformedVarint,

    /// A string field was not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    InvalidUtf8,

    /// A numeric value did not map to any known enum variant.
    #[error("unknown {type_name} discriminant: {value}")]
    UnknownVariant { type_name: &'static str, value: i64 },
}

// ── TransportError ────────────────────────────────────────────────

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The target connection is gone (torn down or never existed).
    #[error("connection {0} is closed")]
    ConnectionClosed(u64),

    /// No connection is open to broadcast to.
    #[error("no open connections")]
    NotConnected,

    /// Frame size exceeded the codec limit.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// The socket reported an error.
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for DepthError {
    fn from(s: String) -> Self {
        DepthError::Other(s)
    }
}

impl From<&str> for DepthError {
    fn from(s: &str) -> Self {
        DepthError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for DepthError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        DepthError::ChannelClosed
    }
}

impl From<tokio::task::JoinError> for DepthError {
    fn from(e: tokio::task::JoinError) -> Self {
        DepthError::Other(format!("blocking task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = DepthError::DataCorruption {
            expected: 403200,
            actual: 12,
        };
        assert!(e.to_string().contains("403200"));
        assert!(e.to_string().contains("12"));

        let e = DepthError::Configuration("no stream matches".into());
        assert!(e.to_string().starts_with("configuration error"));
    }

    #[test]
    fn decode_error_wraps() {
        let e: DepthError = DecodeError::TrailingBytes(3).into();
        assert!(matches!(e, DepthError::Decode(DecodeError::TrailingBytes(3))));
    }

    #[test]
    fn from_string() {
        let e: DepthError = "something broke".into();
        assert!(matches!(e, DepthError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: DepthError = io_err.into();
        assert!(matches!(e, DepthError::Io(_)));
    }
}
