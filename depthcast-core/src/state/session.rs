//! Provider-side session state.
//!
//! Owned by the controller task; nothing else mutates it.

use std::time::Instant;

use crate::network::ConnectionId;
use crate::protocol::StreamDescription;
use crate::state::capture::CaptureState;

#[derive(Debug, Default)]
pub struct CaptureSession {
    state: CaptureState,

    /// Stream chosen by the last successful selection.
    stream: Option<StreamDescription>,

    /// The single connection frames are delivered to.
    target: Option<ConnectionId>,

    /// One-shot: send the intrinsics table with the next frame.
    intrinsics_pending: bool,

    /// Frame timestamps are measured from here.
    clock: Option<Instant>,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut CaptureState {
        &mut self.state
    }

    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing()
    }

    pub fn stream(&self) -> Option<&StreamDescription> {
        self.stream.as_ref()
    }

    pub fn set_stream(&mut self, stream: StreamDescription) {
        self.stream = Some(stream);
    }

    // ── Delivery target ──────────────────────────────────────────

    pub fn target(&self) -> Option<ConnectionId> {
        self.target
    }

    /// Last writer wins. Returns the previous target if it changed.
    pub fn retarget(&mut self, connection: ConnectionId) -> Option<ConnectionId> {
        match self.target.replace(connection) {
            Some(prev) if prev != connection => Some(prev),
            _ => None,
        }
    }

    /// Forget the target if it is `connection`.
    pub fn release_target(&mut self, connection: ConnectionId) -> bool {
        if self.target == Some(connection) {
            self.target = None;
            return true;
        }
        false
    }

    // ── Intrinsics one-shot ──────────────────────────────────────

    pub fn intrinsics_pending(&self) -> bool {
        self.intrinsics_pending
    }

    pub fn set_intrinsics_pending(&mut self, pending: bool) {
        self.intrinsics_pending = pending;
    }

    // ── Clock ────────────────────────────────────────────────────

    pub fn reset_clock(&mut self) {
        self.clock = Some(Instant::now());
    }

    /// Seconds since the last connection was established, or `0.0` if
    /// none has been.
    pub fn elapsed_secs(&self) -> f32 {
        self.secs_at(Instant::now())
    }

    /// Seconds from the last connection to `instant`. Instants before
    /// the connection count as `0.0`.
    pub fn secs_at(&self, instant: Instant) -> f32 {
        self.clock
            .map(|since| instant.saturating_duration_since(since).as_secs_f32())
            .unwrap_or(0.0)
    }
}
