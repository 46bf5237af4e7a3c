//! Provider-side capture lifecycle.
//!
//! Provides a `CaptureState` enum that models the device lifecycle
//! guarding the single streaming session, with validated transitions
//! that return `Result` instead of panicking.

use std::fmt;

use crate::error::DepthError;

/// The current phase of the capture device.
///
/// ```text
///  Uninitialized ──► Initializing ──► Idle ◄────────────────┐
///                         │            │                     │
///                         ▼            ▼  (start failed)     │
///                       Failed      Starting ──► Idle        │
///                                      │                     │
///                                      ▼                     │
///                                  Capturing ──► Stopping ───┘
/// ```
///
/// `Idle`, `Starting`, `Capturing` and `Stopping` together make up the
/// *initialized* states. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Uninitialized,
    /// Hardware bring-up running in the background.
    Initializing,
    Idle,
    /// Device start issued, waiting for it to complete.
    Starting,
    /// Continuous capture running; frames are being emitted.
    Capturing,
    /// Halting continuous capture and closing the stream.
    Stopping,
    /// Initialization failed; capture is unavailable until restart.
    Failed,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl CaptureState {
    pub fn is_initialized(&self) -> bool {
        matches!(
            self,
            Self::Idle | Self::Starting | Self::Capturing | Self::Stopping
        )
    }

    /// The capturing flag as seen by the remote: set from the moment a
    /// start is issued until a stop is issued or the start fails.
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Starting | Self::Capturing)
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Uninitialized`.
    pub fn begin_initialize(&mut self) -> Result<(), DepthError> {
        match self {
            Self::Uninitialized => {
                *self = Self::Initializing;
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot initialize: not in Uninitialized state",
            )),
        }
    }

    /// Valid from: `Initializing`. Success → `Idle`, failure → `Failed`.
    pub fn complete_initialize(&mut self, success: bool) -> Result<(), DepthError> {
        match self {
            Self::Initializing => {
                *self = if success { Self::Idle } else { Self::Failed };
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot complete initialization: not in Initializing state",
            )),
        }
    }

    /// Valid from: `Idle`.
    pub fn begin_start(&mut self) -> Result<(), DepthError> {
        match self {
            Self::Idle => {
                *self = Self::Starting;
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot start: not in Idle state",
            )),
        }
    }

    /// Valid from: `Starting`. Success → `Capturing`, failure → `Idle`.
    pub fn complete_start(&mut self, success: bool) -> Result<(), DepthError> {
        match self {
            Self::Starting => {
                *self = if success { Self::Capturing } else { Self::Idle };
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot complete start: not in Starting state",
            )),
        }
    }

    /// Valid from: `Capturing`.
    pub fn begin_stop(&mut self) -> Result<(), DepthError> {
        match self {
            Self::Capturing => {
                *self = Self::Stopping;
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot stop: not in Capturing state",
            )),
        }
    }

    /// Valid from: `Stopping`.
    pub fn complete_stop(&mut self) -> Result<(), DepthError> {
        match self {
            Self::Stopping => {
                *self = Self::Idle;
                Ok(())
            }
            _ => Err(DepthError::InvalidTransition(
                "cannot complete stop: not in Stopping state",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────
