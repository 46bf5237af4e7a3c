//! # Depth streaming pipeline
//!
//! ```text
//! PROVIDER                                    OBSERVER
//! ┌──────────────────────────┐               ┌────────────────────────┐
//! │ DepthDevice (thread)     │               │ Transport handlers     │
//! │   ↓ FrameSink            │               │   ↓                    │
//! │ CaptureController task   │   TCP         │ ObserverReceiver       │
//! │   ↓ FrameCompressor      │ ──────────►   │   ↓ FrameCompressor    │
//! │   ↓ IntrinsicsTable      │               │ ObserverState          │
//! │ Transport::send_to       │               │   (latest frame/table) │
//! └──────────────────────────┘               └────────────────────────┘
//!
//! Control: Observer ──[DEPTHCAPTURE]──► Provider CaptureController
//! ```
//!
//! ## Sub-modules
//!
//! | Module       | Purpose                                              |
//! |--------------|------------------------------------------------------|
//! | `types`      | Frame geometry and in-memory frame types             |
//! | `device`     | Blocking device lifecycle trait and frame hand-off   |
//! | `compressor` | Stateless zstd compression with length verification  |
//! | `intrinsics` | Per-pixel unit-plane lookup table                    |
//! | `controller` | Provider-side capture state machine task             |
//! | `receiver`   | Observer-side packet decoding into latest state      |

pub mod compressor;
pub mod controller;
pub mod device;
pub mod intrinsics;
pub mod receiver;
pub mod types;

pub use compressor::{DEFAULT_COMPRESSION_LEVEL, FrameCompressor};
pub use controller::{CaptureController, ControllerConfig, select_stream};
pub use device::{DepthDevice, FrameSink};
pub use intrinsics::{IntrinsicsTable, UnitPlaneMapper, UnitPlanePoint};
pub use receiver::ObserverReceiver;
pub use types::{CapturedFrame, DepthImage, FrameSize};
