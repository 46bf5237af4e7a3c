pub mod capture;
mod observer;
mod session;

pub use capture::CaptureState;
pub use observer::{ObserverState, ReceiverStats};
pub use session::CaptureSession;
