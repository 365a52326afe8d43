//! Pulse Globe application: window, event loop, frame pacing and frame capture.

pub mod capture;
pub mod error;
pub mod frame_clock;
pub mod window;

pub use capture::{CaptureError, FrameCapture};
pub use error::AppError;
pub use frame_clock::{ClockMode, FrameAdvance, FrameClock};
pub use window::{App, run};
