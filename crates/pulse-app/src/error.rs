use pulse_render::{RenderContextError, ShaderError, SurfaceError};

use crate::capture::CaptureError;

/// Failures that end the application.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    Gpu(#[from] RenderContextError),

    #[error("shader setup failed: {0}")]
    Shader(#[from] ShaderError),

    #[error("frame capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),
}
