//! Error types for mplot_core

use thiserror::Error;

/// Errors surfaced by renderer backends
///
/// Per-draw calls never fail; these come out of construction, resize,
/// frame submission and pixel readback.
#[derive(Error, Debug)]
pub enum RenderError {
    /// GPU device, pipeline or submission failure
    #[error("GPU error: {0}")]
    Gpu(String),

    /// Render target has an unusable size
    #[error("invalid render target size {width}x{height}")]
    InvalidTarget { width: u32, height: u32 },

    /// Reading pixels back from the render target failed
    #[error("pixel readback failed: {0}")]
    Readback(String),

    /// Text subsystem failure
    #[error("text rendering failed: {0}")]
    Text(String),
}

/// Result type for mplot_core operations
pub type Result<T> = std::result::Result<T, RenderError>;
