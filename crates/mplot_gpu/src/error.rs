//! Error types for the GPU renderer

use mplot_core::RenderError;
use thiserror::Error;

/// GPU renderer errors
#[derive(Error, Debug)]
pub enum GpuError {
    /// No adapter matched the requested backends and power preference
    #[error("no suitable GPU adapter found")]
    AdapterNotFound,

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    /// A validation error captured by an error scope around a frame
    #[error("GPU validation failed: {0}")]
    Validation(String),

    #[error("readback failed: {0}")]
    Readback(String),

    /// Zero-sized render targets are rejected
    #[error("invalid target size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Text subsystem errors
#[derive(Error, Debug)]
pub enum TextError {
    #[error("no usable sans-serif font found")]
    NoFont,

    #[error("font could not be parsed: {0}")]
    InvalidFont(String),
}

impl From<GpuError> for RenderError {
    fn from(err: GpuError) -> Self {
        match err {
            GpuError::InvalidSize { width, height } => RenderError::InvalidTarget { width, height },
            GpuError::Readback(msg) => RenderError::Readback(msg),
            other => RenderError::Gpu(other.to_string()),
        }
    }
}

impl From<TextError> for RenderError {
    fn from(err: TextError) -> Self {
        RenderError::Text(err.to_string())
    }
}
