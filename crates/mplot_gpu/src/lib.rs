//! mplot GPU Renderer
//!
//! Instanced plot-primitive rendering using wgpu.
//!
//! # Features
//!
//! - **Single record format**: every primitive packs into one 80-byte instance
//! - **Faces before overlays**: a stable partition keeps depth-writing fills
//!   ahead of blended strokes, drawn with two pipelines from one buffer
//! - **Growable buffers**: the instance buffer grows with headroom and never shrinks
//! - **Markers and dashes**: distance-function coverage for every marker shape
//! - **Text and images**: per-call textured quads, text rasterized with swash
//! - **Headless output**: offscreen targets with pixel readback

pub mod batch;
pub mod capture;
pub mod error;
pub mod headless;
pub mod instance;
pub mod primitives;
pub mod renderer;
pub mod shaders;
pub mod text;

pub use batch::{InstanceBatch, INITIAL_INSTANCE_CAPACITY, INSTANCE_HEADROOM};
pub use capture::{padded_bytes_per_row, read_texture, unpad_rows, OffscreenTarget};
pub use error::{GpuError, TextError};
pub use headless::HeadlessRenderer;
pub use instance::{
    pack_circle, pack_line, pack_rect, pack_textured_quad, pack_triangle, Instance,
    PrimitiveTag, QuadPlacement, FULL_UV,
};
pub use primitives::Uniforms;
pub use renderer::{GpuRenderer, RendererConfig};
pub use shaders::{PRIMITIVE_SHADER, TEXTURED_QUAD_SHADER};
pub use text::{RasterizedText, TextRasterizer};
