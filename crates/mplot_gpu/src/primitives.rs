//! Uniform data shared by every pipeline
//!
//! `#[repr(C)]` + `bytemuck::Pod` so the struct can be written straight into
//! the uniform buffer.

use mplot_core::Mat4;

/// Per-frame uniforms (96 bytes)
///
/// Memory layout:
/// - `view_proj`: mat4x4<f32> (64 bytes) - device pixels (or world) to clip space
/// - `screen_size`: vec2<f32> (8 bytes) - target size in pixels
/// - `_padding`: vec2<f32> (8 bytes)
/// - `camera_pos`: vec4<f32> (16 bytes) - eye position for 3D content, w unused
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Uniforms {
    pub view_proj: [[f32; 4]; 4],
    pub screen_size: [f32; 2],
    pub _padding: [f32; 2],
    pub camera_pos: [f32; 4],
}

impl Uniforms {
    /// Uniforms for a `width x height` target
    ///
    /// Without a custom projection, device pixels (top-left origin) map to
    /// clip space through [`Mat4::screen`].
    pub fn new(width: u32, height: u32, view_proj: Option<Mat4>, camera_pos: [f32; 3]) -> Self {
        let (w, h) = (width as f32, height as f32);
        let matrix = view_proj.unwrap_or_else(|| Mat4::screen(w, h));
        Self {
            view_proj: matrix.to_cols_array(),
            screen_size: [w, h],
            _padding: [0.0; 2],
            camera_pos: [camera_pos[0], camera_pos[1], camera_pos[2], 1.0],
        }
    }
}
