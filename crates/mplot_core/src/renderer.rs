//! Renderer capability trait
//!
//! [`PlotRenderer`] is the boundary between the collector and a backend.
//! Backends are picked at construction time: [`RecordingRenderer`] for
//! tests and replay, [`SoftwareRenderer`] for CPU output, and the GPU
//! `HeadlessRenderer` in `mplot_gpu`.
//!
//! [`RecordingRenderer`]: crate::RecordingRenderer
//! [`SoftwareRenderer`]: crate::SoftwareRenderer

use crate::color::Color;
use crate::error::Result;
use crate::math::Mat4;
use crate::primitives::{Circle, ImageCommand, Line, Rect, TextCommand, Triangle};
use crate::transform::Size;

/// Backend that turns device-space primitives into pixels
///
/// Every batch call receives the physical target size the primitives were
/// computed against. Draw calls never fail; errors surface from
/// [`finish_frame`](PlotRenderer::finish_frame) and
/// [`resize`](PlotRenderer::resize).
pub trait PlotRenderer {
    // ─────────────────────────────────────────────────────────────────────────
    // Geometry
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw filled or stroked rectangles
    fn draw_rects(&mut self, rects: &[Rect], target: Size);

    /// Draw line segments
    fn draw_lines(&mut self, lines: &[Line], target: Size);

    /// Draw point markers
    fn draw_circles(&mut self, circles: &[Circle], target: Size);

    /// Draw lit or unlit triangles
    fn draw_triangles(&mut self, triangles: &[Triangle], target: Size);

    // ─────────────────────────────────────────────────────────────────────────
    // Text and images
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw a string; a no-op when [`supports_text`](Self::supports_text) is false
    fn draw_text(&mut self, text: &TextCommand);

    /// Advance width of `text` at `font_size`, in pixels
    fn measure_text(&mut self, text: &str, font_size: f32) -> f32;

    fn draw_image(&mut self, image: &ImageCommand);

    // ─────────────────────────────────────────────────────────────────────────
    // Frame control
    // ─────────────────────────────────────────────────────────────────────────

    /// Set the color the next frame starts from
    fn clear(&mut self, color: Color);

    /// Whether fonts are available to this backend
    fn supports_text(&self) -> bool;

    /// Change the physical target size (between frames only)
    fn resize(&mut self, _width: u32, _height: u32) -> Result<()> {
        Ok(())
    }

    /// Replace the default pixel-space projection, or restore it with `None`
    fn set_view_projection(&mut self, _view_proj: Option<Mat4>) {}

    /// Submit everything drawn since the last call
    fn finish_frame(&mut self) -> Result<()> {
        Ok(())
    }
}

macro_rules! forward_plot_renderer {
    ($($ty:ty),*) => {$(
        impl<R: PlotRenderer + ?Sized> PlotRenderer for $ty {
            fn draw_rects(&mut self, rects: &[Rect], target: Size) {
                (**self).draw_rects(rects, target)
            }
            fn draw_lines(&mut self, lines: &[Line], target: Size) {
                (**self).draw_lines(lines, target)
            }
            fn draw_circles(&mut self, circles: &[Circle], target: Size) {
                (**self).draw_circles(circles, target)
            }
            fn draw_triangles(&mut self, triangles: &[Triangle], target: Size) {
                (**self).draw_triangles(triangles, target)
            }
            fn draw_text(&mut self, text: &TextCommand) {
                (**self).draw_text(text)
            }
            fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
                (**self).measure_text(text, font_size)
            }
            fn draw_image(&mut self, image: &ImageCommand) {
                (**self).draw_image(image)
            }
            fn clear(&mut self, color: Color) {
                (**self).clear(color)
            }
            fn supports_text(&self) -> bool {
                (**self).supports_text()
            }
            fn resize(&mut self, width: u32, height: u32) -> Result<()> {
                (**self).resize(width, height)
            }
            fn set_view_projection(&mut self, view_proj: Option<Mat4>) {
                (**self).set_view_projection(view_proj)
            }
            fn finish_frame(&mut self) -> Result<()> {
                (**self).finish_frame()
            }
        }
    )*};
}

forward_plot_renderer!(Box<R>, &mut R);
