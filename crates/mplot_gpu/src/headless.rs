//! Offscreen GPU backend for [`PlotCollector`](mplot_core::PlotCollector)
//!
//! Renders each frame into an [`OffscreenTarget`] in one pass and keeps the
//! result until the next frame, so tests and image exporters can read the
//! pixels back.

use mplot_core::{
    Circle, Color, ImageCommand, Line, Mat4, PlotRenderer, Rect, RenderError, Size, TextCommand,
    Triangle,
};

use crate::capture::OffscreenTarget;
use crate::error::GpuError;
use crate::instance::QuadPlacement;
use crate::renderer::{GpuRenderer, RendererConfig};
use crate::text::{TextRasterizer, PADDING};

/// [`PlotRenderer`] backed by [`GpuRenderer`] and an offscreen texture
pub struct HeadlessRenderer {
    gpu: GpuRenderer,
    target: OffscreenTarget,
    text: Option<TextRasterizer>,
    clear_color: Color,
    frames: u64,
}

impl HeadlessRenderer {
    /// Create a renderer with a `width x height` target
    ///
    /// Text is disabled for the session when no font can be loaded.
    pub async fn new(width: u32, height: u32, config: RendererConfig) -> Result<Self, GpuError> {
        if width == 0 || height == 0 {
            return Err(GpuError::InvalidSize { width, height });
        }

        let mut gpu = GpuRenderer::new(config.clone()).await?;
        gpu.resize(width, height)?;
        let target = OffscreenTarget::new(gpu.device(), width, height, gpu.texture_format())?;

        let text = if config.text_enabled {
            match TextRasterizer::new() {
                Ok(text) => Some(text),
                Err(err) => {
                    tracing::warn!("text rendering disabled: {err}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            gpu,
            target,
            text,
            clear_color: Color::WHITE,
            frames: 0,
        })
    }

    /// Blocking variant of [`new`](Self::new) with the default config
    pub fn blocking(width: u32, height: u32) -> Result<Self, GpuError> {
        pollster::block_on(Self::new(width, height, RendererConfig::default()))
    }

    /// Use a caller-supplied font instead of the system one
    pub fn with_text_rasterizer(mut self, text: TextRasterizer) -> Self {
        self.text = Some(text);
        self
    }

    pub fn gpu(&self) -> &GpuRenderer {
        &self.gpu
    }

    pub fn gpu_mut(&mut self) -> &mut GpuRenderer {
        &mut self.gpu
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    /// Frames submitted so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Tightly packed RGBA8 pixels of the last submitted frame
    pub fn read_pixels(&self) -> Result<Vec<u8>, GpuError> {
        self.target.read_pixels(self.gpu.device(), self.gpu.queue())
    }

    /// Per-axis factor from the size primitives were computed against to the target
    fn scale_for(&self, target: Size) -> (f32, f32) {
        if target.is_empty() {
            return (1.0, 1.0);
        }
        (
            self.width() as f32 / target.width,
            self.height() as f32 / target.height,
        )
    }
}

impl PlotRenderer for HeadlessRenderer {
    fn draw_rects(&mut self, rects: &[Rect], target: Size) {
        let (sx, sy) = self.scale_for(target);
        let s = sx.min(sy);
        for rect in rects {
            self.gpu.draw_rect(&Rect {
                x: rect.x * sx,
                y: rect.y * sy,
                width: rect.width * sx,
                height: rect.height * sy,
                stroke_width: rect.stroke_width * s,
                corner_radius: rect.corner_radius * s,
                color: rect.color.sanitized(),
                ..*rect
            });
        }
    }

    fn draw_lines(&mut self, lines: &[Line], target: Size) {
        let (sx, sy) = self.scale_for(target);
        let s = sx.min(sy);
        for line in lines {
            if !line.start.is_finite() || !line.end.is_finite() {
                continue;
            }
            let mut scaled = *line;
            scaled.start.x *= sx;
            scaled.start.y *= sy;
            scaled.end.x *= sx;
            scaled.end.y *= sy;
            scaled.width *= s;
            scaled.dash.dash *= s;
            scaled.dash.gap *= s;
            scaled.dash.offset *= s;
            scaled.color = line.color.sanitized();
            self.gpu.draw_line(&scaled);
        }
    }

    fn draw_circles(&mut self, circles: &[Circle], target: Size) {
        let (sx, sy) = self.scale_for(target);
        let s = sx.min(sy);
        for circle in circles {
            let mut scaled = *circle;
            scaled.center.x *= sx;
            scaled.center.y *= sy;
            scaled.radius *= s;
            scaled.stroke_width *= s;
            scaled.color = circle.color.sanitized();
            self.gpu.draw_circle(&scaled);
        }
    }

    fn draw_triangles(&mut self, triangles: &[Triangle], target: Size) {
        let (sx, sy) = self.scale_for(target);
        for tri in triangles {
            let mut scaled = *tri;
            for v in &mut scaled.vertices {
                v.x *= sx;
                v.y *= sy;
            }
            scaled.color = tri.color.sanitized();
            self.gpu.draw_triangle(&scaled);
        }
    }

    fn draw_text(&mut self, cmd: &TextCommand) {
        let Some(text) = self.text.as_mut() else {
            return;
        };
        let Some(bitmap) = text.rasterize(&cmd.text, cmd.font_size, cmd.color) else {
            return;
        };

        // The anchor is the left end of the baseline; the quad rotates about its top-left
        let (s, c) = cmd.rotation.sin_cos();
        let (dx, dy) = (-(PADDING as f32), -(bitmap.baseline as f32));
        let placement = QuadPlacement::new(
            cmd.x + dx * c + dy * s,
            cmd.y - dx * s + dy * c,
            bitmap.width as f32,
            bitmap.height as f32,
        )
        .with_rotation(cmd.rotation);

        self.gpu
            .draw_textured_quad(&bitmap.pixels, bitmap.width, bitmap.height, placement);
    }

    fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
        match &self.text {
            Some(raster) => raster.measure(text, font_size),
            None => text.chars().count() as f32 * font_size * 0.5,
        }
    }

    fn draw_image(&mut self, image: &ImageCommand) {
        let rgba = image.to_rgba8();
        let placement =
            QuadPlacement::new(image.x, image.y, image.display_width, image.display_height);
        self.gpu
            .draw_textured_quad(&rgba, image.width, image.height, placement);
    }

    fn clear(&mut self, color: Color) {
        self.clear_color = color.sanitized();
    }

    fn supports_text(&self) -> bool {
        self.text.is_some()
    }

    fn resize(&mut self, width: u32, height: u32) -> mplot_core::Result<()> {
        if width == self.width() && height == self.height() {
            return Ok(());
        }
        self.target = OffscreenTarget::new(self.gpu.device(), width, height, self.gpu.texture_format())?;
        self.gpu.resize(width, height)?;
        tracing::debug!(width, height, "resized offscreen target");
        Ok(())
    }

    fn set_view_projection(&mut self, view_proj: Option<Mat4>) {
        self.gpu.set_view_projection(view_proj);
    }

    fn finish_frame(&mut self) -> mplot_core::Result<()> {
        let c = self.clear_color;
        self.gpu.push_error_scope();
        self.gpu.prepare();

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Plot Frame Encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Plot Frame Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: c.r as f64,
                            g: c.g as f64,
                            b: c.b as f64,
                            a: c.a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.gpu.render(&mut pass);
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));

        let result = self.gpu.pop_error_scope();
        self.gpu.clear();
        self.frames += 1;
        result.map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mplot_core::{PlotCollector, Point3, SoftwareRenderer};

    fn pixel(pixels: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * width + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    fn headless(width: u32, height: u32) -> HeadlessRenderer {
        let config = RendererConfig {
            text_enabled: false,
            ..Default::default()
        };
        pollster::block_on(HeadlessRenderer::new(width, height, config)).expect("GPU adapter")
    }

    #[test]
    fn test_zero_size_is_rejected_before_device_creation() {
        let result = pollster::block_on(HeadlessRenderer::new(0, 10, RendererConfig::default()));
        assert!(matches!(result, Err(GpuError::InvalidSize { width: 0, height: 10 })));
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_rect_on_background() {
        let mut gpu = headless(64, 64);
        let target = Size::new(64.0, 64.0);
        gpu.clear(Color::WHITE);
        gpu.draw_rects(&[Rect::filled(16.0, 16.0, 32.0, 32.0, Color::RED)], target);
        gpu.finish_frame().unwrap();

        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixels.len(), 64 * 64 * 4);
        assert_eq!(pixel(&pixels, 64, 32, 32), [255, 0, 0, 255]);
        assert_eq!(pixel(&pixels, 64, 4, 4), [255, 255, 255, 255]);
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_unaligned_width_reads_back_every_pixel() {
        let (width, height) = (100, 10);
        let mut gpu = headless(width, height);
        gpu.clear(Color::rgb(0.0, 1.0, 1.0));
        gpu.finish_frame().unwrap();

        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixels.len(), (width * height * 4) as usize);
        assert!(pixels.chunks_exact(4).all(|p| p == [0, 255, 255, 255]));
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_overlays_draw_over_faces_regardless_of_order() {
        let mut gpu = headless(64, 64);
        let target = Size::new(64.0, 64.0);
        gpu.clear(Color::WHITE);
        gpu.draw_lines(
            &[Line::solid(Point3::xy(0.0, 32.0), Point3::xy(64.0, 32.0), 4.0, Color::BLUE)],
            target,
        );
        gpu.draw_rects(&[Rect::filled(0.0, 0.0, 64.0, 64.0, Color::RED)], target);
        gpu.finish_frame().unwrap();

        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixel(&pixels, 64, 32, 32), [0, 0, 255, 255]);
        assert_eq!(pixel(&pixels, 64, 32, 8), [255, 0, 0, 255]);
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_lit_triangle_matches_software_shading() {
        let target = Size::new(32.0, 32.0);
        let n = Point3::new(0.0, 0.0, 1.0);
        let tri = Triangle::lit(
            [Point3::xy(0.0, 0.0), Point3::xy(32.0, 0.0), Point3::xy(0.0, 32.0)],
            [n; 3],
            Color::WHITE,
        );

        let mut gpu = headless(32, 32);
        gpu.clear(Color::BLACK);
        gpu.draw_triangles(&[tri], target);
        gpu.finish_frame().unwrap();
        let gpu_px = pixel(&gpu.read_pixels().unwrap(), 32, 4, 4);

        let mut cpu = SoftwareRenderer::new(32, 32);
        cpu.clear(Color::BLACK);
        cpu.draw_triangles(&[tri], target);
        let cpu_px = cpu.pixel(4, 4).unwrap();

        for ch in 0..3 {
            assert!((gpu_px[ch] as i32 - cpu_px[ch] as i32).abs() <= 2, "{gpu_px:?} vs {cpu_px:?}");
        }
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_collector_frame_and_resize() {
        let gpu = headless(100, 100);
        let mut plot = PlotCollector::new(gpu, Size::new(100.0, 100.0), Size::new(100.0, 100.0));

        plot.new_frame();
        plot.draw_background(Color::BLACK);
        plot.draw_rectangle(10.0, 90.0, 10.0, 90.0, Color::GREEN);
        let stats = plot.end_frame().unwrap();
        assert_eq!(stats.rects, 2);

        let pixels = plot.renderer().read_pixels().unwrap();
        assert_eq!(pixel(&pixels, 100, 50, 50), [0, 255, 0, 255]);

        plot.set_physical_size(Size::new(50.0, 40.0)).unwrap();
        assert_eq!(plot.renderer().width(), 50);
        assert_eq!(plot.renderer().height(), 40);
        assert!(plot.renderer_mut().resize(0, 40).is_err());
    }

    #[test]
    #[ignore] // Requires GPU
    fn test_image_quad() {
        let mut gpu = headless(8, 8);
        gpu.clear(Color::BLACK);
        gpu.draw_image(&ImageCommand {
            pixels: vec![1.0; 4],
            width: 2,
            height: 2,
            x: 0.0,
            y: 0.0,
            display_width: 8.0,
            display_height: 8.0,
        });
        gpu.finish_frame().unwrap();
        let pixels = gpu.read_pixels().unwrap();
        assert_eq!(pixel(&pixels, 8, 4, 4), [255, 255, 255, 255]);
        assert_eq!(gpu.frame_count(), 1);
    }
}
