//! Draw-Command Collector
//!
//! [`PlotCollector`] is the sink a plotting layer streams one frame into.
//! Every call takes logical plot coordinates, maps them to device pixels
//! through the [`Viewport`], and appends typed primitives to per-kind frame
//! lists. Two-point solid paths are held back as [`RawSegment`]s so that
//! boxes drawn edge by edge can be recovered as filled rects when the frame
//! is flushed.
//!
//! Per-draw calls never fail. Degenerate input (fewer than three distinct
//! triangle vertices, zero-length paths, non-finite coordinates, a
//! zero-sized canvas) is dropped without emitting anything.

use tracing::{debug, warn};

use crate::color::Color;
use crate::error::Result;
use crate::math::Mat4;
use crate::primitives::{
    Circle, ImageCommand, Line, Point3, RawSegment, Rect, TextCommand, Triangle,
};
use crate::reconstruct::reconstruct_rectangles;
use crate::renderer::PlotRenderer;
use crate::style::{LineStyle, StyleState};
use crate::transform::{Size, Viewport};

/// Default depth hint for triangles drawn without z
const DEFAULT_TRIANGLE_Z: f64 = 0.0;

/// Background rects sit on the far plane
const BACKGROUND_Z: f32 = -1.0;

/// Tolerance for closed-box detection, in logical units
const CLOSED_PATH_TOLERANCE: f64 = 0.1;

/// Normalization floor for image value ranges
const MIN_IMAGE_RANGE: f64 = 1e-9;

/// What one frame handed to the renderer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub rects: usize,
    pub lines: usize,
    pub circles: usize,
    pub triangles: usize,
    pub texts: usize,
    pub images: usize,
    /// Rects recovered from raw segments (also counted in `rects`)
    pub reconstructed: usize,
}

impl FrameStats {
    /// Total number of primitives submitted
    pub fn total(&self) -> usize {
        self.rects + self.lines + self.circles + self.triangles + self.texts + self.images
    }
}

#[derive(Debug, Default)]
struct FrameLists {
    rects: Vec<Rect>,
    lines: Vec<Line>,
    circles: Vec<Circle>,
    triangles: Vec<Triangle>,
    texts: Vec<TextCommand>,
    images: Vec<ImageCommand>,
    pending: Vec<RawSegment>,
    clear_color: Option<Color>,
}

impl FrameLists {
    fn clear(&mut self) {
        self.rects.clear();
        self.lines.clear();
        self.circles.clear();
        self.triangles.clear();
        self.texts.clear();
        self.images.clear();
        self.pending.clear();
        self.clear_color = None;
    }
}

/// Collects one frame of plot draw calls and flushes them to a renderer
pub struct PlotCollector<R: PlotRenderer> {
    renderer: R,
    viewport: Viewport,
    style: StyleState,
    view_proj: Option<Mat4>,
    frame: FrameLists,
    warned_empty: bool,
}

impl<R: PlotRenderer> PlotCollector<R> {
    /// Create a collector drawing a `logical` canvas into a `physical` target
    pub fn new(renderer: R, logical: Size, physical: Size) -> Self {
        Self {
            renderer,
            viewport: Viewport::new(logical, physical),
            style: StyleState::default(),
            view_proj: None,
            frame: FrameLists::default(),
            warned_empty: false,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_renderer(self) -> R {
        self.renderer
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Start a frame, discarding anything not yet flushed
    pub fn new_frame(&mut self) {
        self.frame.clear();
        self.warned_empty = false;
    }

    pub fn set_logical_size(&mut self, size: Size) {
        self.viewport.logical = size;
    }

    /// Change the physical target size (between frames)
    pub fn set_physical_size(&mut self, size: Size) -> Result<()> {
        self.viewport.physical = size;
        if size.is_empty() {
            return Ok(());
        }
        self.renderer
            .resize(size.width.round() as u32, size.height.round() as u32)
    }

    pub fn style(&self) -> &StyleState {
        &self.style
    }

    pub fn style_mut(&mut self) -> &mut StyleState {
        &mut self.style
    }

    pub fn set_style(&mut self, style: StyleState) {
        self.style = style;
    }

    /// Replace the renderer's default projection, or restore it with `None`
    pub fn set_view_projection(&mut self, view_proj: Option<Mat4>) {
        self.view_proj = view_proj;
        self.renderer.set_view_projection(view_proj);
    }

    fn canvas_ready(&mut self) -> bool {
        if self.viewport.logical.is_empty() || self.viewport.physical.is_empty() {
            if !self.warned_empty {
                warn!(
                    "zero-sized canvas (logical {:?}, physical {:?}), ignoring draw calls",
                    self.viewport.logical, self.viewport.physical
                );
                self.warned_empty = true;
            }
            return false;
        }
        true
    }

    fn point(&self, x: f64, y: f64, z: Option<f64>) -> Point3 {
        let (px, py) = self.viewport.to_physical(x, y);
        Point3::new(px, py, z.unwrap_or(0.0) as f32)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fills
    // ─────────────────────────────────────────────────────────────────────────

    /// Fill the whole physical target
    pub fn draw_background(&mut self, color: Color) {
        if !self.canvas_ready() {
            return;
        }
        let color = color.sanitized();
        let target = self.viewport.physical;
        self.frame.clear_color = Some(color);
        self.frame
            .rects
            .push(Rect::filled(0.0, 0.0, target.width, target.height, color).with_z(BACKGROUND_Z));
    }

    /// Filled axis-aligned box between two logical x and two logical y values
    pub fn draw_rectangle(&mut self, x1: f64, x2: f64, y1: f64, y2: f64, color: Color) {
        if !self.canvas_ready() {
            return;
        }
        let (x, y, w, h) = self.viewport.physical_rect(x1, x2, y1, y2);
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return;
        }
        self.frame
            .rects
            .push(Rect::filled(x, y, w, h, color.sanitized()));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Strokes and markers
    // ─────────────────────────────────────────────────────────────────────────

    /// Stroke a polyline with the current line style
    ///
    /// `zs`, when present, makes the path 3D: it skips rectangle detection
    /// and carries each value as the vertex depth hint.
    pub fn draw_path(&mut self, xs: &[f64], ys: &[f64], zs: Option<&[f64]>, color: Color) {
        if !self.canvas_ready() {
            return;
        }
        let count = xs.len().min(ys.len());
        if count < 2 {
            return;
        }
        let (xs, ys) = (&xs[..count], &ys[..count]);
        let zs = zs.filter(|z| !z.is_empty());
        let color = color.sanitized();

        if zs.is_none() && self.style.fill_closed_rects {
            if let Some(rect) = self.closed_box(xs, ys, color) {
                self.frame.rects.push(rect);
                return;
            }
        }
        if self.style.line_style == LineStyle::None {
            return;
        }

        let dash = self.style.line_style.dash_pattern();
        let points: Vec<Point3> = (0..count)
            .map(|i| self.point(xs[i], ys[i], zs.map(|z| z.get(i).copied().unwrap_or(0.0))))
            .collect();

        if count == 2 && zs.is_none() && dash.is_solid() {
            let (a, b) = (points[0], points[1]);
            if a.is_finite() && b.is_finite() && a.distance_2d(&b) > 0.0 {
                self.frame
                    .pending
                    .push(RawSegment::new(a.x, a.y, b.x, b.y, color));
            }
            return;
        }

        let width = self.style.line_width;
        let mut travelled = 0.0f32;
        let mut joins: Vec<Point3> = Vec::new();
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !a.is_finite() || !b.is_finite() {
                continue;
            }
            let len = a.distance_2d(&b);
            if len <= 0.0 {
                continue;
            }
            self.frame.lines.push(Line {
                start: a,
                end: b,
                color,
                width,
                dash: dash.with_offset(travelled),
            });
            travelled += len;
            if joins.last() != Some(&a) {
                joins.push(a);
            }
            joins.push(b);
        }

        if dash.is_solid() {
            self.frame
                .circles
                .extend(joins.into_iter().map(|p| Circle::filled(p, width * 0.5, color)));
        }
    }

    /// A 4/5-point path tracing the corners of an axis-aligned box, as a fill
    fn closed_box(&self, xs: &[f64], ys: &[f64], color: Color) -> Option<Rect> {
        let n = xs.len();
        if !(4..=5).contains(&n) {
            return None;
        }
        if n == 5
            && ((xs[0] - xs[4]).abs() >= CLOSED_PATH_TOLERANCE
                || (ys[0] - ys[4]).abs() >= CLOSED_PATH_TOLERANCE)
        {
            return None;
        }

        let (xs, ys) = (&xs[..4], &ys[..4]);
        let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
        let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_y = ys.iter().copied().fold(f64::INFINITY, f64::min);
        let max_y = ys.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if max_x - min_x <= 1.0 || max_y - min_y <= 1.0 {
            return None;
        }

        // Each corner of the box must be visited exactly once
        let near = |a: f64, b: f64| (a - b).abs() < CLOSED_PATH_TOLERANCE;
        let mut corners = 0u8;
        for (&x, &y) in xs.iter().zip(ys) {
            let cx = match (near(x, min_x), near(x, max_x)) {
                (true, _) => 0,
                (_, true) => 1,
                _ => return None,
            };
            let cy = match (near(y, min_y), near(y, max_y)) {
                (true, _) => 0,
                (_, true) => 1,
                _ => return None,
            };
            corners |= 1 << (cx * 2 + cy);
        }
        if corners != 0b1111 {
            return None;
        }

        let (x, y, w, h) = self.viewport.physical_rect(min_x, max_x, min_y, max_y);
        Some(Rect::filled(x, y, w, h, color))
    }

    /// One marker per point, shaped and sized by the current style
    pub fn draw_markers(&mut self, xs: &[f64], ys: &[f64], zs: Option<&[f64]>, color: Color) {
        if !self.canvas_ready() {
            return;
        }
        let color = color.sanitized();
        let style = self.style;
        for i in 0..xs.len().min(ys.len()) {
            let z = zs.and_then(|z| z.get(i).copied());
            let center = self.point(xs[i], ys[i], z);
            if !center.is_finite() {
                continue;
            }
            self.frame.circles.push(Circle {
                center,
                radius: style.marker_radius,
                color,
                shape: style.marker_shape,
                stroke_width: style.marker_stroke_width(),
            });
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Triangles
    // ─────────────────────────────────────────────────────────────────────────

    fn triangle_vertices(&self, xs: &[f64], ys: &[f64], zs: &[f64]) -> Option<[Point3; 3]> {
        if xs.len() < 3 || ys.len() < 3 {
            return None;
        }
        let v = [0, 1, 2].map(|i| {
            let z = zs.get(i).copied().unwrap_or(DEFAULT_TRIANGLE_Z);
            self.point(xs[i], ys[i], Some(z))
        });
        if !v.iter().all(Point3::is_finite) {
            return None;
        }
        let same = |a: &Point3, b: &Point3| a.x == b.x && a.y == b.y;
        if same(&v[0], &v[1]) || same(&v[1], &v[2]) || same(&v[0], &v[2]) {
            return None;
        }
        Some(v)
    }

    /// Flat-colored triangle from the first three points
    pub fn draw_triangle(&mut self, xs: &[f64], ys: &[f64], zs: Option<&[f64]>, color: Color) {
        if !self.canvas_ready() {
            return;
        }
        if let Some(vertices) = self.triangle_vertices(xs, ys, zs.unwrap_or(&[])) {
            self.frame
                .triangles
                .push(Triangle::unlit(vertices, color.sanitized()));
        }
    }

    /// Shaded triangle; `normals` holds 9 values (one per vertex) or 3 (shared)
    pub fn draw_lit_triangle(
        &mut self,
        xs: &[f64],
        ys: &[f64],
        zs: &[f64],
        normals: &[f64],
        color: Color,
    ) {
        if !self.canvas_ready() {
            return;
        }
        let Some(vertices) = self.triangle_vertices(xs, ys, zs) else {
            return;
        };
        let normal_at = |i: usize| {
            Point3::new(normals[i] as f32, normals[i + 1] as f32, normals[i + 2] as f32)
        };
        let normals = if normals.len() >= 9 {
            [normal_at(0), normal_at(3), normal_at(6)]
        } else if normals.len() >= 3 {
            [normal_at(0); 3]
        } else {
            [Triangle::DEFAULT_NORMAL; 3]
        };
        self.frame
            .triangles
            .push(Triangle::lit(vertices, normals, color.sanitized()));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Text and images
    // ─────────────────────────────────────────────────────────────────────────

    /// Draw text anchored at a logical point (left end of the baseline)
    ///
    /// `font_size` is in logical units and scales with the canvas.
    pub fn draw_text(
        &mut self,
        text: &str,
        x: f64,
        y: f64,
        font_size: f32,
        rotation: f32,
        color: Color,
    ) {
        if !self.canvas_ready() || text.is_empty() || !self.renderer.supports_text() {
            return;
        }
        let (px, py) = self.viewport.to_physical(x, y);
        if !px.is_finite() || !py.is_finite() {
            return;
        }
        self.frame.texts.push(TextCommand {
            text: text.to_owned(),
            x: px,
            y: py,
            color: color.sanitized(),
            font_size: self.viewport.scale_length(font_size as f64),
            rotation,
        });
    }

    /// Draw text at a world-space point projected through the view-projection
    ///
    /// A no-op until [`set_view_projection`](Self::set_view_projection) has
    /// installed a matrix, and for points behind the camera.
    pub fn draw_text_3d(&mut self, text: &str, pos: [f32; 3], font_size: f32, color: Color) {
        if !self.canvas_ready() || text.is_empty() || !self.renderer.supports_text() {
            return;
        }
        let Some(view_proj) = self.view_proj else {
            return;
        };
        let [cx, cy, _, cw] = view_proj.transform_point(pos);
        if cw <= 0.001 {
            return;
        }
        let target = self.viewport.physical;
        self.frame.texts.push(TextCommand {
            text: text.to_owned(),
            x: (cx / cw + 1.0) * 0.5 * target.width,
            y: (1.0 - cy / cw) * 0.5 * target.height,
            color: color.sanitized(),
            font_size,
            rotation: 0.0,
        });
    }

    /// Width of `text` in logical units
    pub fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
        if !self.canvas_ready() {
            return 0.0;
        }
        let scale = self.viewport.scale();
        self.renderer.measure_text(text, font_size * scale) / scale
    }

    /// Draw a grid of values as a greyscale image
    ///
    /// `zs` is row-major, one inner vector per row. Values are normalized
    /// by their min/max. The destination spans from the first to the last
    /// grid coordinate in `xs`/`ys` (the whole canvas when missing); rows
    /// run bottom-up when y increases with the row index.
    pub fn draw_image(&mut self, xs: &[Vec<f64>], ys: &[Vec<f64>], zs: &[Vec<f64>]) {
        if !self.canvas_ready() {
            return;
        }
        let height = zs.len();
        let width = zs.first().map_or(0, Vec::len);
        if width == 0 || zs.iter().any(|row| row.len() < width) {
            return;
        }

        let finite = zs.iter().flat_map(|row| row[..width].iter()).filter(|v| v.is_finite());
        let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
        if !min.is_finite() {
            return;
        }
        let range = if max - min < MIN_IMAGE_RANGE {
            1.0
        } else {
            max - min
        };

        let logical = self.viewport.logical;
        let (x0, x1) = match xs {
            [first, .., _] if !first.is_empty() => (first[0], first[first.len() - 1]),
            _ => (0.0, logical.width as f64),
        };
        let (y0, y1) = match ys {
            [first, .., last] if !first.is_empty() && !last.is_empty() => (first[0], last[0]),
            _ => (0.0, logical.height as f64),
        };

        let mut pixels = Vec::with_capacity(width * height);
        for r in 0..height {
            // Device rows run top-down
            let row = if y1 > y0 { &zs[height - 1 - r] } else { &zs[r] };
            for c in 0..width {
                let col = if x1 < x0 { width - 1 - c } else { c };
                let v = row[col];
                pixels.push(if v.is_finite() {
                    ((v - min) / range) as f32
                } else {
                    0.0
                });
            }
        }

        let (x, y, w, h) = self.viewport.physical_rect(x0, x1, y0, y1);
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return;
        }
        self.frame.images.push(ImageCommand {
            pixels,
            width: width as u32,
            height: height as u32,
            x,
            y,
            display_width: w,
            display_height: h,
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Flush
    // ─────────────────────────────────────────────────────────────────────────

    /// Reconstruct, hand every list to the renderer and submit the frame
    ///
    /// The frame lists are empty afterwards whether or not submission
    /// succeeded.
    pub fn end_frame(&mut self) -> Result<FrameStats> {
        let segments = std::mem::take(&mut self.frame.pending);
        let recovered = reconstruct_rectangles(&segments, self.style.line_width);
        let reconstructed = recovered.rects.len();
        self.frame.rects.extend(recovered.rects);
        self.frame.lines.extend(recovered.lines);

        let target = self.viewport.physical;
        let frame = &self.frame;
        let renderer = &mut self.renderer;
        if let Some(color) = frame.clear_color {
            renderer.clear(color);
        }
        if !frame.rects.is_empty() {
            renderer.draw_rects(&frame.rects, target);
        }
        if !frame.triangles.is_empty() {
            renderer.draw_triangles(&frame.triangles, target);
        }
        if !frame.lines.is_empty() {
            renderer.draw_lines(&frame.lines, target);
        }
        if !frame.circles.is_empty() {
            renderer.draw_circles(&frame.circles, target);
        }
        for text in &frame.texts {
            renderer.draw_text(text);
        }
        for image in &frame.images {
            renderer.draw_image(image);
        }

        let stats = FrameStats {
            rects: frame.rects.len(),
            lines: frame.lines.len(),
            circles: frame.circles.len(),
            triangles: frame.triangles.len(),
            texts: frame.texts.len(),
            images: frame.images.len(),
            reconstructed,
        };

        let submitted = renderer.finish_frame();
        self.frame.clear();

        match submitted {
            Ok(()) => {
                debug!(?stats, "frame submitted");
                Ok(stats)
            }
            Err(err) => {
                warn!("frame dropped: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::primitives::MarkerShape;
    use crate::recording::{RecordingRenderer, RenderCommand};

    fn collector(logical: Size, physical: Size) -> PlotCollector<RecordingRenderer> {
        let mut c = PlotCollector::new(RecordingRenderer::new(), logical, physical);
        c.new_frame();
        c
    }

    fn square(size: f32) -> PlotCollector<RecordingRenderer> {
        collector(Size::new(size, size), Size::new(size, size))
    }

    fn flushed(c: &mut PlotCollector<RecordingRenderer>) -> (FrameStats, Vec<RenderCommand>) {
        let stats = c.end_frame().unwrap();
        (stats, c.renderer_mut().take_commands())
    }

    fn lines_of(commands: &[RenderCommand]) -> Vec<Line> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Lines(l, _) => Some(l.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn rects_of(commands: &[RenderCommand]) -> Vec<Rect> {
        commands
            .iter()
            .filter_map(|c| match c {
                RenderCommand::Rects(r, _) => Some(r.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    #[test]
    fn test_box_edges_become_one_rect() {
        let mut c = square(100.0);
        c.draw_path(&[10.0, 50.0], &[10.0, 10.0], None, Color::RED);
        c.draw_path(&[10.0, 50.0], &[30.0, 30.0], None, Color::RED);
        c.draw_path(&[10.0, 10.0], &[10.0, 30.0], None, Color::RED);
        c.draw_path(&[50.0, 50.0], &[10.0, 30.0], None, Color::RED);

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.reconstructed, 1);
        assert_eq!(stats.rects, 1);
        assert_eq!(stats.lines, 0);
        assert_eq!(rects_of(&cmds), vec![Rect::filled(10.0, 70.0, 40.0, 20.0, Color::RED)]);
    }

    #[test]
    fn test_lone_segment_is_a_line() {
        let mut c = square(100.0);
        c.style_mut().line_width = 3.0;
        c.draw_path(&[0.0, 40.0], &[0.0, 30.0], None, Color::BLUE);

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.circles, 0);
        let line = lines_of(&cmds)[0];
        assert_eq!(line.width, 3.0);
        assert_eq!(line.start, Point3::xy(0.0, 100.0));
        assert_eq!(line.end, Point3::xy(40.0, 70.0));
    }

    #[test]
    fn test_closed_path_fills() {
        let mut c = square(100.0);
        c.draw_path(
            &[10.0, 50.0, 50.0, 10.0, 10.0],
            &[10.0, 10.0, 30.0, 30.0, 10.0],
            None,
            Color::GREEN,
        );
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.lines, 0);
        assert_eq!(rects_of(&cmds), vec![Rect::filled(10.0, 70.0, 40.0, 20.0, Color::GREEN)]);

        c.new_frame();
        c.style_mut().fill_closed_rects = false;
        c.draw_path(
            &[10.0, 50.0, 50.0, 10.0, 10.0],
            &[10.0, 10.0, 30.0, 30.0, 10.0],
            None,
            Color::GREEN,
        );
        let (stats, _) = flushed(&mut c);
        assert_eq!(stats.rects, 0);
        assert_eq!(stats.lines, 4);
    }

    #[test]
    fn test_open_quad_is_not_a_box() {
        let mut c = square(100.0);
        // Four points but two of them share a corner
        c.draw_path(&[10.0, 50.0, 50.0, 10.0], &[10.0, 10.0, 30.0, 10.0], None, Color::RED);
        let (stats, _) = flushed(&mut c);
        assert_eq!(stats.rects, 0);
        assert_eq!(stats.lines, 3);
    }

    #[test]
    fn test_polyline_lengths_and_joins() {
        let mut c = square(100.0);
        c.draw_path(&[0.0, 30.0, 30.0], &[0.0, 0.0, 40.0], None, Color::BLACK);

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.circles, 3);
        let lines = lines_of(&cmds);
        assert_eq!(lines[0].dash.offset, 0.0);
        assert_eq!(lines[1].dash.offset, 30.0);
        assert_eq!(lines[1].end, Point3::xy(30.0, 60.0));
    }

    #[test]
    fn test_dashed_path_carries_phase_without_joins() {
        let mut c = square(100.0);
        c.style_mut().line_style = LineStyle::Dashed;
        c.draw_path(&[0.0, 10.0, 10.0], &[0.0, 0.0, 10.0], None, Color::BLACK);
        // Dashed two-point paths skip reconstruction
        c.draw_path(&[0.0, 10.0], &[50.0, 50.0], None, Color::BLACK);

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.circles, 0);
        assert_eq!(stats.lines, 3);
        let lines = lines_of(&cmds);
        let dashed = LineStyle::Dashed.dash_pattern();
        assert_eq!(lines[0].dash, dashed);
        assert_eq!(lines[1].dash, dashed.with_offset(10.0));
    }

    #[test]
    fn test_degenerate_paths_dropped() {
        let mut c = square(100.0);
        c.draw_path(&[5.0, 5.0, 5.0], &[5.0, 5.0, 5.0], None, Color::RED);
        c.draw_path(&[5.0, 5.0], &[5.0, 5.0], None, Color::RED);
        c.draw_path(&[5.0], &[5.0], None, Color::RED);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.total(), 0);
        assert_eq!(cmds, vec![RenderCommand::FinishFrame]);
    }

    #[test]
    fn test_non_finite_points_split_path() {
        let mut c = square(100.0);
        c.draw_path(&[0.0, f64::NAN, 20.0, 30.0], &[0.0, 0.0, 0.0, 0.0], None, Color::RED);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.lines, 1);
        assert_eq!(stats.circles, 2);
        assert_eq!(lines_of(&cmds)[0].start, Point3::xy(20.0, 100.0));
    }

    #[test]
    fn test_path_with_z_carries_depth() {
        let mut c = square(100.0);
        c.draw_path(&[0.0, 10.0], &[0.0, 0.0], Some(&[0.25, -0.5]), Color::RED);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.reconstructed, 0);
        let line = lines_of(&cmds)[0];
        assert_eq!(line.start.z, 0.25);
        assert_eq!(line.end.z, -0.5);
    }

    #[test]
    fn test_markers_follow_style() {
        let mut c = square(100.0);
        c.set_style(
            StyleState::default()
                .with_line_width(2.0)
                .with_marker(MarkerShape::Square, 4.0, false),
        );
        c.draw_markers(&[10.0, 20.0, f64::INFINITY], &[10.0, 20.0, 0.0], None, Color::BLUE);

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.circles, 2);
        let RenderCommand::Circles(circles, _) = &cmds[0] else {
            panic!("expected circles, got {:?}", cmds[0]);
        };
        assert_eq!(circles[0].center, Point3::xy(10.0, 90.0));
        assert_eq!(circles[0].shape, MarkerShape::Square);
        assert_eq!(circles[0].radius, 4.0);
        assert_eq!(circles[0].stroke_width, 2.0);
    }

    #[test]
    fn test_triangles() {
        let mut c = square(100.0);
        c.draw_triangle(&[0.0, 10.0, 0.0], &[0.0, 0.0, 10.0], None, Color::RED);
        c.draw_triangle(&[0.0, 0.0, 10.0], &[0.0, 0.0, 10.0], None, Color::RED);
        c.draw_triangle(&[0.0, 10.0], &[0.0, 0.0], None, Color::RED);
        c.draw_lit_triangle(
            &[0.0, 10.0, 0.0],
            &[0.0, 0.0, 10.0],
            &[0.1, 0.2, 0.3],
            &[0.0, 1.0, 0.0],
            Color::GREEN,
        );

        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.triangles, 2);
        let RenderCommand::Triangles(tris, _) = &cmds[0] else {
            panic!("expected triangles, got {:?}", cmds[0]);
        };
        assert!(!tris[0].lit);
        assert!(tris[0].vertices.iter().all(|v| v.z == 0.0));
        assert!(tris[1].lit);
        assert_eq!(tris[1].vertices[2].z, 0.3);
        assert_eq!(tris[1].normals, [Point3::new(0.0, 1.0, 0.0); 3]);
    }

    #[test]
    fn test_text_scales_and_respects_support() {
        let mut c = collector(Size::new(100.0, 100.0), Size::new(200.0, 200.0));
        c.draw_text("label", 10.0, 10.0, 12.0, 0.0, Color::BLACK);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.texts, 1);
        let RenderCommand::Text(text) = &cmds[0] else {
            panic!("expected text, got {:?}", cmds[0]);
        };
        assert_eq!((text.x, text.y), (20.0, 180.0));
        assert_eq!(text.font_size, 24.0);
        assert_eq!(c.measure_text("abcd", 10.0), 20.0);

        let mut silent = PlotCollector::new(
            RecordingRenderer::without_text(),
            Size::new(100.0, 100.0),
            Size::new(100.0, 100.0),
        );
        silent.draw_text("label", 10.0, 10.0, 12.0, 0.0, Color::BLACK);
        assert_eq!(silent.end_frame().unwrap().texts, 0);
    }

    #[test]
    fn test_text_3d_needs_projection() {
        let mut c = square(100.0);
        c.draw_text_3d("origin", [0.0, 0.0, 0.0], 12.0, Color::BLACK);
        assert_eq!(c.end_frame().unwrap().texts, 0);

        c.new_frame();
        c.set_view_projection(Some(Mat4::IDENTITY));
        c.draw_text_3d("origin", [0.0, 0.0, 0.0], 12.0, Color::BLACK);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.texts, 1);
        assert!(cmds.iter().any(
            |cmd| matches!(cmd, RenderCommand::Text(t) if t.x == 50.0 && t.y == 50.0)
        ));
    }

    #[test]
    fn test_image_normalized_and_flipped() {
        let mut c = square(100.0);
        c.draw_image(
            &[vec![0.0, 100.0], vec![0.0, 100.0]],
            &[vec![0.0, 0.0], vec![100.0, 100.0]],
            &[vec![0.0, 1.0], vec![2.0, 3.0]],
        );
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats.images, 1);
        let RenderCommand::Image(img) = &cmds[0] else {
            panic!("expected image, got {:?}", cmds[0]);
        };
        assert_eq!((img.width, img.height), (2, 2));
        assert_eq!((img.x, img.y, img.display_width, img.display_height), (0.0, 0.0, 100.0, 100.0));
        let expected = [2.0 / 3.0, 1.0, 0.0, 1.0 / 3.0];
        for (got, want) in img.pixels.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "{got} != {want}");
        }
    }

    #[test]
    fn test_constant_image_uses_unit_range() {
        let mut c = square(100.0);
        c.draw_image(&[], &[], &[vec![5.0, 5.0]]);
        let (_, cmds) = flushed(&mut c);
        let RenderCommand::Image(img) = &cmds[0] else {
            panic!("expected image, got {:?}", cmds[0]);
        };
        assert_eq!(img.pixels, vec![0.0, 0.0]);
        assert_eq!(img.display_width, 100.0);
    }

    #[test]
    fn test_zero_canvas_ignores_draws() {
        let mut c = collector(Size::new(0.0, 0.0), Size::new(100.0, 100.0));
        c.draw_background(Color::WHITE);
        c.draw_path(&[0.0, 1.0, 2.0], &[0.0, 1.0, 0.0], None, Color::RED);
        c.draw_markers(&[0.0], &[0.0], None, Color::RED);
        let (stats, cmds) = flushed(&mut c);
        assert_eq!(stats, FrameStats::default());
        assert_eq!(cmds, vec![RenderCommand::FinishFrame]);
    }

    #[test]
    fn test_aspect_mismatch_centers_content() {
        let mut c = collector(Size::new(800.0, 600.0), Size::new(1600.0, 600.0));
        c.draw_rectangle(0.0, 800.0, 0.0, 600.0, Color::RED);
        let (_, cmds) = flushed(&mut c);
        assert_eq!(
            cmds[0],
            RenderCommand::Rects(
                vec![Rect::filled(400.0, 0.0, 800.0, 600.0, Color::RED)],
                Size::new(1600.0, 600.0)
            )
        );
    }

    #[test]
    fn test_flush_order() {
        let mut c = square(100.0);
        c.draw_markers(&[5.0], &[5.0], None, Color::RED);
        c.draw_text("t", 1.0, 1.0, 10.0, 0.0, Color::BLACK);
        c.draw_path(&[0.0, 10.0, 20.0], &[0.0, 10.0, 0.0], None, Color::RED);
        c.draw_triangle(&[0.0, 10.0, 0.0], &[0.0, 0.0, 10.0], None, Color::RED);
        c.draw_background(Color::WHITE);

        let (_, cmds) = flushed(&mut c);
        let kinds: Vec<&str> = cmds
            .iter()
            .map(|cmd| match cmd {
                RenderCommand::Clear(_) => "clear",
                RenderCommand::Rects(..) => "rects",
                RenderCommand::Triangles(..) => "triangles",
                RenderCommand::Lines(..) => "lines",
                RenderCommand::Circles(..) => "circles",
                RenderCommand::Text(_) => "text",
                RenderCommand::Image(_) => "image",
                RenderCommand::FinishFrame => "finish",
                _ => "other",
            })
            .collect();
        assert_eq!(
            kinds,
            ["clear", "rects", "triangles", "lines", "circles", "text", "finish"]
        );
        let background = rects_of(&cmds)[0];
        assert_eq!(background.z, -1.0);
    }

    #[test]
    fn test_abandoned_frame_leaves_renderer_untouched() {
        let mut c = square(100.0);
        c.draw_background(Color::BLACK);
        c.new_frame();
        assert!(c.renderer().commands().is_empty());

        c.draw_rectangle(0.0, 10.0, 0.0, 10.0, Color::RED);
        let (_, cmds) = flushed(&mut c);
        assert!(!cmds.iter().any(|cmd| matches!(cmd, RenderCommand::Clear(_))));
    }

    #[test]
    fn test_nan_color_is_transparent() {
        let mut c = square(100.0);
        c.draw_rectangle(0.0, 10.0, 0.0, 10.0, Color::rgba(f32::NAN, 0.0, 0.0, 1.0));
        let (_, cmds) = flushed(&mut c);
        assert_eq!(rects_of(&cmds)[0].color, Color::TRANSPARENT);
    }

    struct FailOnce {
        inner: RecordingRenderer,
        failed: bool,
    }

    impl PlotRenderer for FailOnce {
        fn draw_rects(&mut self, rects: &[Rect], target: Size) {
            self.inner.draw_rects(rects, target)
        }
        fn draw_lines(&mut self, lines: &[Line], target: Size) {
            self.inner.draw_lines(lines, target)
        }
        fn draw_circles(&mut self, circles: &[Circle], target: Size) {
            self.inner.draw_circles(circles, target)
        }
        fn draw_triangles(&mut self, triangles: &[Triangle], target: Size) {
            self.inner.draw_triangles(triangles, target)
        }
        fn draw_text(&mut self, text: &TextCommand) {
            self.inner.draw_text(text)
        }
        fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
            self.inner.measure_text(text, font_size)
        }
        fn draw_image(&mut self, image: &ImageCommand) {
            self.inner.draw_image(image)
        }
        fn clear(&mut self, color: Color) {
            self.inner.clear(color)
        }
        fn supports_text(&self) -> bool {
            false
        }
        fn finish_frame(&mut self) -> Result<()> {
            if self.failed {
                return Ok(());
            }
            self.failed = true;
            Err(RenderError::Gpu("device lost".into()))
        }
    }

    #[test]
    fn test_failed_frame_still_clears() {
        let renderer = FailOnce {
            inner: RecordingRenderer::new(),
            failed: false,
        };
        let mut c = PlotCollector::new(renderer, Size::new(100.0, 100.0), Size::new(100.0, 100.0));
        c.draw_path(&[0.0, 10.0, 20.0], &[0.0, 10.0, 0.0], None, Color::RED);
        assert!(matches!(c.end_frame(), Err(RenderError::Gpu(_))));

        let stats = c.end_frame().unwrap();
        assert_eq!(stats.total(), 0);
    }

    #[test]
    fn test_physical_resize_forwards() {
        let mut c = square(100.0);
        c.set_physical_size(Size::new(300.0, 200.0)).unwrap();
        assert_eq!(c.viewport().scale(), 2.0);
        assert_eq!(
            c.renderer().commands(),
            &[RenderCommand::Resize {
                width: 300,
                height: 200
            }]
        );
    }
}
