//! CPU software rasterizer
//!
//! A small reference backend that renders into an RGBA8 buffer without a
//! GPU. Primitives arrive in the caller's device space and are rescaled by
//! `own size / target size` per axis. Depth hints are ignored; primitives
//! are painted in submission order with source-over blending. Text is not
//! supported.

use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::primitives::{Circle, ImageCommand, Line, MarkerShape, Rect, TextCommand, Triangle};
use crate::renderer::PlotRenderer;
use crate::transform::Size;

/// Direction of the fixed light used for lit triangles (normalized)
pub const LIGHT_DIR: [f32; 3] = [0.267_261_24, 0.534_522_5, 0.801_783_7];

/// Ambient term for lit triangles
pub const AMBIENT: f32 = 0.3;

/// Lambert factor applied to lit triangle colors
pub fn lambert(normal: [f32; 3]) -> f32 {
    let d = normal[0] * LIGHT_DIR[0] + normal[1] * LIGHT_DIR[1] + normal[2] * LIGHT_DIR[2];
    AMBIENT + (1.0 - AMBIENT) * d.abs()
}

/// CPU rasterizer backend
#[derive(Debug, Clone)]
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl SoftwareRenderer {
    /// Create a transparent `width` x `height` canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tightly packed RGBA8 rows, top row first
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// RGBA of one pixel, `None` outside the canvas
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        Some([
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ])
    }

    fn scale_for(&self, target: Size) -> (f32, f32) {
        if target.is_empty() {
            return (1.0, 1.0);
        }
        (
            self.width as f32 / target.width,
            self.height as f32 / target.height,
        )
    }

    /// Source-over blend `color` into one pixel with extra `coverage`
    fn blend(&mut self, x: i64, y: i64, color: Color, coverage: f32) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let a = (color.a * coverage).clamp(0.0, 1.0);
        if a <= 0.0 {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let dst = &mut self.pixels[i..i + 4];
        for (c, src) in dst.iter_mut().zip([color.r, color.g, color.b]) {
            let d = *c as f32 / 255.0;
            *c = ((src.clamp(0.0, 1.0) * a + d * (1.0 - a)) * 255.0 + 0.5) as u8;
        }
        let da = dst[3] as f32 / 255.0;
        dst[3] = ((a + da * (1.0 - a)) * 255.0 + 0.5) as u8;
    }

    fn fill_box(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Color) {
        let (xa, xb) = (x0.min(x1).round() as i64, x0.max(x1).round() as i64);
        let (ya, yb) = (y0.min(y1).round() as i64, y0.max(y1).round() as i64);
        for y in ya.max(0)..yb.min(self.height as i64) {
            for x in xa.max(0)..xb.min(self.width as i64) {
                self.blend(x, y, color, 1.0);
            }
        }
    }

    fn rect(&mut self, rect: &Rect, (sx, sy): (f32, f32)) {
        let color = rect.color.sanitized();
        let (x0, y0) = (rect.x * sx, rect.y * sy);
        let (x1, y1) = ((rect.x + rect.width) * sx, (rect.y + rect.height) * sy);
        if rect.stroke_width <= 0.0 {
            self.fill_box(x0, y0, x1, y1, color);
            return;
        }
        let sw = rect.stroke_width * sx.min(sy);
        self.fill_box(x0, y0, x1, y0 + sw, color);
        self.fill_box(x0, y1 - sw, x1, y1, color);
        self.fill_box(x0, y0 + sw, x0 + sw, y1 - sw, color);
        self.fill_box(x1 - sw, y0 + sw, x1, y1 - sw, color);
    }

    /// Xiaolin Wu anti-aliased line, dash pattern sampled along the stroke
    fn wu_line(&mut self, line: &Line, (sx, sy): (f32, f32)) {
        let color = line.color.sanitized();
        let (mut x0, mut y0) = (line.start.x * sx, line.start.y * sy);
        let (mut x1, mut y1) = (line.end.x * sx, line.end.y * sy);
        let length = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        let origin = (x0, y0);

        let steep = (y1 - y0).abs() > (x1 - x0).abs();
        if steep {
            std::mem::swap(&mut x0, &mut y0);
            std::mem::swap(&mut x1, &mut y1);
        }
        let reversed = x0 > x1;
        if reversed {
            std::mem::swap(&mut x0, &mut x1);
            std::mem::swap(&mut y0, &mut y1);
        }

        let dx = x1 - x0;
        let gradient = if dx == 0.0 { 1.0 } else { (y1 - y0) / dx };
        let dash = line.dash;
        let plot = |r: &mut Self, major: i64, minor: i64, coverage: f32| {
            let (px, py) = if steep { (minor, major) } else { (major, minor) };
            if !dash.is_solid() {
                let along = ((px as f32 - origin.0).powi(2) + (py as f32 - origin.1).powi(2))
                    .sqrt()
                    .min(length);
                if !dash.is_on(along) {
                    return;
                }
            }
            r.blend(px, py, color, coverage);
        };

        let fpart = |v: f32| v - v.floor();

        let xend = x0.round();
        let yend = y0 + gradient * (xend - x0);
        let xgap = 1.0 - fpart(x0 + 0.5);
        let xpxl1 = xend as i64;
        let ypxl = yend.floor() as i64;
        plot(self, xpxl1, ypxl, (1.0 - fpart(yend)) * xgap);
        plot(self, xpxl1, ypxl.saturating_add(1), fpart(yend) * xgap);
        let intery_start = yend;

        let xend = x1.round();
        let yend = y1 + gradient * (xend - x1);
        let xgap = fpart(x1 + 0.5);
        let xpxl2 = xend as i64;
        let ypxl = yend.floor() as i64;
        plot(self, xpxl2, ypxl, (1.0 - fpart(yend)) * xgap);
        plot(self, xpxl2, ypxl.saturating_add(1), fpart(yend) * xgap);

        // Only the span of the major axis that lands on the canvas is walked
        let major_limit = if steep { self.height } else { self.width } as i64;
        let first = xpxl1.saturating_add(1).max(0);
        let last = xpxl2.min(major_limit);
        for x in first..last {
            let intery = intery_start + gradient * x.saturating_sub(xpxl1) as f32;
            let ypxl = intery.floor() as i64;
            plot(self, x, ypxl, 1.0 - fpart(intery));
            plot(self, x, ypxl.saturating_add(1), fpart(intery));
        }
    }

    /// Thick strokes are filled as a quad
    fn thick_line(&mut self, line: &Line, (sx, sy): (f32, f32)) {
        let color = line.color.sanitized();
        let (x0, y0) = (line.start.x * sx, line.start.y * sy);
        let (x1, y1) = (line.end.x * sx, line.end.y * sy);
        let len = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
        if len <= f32::EPSILON {
            return;
        }
        let half = line.width * sx.min(sy) * 0.5;
        let (nx, ny) = (-(y1 - y0) / len * half, (x1 - x0) / len * half);
        let quad = [
            (x0 + nx, y0 + ny),
            (x1 + nx, y1 + ny),
            (x1 - nx, y1 - ny),
            (x0 - nx, y0 - ny),
        ];
        let dash = line.dash;
        let (dirx, diry) = ((x1 - x0) / len, (y1 - y0) / len);
        let filter = move |px: f32, py: f32| dash.is_on((px - x0) * dirx + (py - y0) * diry);
        self.fill_triangle([quad[0], quad[1], quad[2]], color, &filter);
        self.fill_triangle([quad[0], quad[2], quad[3]], color, &filter);
    }

    /// Edge-function fill sampled at pixel centers (top-left fill rule)
    fn fill_triangle(&mut self, v: [(f32, f32); 3], color: Color, keep: &dyn Fn(f32, f32) -> bool) {
        let edge = |a: (f32, f32), b: (f32, f32), p: (f32, f32)| {
            (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
        };
        let area = edge(v[0], v[1], v[2]);
        if area.abs() <= f32::EPSILON || !area.is_finite() {
            return;
        }
        let min_x = v.iter().map(|p| p.0).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_x = v.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;
        let min_y = v.iter().map(|p| p.1).fold(f32::INFINITY, f32::min).floor().max(0.0) as i64;
        let max_y = v.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max).ceil() as i64;

        for y in min_y..max_y.min(self.height as i64) {
            for x in min_x..max_x.min(self.width as i64) {
                let p = (x as f32 + 0.5, y as f32 + 0.5);
                let w0 = edge(v[1], v[2], p) / area;
                let w1 = edge(v[2], v[0], p) / area;
                let w2 = edge(v[0], v[1], p) / area;
                if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 && keep(p.0, p.1) {
                    self.blend(x, y, color, 1.0);
                }
            }
        }
    }

    fn marker(&mut self, circle: &Circle, (sx, sy): (f32, f32)) {
        let color = circle.color.sanitized();
        let (cx, cy) = (circle.center.x * sx, circle.center.y * sy);
        let scale = sx.min(sy);
        let r = circle.radius * scale;
        let stroke = circle.stroke_width * scale;
        if r <= 0.0 || !cx.is_finite() || !cy.is_finite() {
            return;
        }

        let reach = (r + stroke + 1.0).ceil() as i64;
        let (icx, icy) = (cx.floor() as i64, cy.floor() as i64);
        let (x0, x1) = (
            icx.saturating_sub(reach).max(0),
            icx.saturating_add(reach).min(self.width as i64 - 1),
        );
        let (y0, y1) = (
            icy.saturating_sub(reach).max(0),
            icy.saturating_add(reach).min(self.height as i64 - 1),
        );
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let d = marker_distance(circle.shape, dx, dy, r);
                let coverage = if stroke > 0.0 {
                    (stroke * 0.5 + 0.5 - d.abs()).clamp(0.0, 1.0)
                } else {
                    (0.5 - d).clamp(0.0, 1.0)
                };
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }

    fn image(&mut self, image: &ImageCommand) {
        if image.width == 0 || image.height == 0 || image.pixels.is_empty() {
            return;
        }
        let (x0, y0) = (image.x.round() as i64, image.y.round() as i64);
        let w = image.display_width.round() as i64;
        let h = image.display_height.round() as i64;
        if w <= 0 || h <= 0 {
            return;
        }
        let (dx0, dx1) = (
            x0.saturating_neg().max(0),
            w.min((self.width as i64).saturating_sub(x0)),
        );
        let (dy0, dy1) = (
            y0.saturating_neg().max(0),
            h.min((self.height as i64).saturating_sub(y0)),
        );
        for dy in dy0..dy1 {
            let sy = (dy as i128 * image.height as i128 / h as i128).min(image.height as i128 - 1) as usize;
            for dx in dx0..dx1 {
                let sx = (dx as i128 * image.width as i128 / w as i128).min(image.width as i128 - 1) as usize;
                let v = image
                    .pixels
                    .get(sy * image.width as usize + sx)
                    .copied()
                    .unwrap_or(0.0)
                    .clamp(0.0, 1.0);
                self.blend(x0 + dx, y0 + dy, Color::rgb(v, v, v), 1.0);
            }
        }
    }
}

/// Signed distance-like value for a marker shape: negative inside
fn marker_distance(shape: MarkerShape, dx: f32, dy: f32, r: f32) -> f32 {
    let arm = (r * 0.25).max(1.0);
    match shape {
        MarkerShape::Circle | MarkerShape::Star => (dx * dx + dy * dy).sqrt() - r,
        MarkerShape::Point => (dx * dx + dy * dy).sqrt() - r * 0.5,
        MarkerShape::Square => dx.abs().max(dy.abs()) - r,
        MarkerShape::Diamond => (dx.abs() + dy.abs()) * std::f32::consts::FRAC_1_SQRT_2 - r * 0.75,
        MarkerShape::Plus => {
            let bar_h = (dx.abs() - r).max(dy.abs() - arm);
            let bar_v = (dx.abs() - arm).max(dy.abs() - r);
            bar_h.min(bar_v)
        }
        MarkerShape::Cross => {
            let (u, v) = (
                (dx + dy) * std::f32::consts::FRAC_1_SQRT_2,
                (dx - dy) * std::f32::consts::FRAC_1_SQRT_2,
            );
            let a = (u.abs() - r).max(v.abs() - arm);
            let b = (u.abs() - arm).max(v.abs() - r);
            a.min(b)
        }
        MarkerShape::TriangleUp | MarkerShape::TriangleDown => {
            // Device y grows downward; an upward triangle has its apex at -r
            let dy = if shape == MarkerShape::TriangleUp { dy } else { -dy };
            let k = 3f32.sqrt();
            (dy.max(0.0) - r * 0.5)
                .max((k * dx.abs() - dy) * 0.5 - r * 0.5)
                .max(-dy - r)
        }
    }
}

impl PlotRenderer for SoftwareRenderer {
    fn draw_rects(&mut self, rects: &[Rect], target: Size) {
        let scale = self.scale_for(target);
        for rect in rects {
            self.rect(rect, scale);
        }
    }

    fn draw_lines(&mut self, lines: &[Line], target: Size) {
        let scale = self.scale_for(target);
        for line in lines {
            if !line.start.is_finite() || !line.end.is_finite() {
                continue;
            }
            if line.width * scale.0.min(scale.1) > 1.5 {
                self.thick_line(line, scale);
            } else {
                self.wu_line(line, scale);
            }
        }
    }

    fn draw_circles(&mut self, circles: &[Circle], target: Size) {
        let scale = self.scale_for(target);
        for circle in circles {
            self.marker(circle, scale);
        }
    }

    fn draw_triangles(&mut self, triangles: &[Triangle], target: Size) {
        let (sx, sy) = self.scale_for(target);
        for tri in triangles {
            let mut color = tri.color.sanitized();
            if tri.lit {
                let n = tri.average_normal();
                let k = lambert([n.x, n.y, n.z]);
                color = Color::rgba(color.r * k, color.g * k, color.b * k, color.a);
            }
            let v = tri.vertices.map(|p| (p.x * sx, p.y * sy));
            self.fill_triangle(v, color, &|_, _| true);
        }
    }

    fn draw_text(&mut self, _text: &TextCommand) {}

    fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.5
    }

    fn draw_image(&mut self, image: &ImageCommand) {
        self.image(image);
    }

    fn clear(&mut self, color: Color) {
        let rgba = color.sanitized().to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    fn supports_text(&self) -> bool {
        false
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTarget { width, height });
        }
        self.width = width;
        self.height = height;
        self.pixels = vec![0; width as usize * height as usize * 4];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{DashPattern, Point3};

    const TARGET: Size = Size::new(64.0, 64.0);

    fn canvas() -> SoftwareRenderer {
        let mut r = SoftwareRenderer::new(64, 64);
        r.clear(Color::WHITE);
        r
    }

    #[test]
    fn test_clear_fills_every_pixel() {
        let mut r = SoftwareRenderer::new(4, 3);
        r.clear(Color::rgb(0.0, 0.0, 1.0));
        assert_eq!(r.pixels().len(), 4 * 3 * 4);
        assert!(r.pixels().chunks(4).all(|p| p == [0, 0, 255, 255]));
    }

    #[test]
    fn test_rect_fill() {
        let mut r = canvas();
        r.draw_rects(&[Rect::filled(10.0, 10.0, 20.0, 20.0, Color::RED)], TARGET);
        assert_eq!(r.pixel(15, 15), Some([255, 0, 0, 255]));
        assert_eq!(r.pixel(5, 5), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(30, 30), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_target_scaling() {
        let mut r = canvas();
        // Half-size target: everything doubles
        r.draw_rects(
            &[Rect::filled(5.0, 5.0, 10.0, 10.0, Color::BLUE)],
            Size::new(32.0, 32.0),
        );
        assert_eq!(r.pixel(25, 25), Some([0, 0, 255, 255]));
        assert_eq!(r.pixel(31, 31), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_translucent_blend() {
        let mut r = canvas();
        r.draw_rects(
            &[Rect::filled(0.0, 0.0, 64.0, 64.0, Color::BLACK.with_alpha(0.5))],
            TARGET,
        );
        let [red, _, _, a] = r.pixel(1, 1).unwrap();
        assert!((127..=128).contains(&red));
        assert_eq!(a, 255);
    }

    #[test]
    fn test_horizontal_wu_line() {
        let mut r = canvas();
        let line = Line::solid(Point3::xy(4.0, 20.0), Point3::xy(60.0, 20.0), 1.0, Color::BLACK);
        r.draw_lines(&[line], TARGET);
        let [v, _, _, _] = r.pixel(30, 20).unwrap();
        assert!(v < 10, "line pixel should be dark, got {v}");
        assert_eq!(r.pixel(30, 40), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_dashed_thick_line_has_gaps() {
        let mut r = canvas();
        let mut line = Line::solid(Point3::xy(0.0, 32.0), Point3::xy(64.0, 32.0), 4.0, Color::BLACK);
        line.dash = DashPattern::new(8.0, 8.0);
        r.draw_lines(&[line], TARGET);
        assert_eq!(r.pixel(4, 32), Some([0, 0, 0, 255]));
        assert_eq!(r.pixel(12, 32), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(20, 32), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_filled_and_outline_markers() {
        let mut r = canvas();
        let filled = Circle::filled(Point3::xy(16.0, 16.0), 6.0, Color::GREEN);
        let mut ring = Circle::filled(Point3::xy(48.0, 48.0), 8.0, Color::GREEN);
        ring.stroke_width = 2.0;
        r.draw_circles(&[filled, ring], TARGET);

        assert_eq!(r.pixel(16, 16), Some([0, 255, 0, 255]));
        // Ring center stays background
        assert_eq!(r.pixel(48, 48), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(55, 48), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_square_marker_fills_corner() {
        let mut r = canvas();
        let sq = Circle::filled(Point3::xy(32.0, 32.0), 8.0, Color::RED).with_shape(MarkerShape::Square);
        r.draw_circles(&[sq], TARGET);
        // Inside the square's corner but outside the inscribed circle
        assert_eq!(r.pixel(38, 38), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_triangle_fill() {
        let mut r = canvas();
        let tri = Triangle::unlit(
            [Point3::xy(0.0, 0.0), Point3::xy(60.0, 0.0), Point3::xy(0.0, 60.0)],
            Color::BLUE,
        );
        r.draw_triangles(&[tri], TARGET);
        assert_eq!(r.pixel(10, 10), Some([0, 0, 255, 255]));
        assert_eq!(r.pixel(50, 50), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_lit_triangle_is_shaded() {
        let mut r = canvas();
        let tri = Triangle::lit(
            [Point3::xy(0.0, 0.0), Point3::xy(60.0, 0.0), Point3::xy(0.0, 60.0)],
            [Point3::new(1.0, 0.0, 0.0); 3],
            Color::WHITE,
        );
        r.draw_triangles(&[tri], TARGET);
        let [v, _, _, _] = r.pixel(10, 10).unwrap();
        assert!(v < 255 && v > 0);
    }

    #[test]
    fn test_image_nearest_neighbor() {
        let mut r = canvas();
        r.draw_image(&ImageCommand {
            pixels: vec![0.0, 1.0, 1.0, 0.0],
            width: 2,
            height: 2,
            x: 0.0,
            y: 0.0,
            display_width: 32.0,
            display_height: 32.0,
        });
        assert_eq!(r.pixel(4, 4), Some([0, 0, 0, 255]));
        assert_eq!(r.pixel(20, 4), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(4, 20), Some([255, 255, 255, 255]));
        assert_eq!(r.pixel(20, 20), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_huge_line_only_touches_canvas() {
        let mut r = canvas();
        let start = std::time::Instant::now();
        let long = Line::solid(Point3::xy(-2e8, 10.0), Point3::xy(2e8, 10.0), 1.0, Color::BLACK);
        let steep = Line::solid(Point3::xy(20.0, -1e8), Point3::xy(20.0, 1e8), 1.0, Color::BLACK);
        r.draw_lines(&[long, steep], TARGET);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));

        let [v, _, _, _] = r.pixel(40, 10).unwrap();
        assert!(v < 10, "horizontal span should cross the canvas, got {v}");
        let [v, _, _, _] = r.pixel(20, 50).unwrap();
        assert!(v < 10, "vertical span should cross the canvas, got {v}");
        assert_eq!(r.pixel(40, 40), Some([255, 255, 255, 255]));
    }

    #[test]
    fn test_huge_marker_only_touches_canvas() {
        let mut r = canvas();
        let start = std::time::Instant::now();
        let disc = Circle::filled(Point3::xy(32.0, 32.0), 1e5, Color::GREEN);
        let far = Circle::filled(Point3::xy(-5e5, 3e5), 2e4, Color::RED);
        r.draw_circles(&[disc, far], TARGET);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));

        assert!(r.pixels().chunks(4).all(|p| p == [0, 255, 0, 255]));
    }

    #[test]
    fn test_huge_image_is_clipped() {
        let mut r = canvas();
        r.draw_image(&ImageCommand {
            pixels: vec![1.0, 0.0],
            width: 2,
            height: 1,
            x: -1e7,
            y: -10.0,
            display_width: 2e7,
            display_height: 1e9,
        });
        // The canvas sits just inside the dark right half
        assert!(r.pixels().chunks(4).all(|p| p == [0, 0, 0, 255]));
    }

    #[test]
    fn test_resize_rejects_zero() {
        let mut r = SoftwareRenderer::new(8, 8);
        assert!(r.resize(0, 8).is_err());
        r.resize(16, 4).unwrap();
        assert_eq!(r.pixels().len(), 16 * 4 * 4);
        assert!(!r.supports_text());
    }
}
