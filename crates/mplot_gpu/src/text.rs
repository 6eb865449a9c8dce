//! String rasterization for text quads
//!
//! A single sans-serif face is located through `fontdb`, character-to-glyph
//! mapping and advances come from `ttf-parser`, and glyph coverage is
//! rendered with `swash`. Each string is composited into one RGBA8 bitmap
//! that the renderer uploads as a textured quad.

use fontdb::{Database, Family, Query};
use mplot_core::Color;
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::{Format, Vector};

use crate::error::TextError;

/// Empty border around rasterized strings so edge texels sample clean
pub(crate) const PADDING: u32 = 1;

/// Named fallbacks when the generic sans-serif query finds nothing
const FALLBACK_FAMILIES: &[&str] = &["DejaVu Sans", "Noto Sans", "Liberation Sans", "Arial", "Helvetica"];

/// A string composited into one bitmap
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedText {
    /// RGBA8 rows, top to bottom
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Rows from the top of the bitmap to the baseline
    pub baseline: u32,
}

/// Turns strings into RGBA bitmaps with one font face
pub struct TextRasterizer {
    data: Vec<u8>,
    face_index: u32,
    context: ScaleContext,
}

impl std::fmt::Debug for TextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRasterizer")
            .field("font_bytes", &self.data.len())
            .field("face_index", &self.face_index)
            .finish()
    }
}

impl TextRasterizer {
    /// Load a sans-serif face from the system font directories
    pub fn new() -> Result<Self, TextError> {
        let mut db = Database::new();
        db.load_system_fonts();

        let mut id = db.query(&Query {
            families: &[Family::SansSerif],
            ..Query::default()
        });
        for name in FALLBACK_FAMILIES {
            if id.is_some() {
                break;
            }
            id = db.query(&Query {
                families: &[Family::Name(*name)],
                ..Query::default()
            });
        }

        let id = id.ok_or(TextError::NoFont)?;
        let (data, face_index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or(TextError::NoFont)?;

        tracing::debug!(faces = db.len(), "loaded system font");
        Self::from_bytes(data, face_index)
    }

    /// Use font bytes supplied by the caller
    pub fn from_bytes(data: Vec<u8>, face_index: u32) -> Result<Self, TextError> {
        ttf_parser::Face::parse(&data, face_index)
            .map_err(|e| TextError::InvalidFont(e.to_string()))?;
        if swash::FontRef::from_index(&data, face_index as usize).is_none() {
            return Err(TextError::InvalidFont("unsupported font container".into()));
        }
        Ok(Self {
            data,
            face_index,
            context: ScaleContext::new(),
        })
    }

    /// Sum of glyph advances at `font_size`, in pixels
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        let Ok(face) = ttf_parser::Face::parse(&self.data, self.face_index) else {
            return 0.0;
        };
        let scale = font_size / face.units_per_em() as f32;
        text.chars()
            .map(|c| advance(&face, c) as f32 * scale)
            .sum()
    }

    /// Rasterize `text`; `None` for an empty string or non-positive size
    pub fn rasterize(&mut self, text: &str, font_size: f32, color: Color) -> Option<RasterizedText> {
        if text.is_empty() || font_size <= 0.0 || !font_size.is_finite() {
            return None;
        }

        let data: &[u8] = &self.data;
        let face = ttf_parser::Face::parse(data, self.face_index).ok()?;
        let font = swash::FontRef::from_index(data, self.face_index as usize)?;

        let scale = font_size / face.units_per_em() as f32;
        let ascent = face.ascender() as f32 * scale;
        let descent = -(face.descender() as f32) * scale;
        let advance_total: f32 = text.chars().map(|c| advance(&face, c) as f32 * scale).sum();

        let baseline = ascent.ceil() as u32 + PADDING;
        let width = advance_total.ceil() as u32 + PADDING * 2;
        let height = (ascent.ceil() + descent.max(0.0).ceil()) as u32 + PADDING * 2;
        let mut coverage = vec![0u8; (width * height) as usize];

        let mut scaler = self.context.builder(font).size(font_size).hint(false).build();
        let mut pen_x = PADDING as f32;

        for c in text.chars() {
            let glyph = face.glyph_index(c).map_or(0, |g| g.0);
            let origin = pen_x.floor();
            let image = Render::new(&[Source::Outline])
                .format(Format::Alpha)
                .offset(Vector::new(pen_x - origin, 0.0))
                .render(&mut scaler, glyph);

            if let Some(image) = image {
                let left = origin as i32 + image.placement.left;
                let top = baseline as i32 - image.placement.top;
                blit_coverage(
                    &mut coverage,
                    (width, height),
                    &image.data,
                    (image.placement.width, image.placement.height),
                    (left, top),
                );
            }
            pen_x += advance(&face, c) as f32 * scale;
        }

        let [r, g, b, a] = color.sanitized().to_rgba8();
        let pixels = coverage
            .iter()
            .flat_map(|&cov| [r, g, b, ((cov as u32 * a as u32 + 127) / 255) as u8])
            .collect();

        Some(RasterizedText {
            pixels,
            width,
            height,
            baseline,
        })
    }
}

fn advance(face: &ttf_parser::Face<'_>, c: char) -> u16 {
    let glyph = face.glyph_index(c).unwrap_or(ttf_parser::GlyphId(0));
    face.glyph_hor_advance(glyph).unwrap_or(0)
}

/// Add a glyph's coverage into the string bitmap, clipping at the edges
fn blit_coverage(
    dst: &mut [u8],
    (dst_w, dst_h): (u32, u32),
    src: &[u8],
    (src_w, src_h): (u32, u32),
    (left, top): (i32, i32),
) {
    for sy in 0..src_h as i32 {
        let dy = top + sy;
        if dy < 0 || dy >= dst_h as i32 {
            continue;
        }
        for sx in 0..src_w as i32 {
            let dx = left + sx;
            if dx < 0 || dx >= dst_w as i32 {
                continue;
            }
            let Some(&value) = src.get((sy * src_w as i32 + sx) as usize) else {
                continue;
            };
            let cell = &mut dst[(dy as u32 * dst_w + dx as u32) as usize];
            *cell = cell.saturating_add(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_font_bytes_are_rejected() {
        let err = TextRasterizer::from_bytes(vec![0u8; 64], 0).unwrap_err();
        assert!(matches!(err, TextError::InvalidFont(_)));
    }

    #[test]
    fn test_blit_clips_at_edges() {
        let mut dst = vec![0u8; 4 * 4];
        let src = vec![200u8; 3 * 3];
        blit_coverage(&mut dst, (4, 4), &src, (3, 3), (-1, 2));
        // Only columns 0..2 of rows 2..4 are inside
        assert_eq!(dst[2 * 4], 200);
        assert_eq!(dst[3 * 4 + 1], 200);
        assert_eq!(dst[3 * 4 + 2], 0);
        assert_eq!(dst[0], 0);

        blit_coverage(&mut dst, (4, 4), &src, (3, 3), (-1, 2));
        assert_eq!(dst[2 * 4], 255);
    }

    #[test]
    fn test_system_font_measures_and_rasterizes() {
        // Machines without fonts exercise the no-text path instead
        let Ok(mut text) = TextRasterizer::new() else {
            return;
        };

        let short = text.measure("ab", 16.0);
        let long = text.measure("abcd", 16.0);
        assert!(short > 0.0);
        assert!(long > short);
        assert!((text.measure("abcd", 32.0) - long * 2.0).abs() < 0.01);

        let bitmap = text.rasterize("Hello", 16.0, Color::BLACK).unwrap();
        assert_eq!(bitmap.pixels.len(), (bitmap.width * bitmap.height * 4) as usize);
        assert!(bitmap.width as f32 >= text.measure("Hello", 16.0));
        assert!(bitmap.baseline < bitmap.height);
        assert!(bitmap.pixels.chunks(4).any(|px| px[3] > 0));

        assert!(text.rasterize("", 16.0, Color::BLACK).is_none());
    }
}
