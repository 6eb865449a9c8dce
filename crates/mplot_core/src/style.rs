//! Style state threaded alongside geometry
//!
//! Plotting layers stream style changes interleaved with geometry. Rather
//! than hiding those in collector fields, the collector holds one explicit
//! [`StyleState`] value that can be inspected, replaced or snapshotted, so
//! a frame is reproducible from its (style, geometry) pairs.

use crate::primitives::{DashPattern, MarkerShape};

/// Stroke pattern for paths
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
    /// Paths are not stroked at all
    None,
}

impl LineStyle {
    /// Parse a plot line-style string (`-`, `--`, `:`, `-.`, `none`)
    pub fn parse(style: &str) -> Self {
        match style {
            "--" => LineStyle::Dashed,
            ":" => LineStyle::Dotted,
            "-." => LineStyle::DashDot,
            "none" | "None" | "" => LineStyle::None,
            _ => LineStyle::Solid,
        }
    }

    /// Dash/gap lengths in pixels
    pub fn dash_pattern(self) -> DashPattern {
        match self {
            LineStyle::Dashed | LineStyle::DashDot => DashPattern::new(8.0, 4.0),
            LineStyle::Dotted => DashPattern::new(2.0, 2.0),
            LineStyle::Solid | LineStyle::None => DashPattern::SOLID,
        }
    }
}

/// Style applied to subsequent draw calls until changed
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleState {
    /// Stroke thickness in device pixels
    pub line_width: f32,
    pub line_style: LineStyle,
    /// Marker radius in device pixels
    pub marker_radius: f32,
    pub marker_shape: MarkerShape,
    /// Filled markers when true, outlines stroked with `line_width` otherwise
    pub marker_face: bool,
    /// Promote closed axis-aligned 4/5-point paths to filled rects
    pub fill_closed_rects: bool,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            line_style: LineStyle::Solid,
            marker_radius: 6.0,
            marker_shape: MarkerShape::Circle,
            marker_face: true,
            fill_closed_rects: true,
        }
    }
}

impl StyleState {
    pub fn with_line_width(mut self, width: f32) -> Self {
        self.line_width = width;
        self
    }

    pub fn with_line_style(mut self, style: LineStyle) -> Self {
        self.line_style = style;
        self
    }

    pub fn with_marker(mut self, shape: MarkerShape, radius: f32, filled: bool) -> Self {
        self.marker_shape = shape;
        self.marker_radius = radius;
        self.marker_face = filled;
        self
    }

    /// Outline thickness for markers under this style
    pub fn marker_stroke_width(&self) -> f32 {
        if self.marker_face {
            0.0
        } else {
            self.line_width.max(1.0)
        }
    }
}
