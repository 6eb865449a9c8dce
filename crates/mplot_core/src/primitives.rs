//! Plot primitive records
//!
//! Every record here is in device pixels (origin top-left) by the time it
//! reaches a [`PlotRenderer`](crate::PlotRenderer). The optional `z` is a
//! depth hint in -1..1 (+1 nearest the viewer); 2D content uses 0.

use crate::color::Color;

/// A point in device space with a depth hint
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn xy(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn distance_2d(&self, other: &Point3) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Axis-aligned rectangle (filled when `stroke_width` is 0)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    /// Top-left corner
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color,
    pub stroke_width: f32,
    pub corner_radius: f32,
    pub z: f32,
}

impl Rect {
    /// Filled, square-cornered rectangle at depth 0
    pub fn filled(x: f32, y: f32, width: f32, height: f32, color: Color) -> Self {
        Self {
            x,
            y,
            width,
            height,
            color,
            stroke_width: 0.0,
            corner_radius: 0.0,
            z: 0.0,
        }
    }

    pub fn with_stroke(mut self, width: f32) -> Self {
        self.stroke_width = width;
        self
    }

    pub fn with_corner_radius(mut self, radius: f32) -> Self {
        self.corner_radius = radius;
        self
    }

    pub fn with_z(mut self, z: f32) -> Self {
        self.z = z;
        self
    }
}

/// Dash pattern in pixels; 0/0 is a solid stroke
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct DashPattern {
    pub dash: f32,
    pub gap: f32,
    /// Phase along the stroke where this segment starts
    pub offset: f32,
}

impl DashPattern {
    pub const SOLID: DashPattern = DashPattern {
        dash: 0.0,
        gap: 0.0,
        offset: 0.0,
    };

    pub const fn new(dash: f32, gap: f32) -> Self {
        Self {
            dash,
            gap,
            offset: 0.0,
        }
    }

    pub fn with_offset(mut self, offset: f32) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_solid(&self) -> bool {
        self.dash <= 0.0
    }

    /// Whether the point `distance` pixels along the stroke is inside a dash
    pub fn is_on(&self, distance: f32) -> bool {
        if self.is_solid() {
            return true;
        }
        let period = self.dash + self.gap;
        (distance + self.offset).rem_euclid(period) < self.dash
    }
}

/// A single stroked segment
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub start: Point3,
    pub end: Point3,
    pub color: Color,
    /// Full stroke thickness
    pub width: f32,
    pub dash: DashPattern,
}

impl Line {
    pub fn solid(start: Point3, end: Point3, width: f32, color: Color) -> Self {
        Self {
            start,
            end,
            color,
            width,
            dash: DashPattern::SOLID,
        }
    }

    pub fn length(&self) -> f32 {
        self.start.distance_2d(&self.end)
    }
}

/// Point-marker shapes (must match shader constants)
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MarkerShape {
    #[default]
    Circle = 0,
    Square = 1,
    Diamond = 2,
    Plus = 3,
    Cross = 4,
    TriangleUp = 5,
    TriangleDown = 6,
    Star = 7,
    Point = 8,
}

impl MarkerShape {
    /// Parse a plot marker style string; unknown styles fall back to a circle
    pub fn parse(style: &str) -> Self {
        match style {
            "s" => MarkerShape::Square,
            "d" => MarkerShape::Diamond,
            "+" => MarkerShape::Plus,
            "x" => MarkerShape::Cross,
            "^" => MarkerShape::TriangleUp,
            "v" => MarkerShape::TriangleDown,
            "*" | "p" => MarkerShape::Star,
            "." => MarkerShape::Point,
            _ => MarkerShape::Circle,
        }
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => MarkerShape::Circle,
            1 => MarkerShape::Square,
            2 => MarkerShape::Diamond,
            3 => MarkerShape::Plus,
            4 => MarkerShape::Cross,
            5 => MarkerShape::TriangleUp,
            6 => MarkerShape::TriangleDown,
            7 => MarkerShape::Star,
            8 => MarkerShape::Point,
            _ => return None,
        })
    }
}

/// Circle record, used for every point-marker shape
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Circle {
    pub center: Point3,
    pub radius: f32,
    pub color: Color,
    pub shape: MarkerShape,
    /// 0 = filled, otherwise outline thickness
    pub stroke_width: f32,
}

impl Circle {
    pub fn filled(center: Point3, radius: f32, color: Color) -> Self {
        Self {
            center,
            radius,
            color,
            shape: MarkerShape::Circle,
            stroke_width: 0.0,
        }
    }

    pub fn with_shape(mut self, shape: MarkerShape) -> Self {
        self.shape = shape;
        self
    }
}

/// Flat triangle, optionally lit
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub vertices: [Point3; 3],
    pub normals: [Point3; 3],
    pub color: Color,
    pub lit: bool,
}

impl Triangle {
    pub const DEFAULT_NORMAL: Point3 = Point3::new(0.0, 0.0, 1.0);

    pub fn unlit(vertices: [Point3; 3], color: Color) -> Self {
        Self {
            vertices,
            normals: [Self::DEFAULT_NORMAL; 3],
            color,
            lit: false,
        }
    }

    pub fn lit(vertices: [Point3; 3], normals: [Point3; 3], color: Color) -> Self {
        Self {
            vertices,
            normals,
            color,
            lit: true,
        }
    }

    /// Twice the signed 2D area
    pub fn area2(&self) -> f32 {
        let [a, b, c] = self.vertices;
        (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
    }

    /// Normalized average of the vertex normals, or +Z when they cancel out
    pub fn average_normal(&self) -> Point3 {
        let sum = self.normals.iter().fold(Point3::default(), |acc, n| {
            Point3::new(acc.x + n.x, acc.y + n.y, acc.z + n.z)
        });
        let len = (sum.x * sum.x + sum.y * sum.y + sum.z * sum.z).sqrt();
        if len <= f32::EPSILON {
            Self::DEFAULT_NORMAL
        } else {
            Point3::new(sum.x / len, sum.y / len, sum.z / len)
        }
    }
}

/// A string to draw at an anchor (left end of the baseline)
#[derive(Clone, Debug, PartialEq)]
pub struct TextCommand {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: Color,
    pub font_size: f32,
    /// Counter-clockwise rotation in radians about the anchor
    pub rotation: f32,
}

/// Greyscale image blitted into a device-space rectangle
#[derive(Clone, Debug, PartialEq)]
pub struct ImageCommand {
    /// Row-major intensities in 0..1, `width * height` values
    pub pixels: Vec<f32>,
    pub width: u32,
    pub height: u32,
    /// Destination top-left
    pub x: f32,
    pub y: f32,
    pub display_width: f32,
    pub display_height: f32,
}

impl ImageCommand {
    /// Expand to RGBA8, grey in the color channels and opaque alpha
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for v in &self.pixels {
            let g = (v.clamp(0.0, 1.0) * 255.0 + 0.5) as u8;
            out.extend_from_slice(&[g, g, g, 255]);
        }
        out
    }
}

/// Two-point segment awaiting rectangle reconstruction
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawSegment {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub color: Color,
}

impl RawSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, color: Color) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            color,
        }
    }

    pub fn min_x(&self) -> f32 {
        self.x1.min(self.x2)
    }

    pub fn max_x(&self) -> f32 {
        self.x1.max(self.x2)
    }

    pub fn min_y(&self) -> f32 {
        self.y1.min(self.y2)
    }

    pub fn max_y(&self) -> f32 {
        self.y1.max(self.y2)
    }
}
