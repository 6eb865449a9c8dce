//! Fixed-layout instance record and the pack functions that fill it
//!
//! Every primitive kind is encoded into the same 80-byte [`Instance`] so a
//! whole frame can be drawn from one vertex buffer. The layout below is the
//! only place that knows which slot holds what; the WGSL in
//! [`crate::shaders`] reads the same slots.
//!
//! | kind          | `pos_a_radius`          | `pos_b_width`            | `params`                 | `pos_c_pad`     |
//! |---------------|-------------------------|--------------------------|--------------------------|-----------------|
//! | rectangle     | x, y, z, corner radius  | w, h, 0, stroke width    | tag                      | unused          |
//! | circle        | cx, cy, cz, radius      | 0, 0, 0, stroke width    | tag, shape               | unused          |
//! | line          | x1, y1, z1, half width  | x2, y2, z2, 0            | tag, dash, gap, offset   | unused          |
//! | triangle      | v1, normal.x            | v2, normal.y             | tag                      | v3, normal.z    |
//! | textured quad | x, y, z, rotation       | w, h, 0, 0               | tag                      | UV rect         |

use mplot_core::{Circle, Color, Line, Rect, Triangle};

/// Primitive kinds (must match shader constants)
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveTag {
    Rectangle = 0,
    Circle = 1,
    Line = 2,
    TriangleLit = 30,
    TriangleUnlit = 31,
    TexturedQuad = 40,
}

impl PrimitiveTag {
    pub fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => PrimitiveTag::Rectangle,
            1 => PrimitiveTag::Circle,
            2 => PrimitiveTag::Line,
            30 => PrimitiveTag::TriangleLit,
            31 => PrimitiveTag::TriangleUnlit,
            40 => PrimitiveTag::TexturedQuad,
            _ => return None,
        })
    }

    /// Faces are drawn first, with depth writes
    pub fn is_face(self) -> bool {
        matches!(
            self,
            PrimitiveTag::Rectangle
                | PrimitiveTag::Circle
                | PrimitiveTag::TriangleLit
                | PrimitiveTag::TriangleUnlit
        )
    }

    fn as_f32(self) -> f32 {
        self as u32 as f32
    }
}

/// One instanced primitive (80 bytes)
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Instance {
    pub pos_a_radius: [f32; 4],
    pub pos_b_width: [f32; 4],
    pub color: [f32; 4],
    /// `params[0]` is the [`PrimitiveTag`]
    pub params: [f32; 4],
    pub pos_c_pad: [f32; 4],
}

impl Instance {
    /// Decode the tag; `None` for a corrupted record
    pub fn tag(&self) -> Option<PrimitiveTag> {
        let raw = self.params[0];
        if raw < 0.0 || raw.fract() != 0.0 {
            return None;
        }
        PrimitiveTag::from_raw(raw as u32)
    }

    pub fn is_face(&self) -> bool {
        self.tag().is_some_and(PrimitiveTag::is_face)
    }
}

/// Where a textured quad lands, in device pixels
///
/// The quad spans `width x height` from its top-left corner `(x, y)` and
/// rotates counter-clockwise by `rotation` radians about that corner.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadPlacement {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub width: f32,
    pub height: f32,
    pub rotation: f32,
}

impl QuadPlacement {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            width,
            height,
            rotation: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Full texture UV rect: u0, v0, u1, v1
pub const FULL_UV: [f32; 4] = [0.0, 0.0, 1.0, 1.0];

pub fn pack_rect(rect: &Rect) -> Instance {
    Instance {
        pos_a_radius: [rect.x, rect.y, rect.z, rect.corner_radius],
        pos_b_width: [rect.width, rect.height, 0.0, rect.stroke_width],
        color: rect.color.to_array(),
        params: [PrimitiveTag::Rectangle.as_f32(), 0.0, 0.0, 0.0],
        pos_c_pad: [0.0; 4],
    }
}

pub fn pack_line(line: &Line) -> Instance {
    let (s, e) = (line.start, line.end);
    Instance {
        pos_a_radius: [s.x, s.y, s.z, line.width * 0.5],
        pos_b_width: [e.x, e.y, e.z, 0.0],
        color: line.color.to_array(),
        params: [
            PrimitiveTag::Line.as_f32(),
            line.dash.dash,
            line.dash.gap,
            line.dash.offset,
        ],
        pos_c_pad: [0.0; 4],
    }
}

pub fn pack_circle(circle: &Circle) -> Instance {
    let c = circle.center;
    Instance {
        pos_a_radius: [c.x, c.y, c.z, circle.radius],
        pos_b_width: [0.0, 0.0, 0.0, circle.stroke_width],
        color: circle.color.to_array(),
        params: [
            PrimitiveTag::Circle.as_f32(),
            circle.shape.code() as f32,
            0.0,
            0.0,
        ],
        pos_c_pad: [0.0; 4],
    }
}

/// Pack a triangle; lit triangles carry their averaged normal in the `.w` slots
pub fn pack_triangle(triangle: &Triangle) -> Instance {
    let [a, b, c] = triangle.vertices;
    let n = triangle.average_normal();
    let tag = if triangle.lit {
        PrimitiveTag::TriangleLit
    } else {
        PrimitiveTag::TriangleUnlit
    };
    Instance {
        pos_a_radius: [a.x, a.y, a.z, n.x],
        pos_b_width: [b.x, b.y, b.z, n.y],
        color: triangle.color.to_array(),
        params: [tag.as_f32(), 0.0, 0.0, 0.0],
        pos_c_pad: [c.x, c.y, c.z, n.z],
    }
}

pub fn pack_textured_quad(placement: &QuadPlacement, tint: Color, uv: [f32; 4]) -> Instance {
    Instance {
        pos_a_radius: [placement.x, placement.y, placement.z, placement.rotation],
        pos_b_width: [placement.width, placement.height, 0.0, 0.0],
        color: tint.to_array(),
        params: [PrimitiveTag::TexturedQuad.as_f32(), 0.0, 0.0, 0.0],
        pos_c_pad: uv,
    }
}
