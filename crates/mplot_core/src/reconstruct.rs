//! Rectangle reconstruction
//!
//! Plotting layers often draw a filled box (a bar, a legend swatch) as four
//! unconnected two-point segments. Rendered as-is that gives four blended
//! strokes with seams; here such quadruples are found and promoted to one
//! filled [`Rect`].
//!
//! The pass is greedy first-fit in list order with a used-guard, quadratic
//! in the number of pending segments. Frame-local segment counts are small.

use crate::color::Color;
use crate::primitives::{Line, Point3, RawSegment, Rect};

/// Pixel tolerance for "horizontal", "vertical" and edge coincidence
pub const POSITION_TOLERANCE: f32 = 2.0;

/// Per-channel tolerance for matching edge colors
pub const COLOR_TOLERANCE: f32 = 0.01;

/// Output of a reconstruction pass
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconstruction {
    /// Boxes recovered from four segments each
    pub rects: Vec<Rect>,
    /// Segments that were not part of any box
    pub lines: Vec<Line>,
}

fn is_horizontal(s: &RawSegment) -> bool {
    (s.y1 - s.y2).abs() < POSITION_TOLERANCE
}

fn is_vertical(s: &RawSegment) -> bool {
    (s.x1 - s.x2).abs() < POSITION_TOLERANCE
}

fn colors_match(a: &Color, b: &Color) -> bool {
    a.approx_eq_rgb(b, COLOR_TOLERANCE)
}

fn near(a: f32, b: f32) -> bool {
    (a - b).abs() <= POSITION_TOLERANCE
}

/// Edges of a candidate box in device pixels
#[derive(Clone, Copy)]
struct BoxEdges {
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
}

/// Find the left and right edges of the box spanned by horizontals `i`, `j`
fn find_verticals(
    segments: &[RawSegment],
    used: &[bool],
    (i, j): (usize, usize),
    edges: BoxEdges,
) -> Option<(usize, usize)> {
    let color = &segments[i].color;
    let mut left = None;
    let mut right = None;

    for (k, sv) in segments.iter().enumerate() {
        if used[k] || k == i || k == j {
            continue;
        }
        if !is_vertical(sv) || !colors_match(color, &sv.color) {
            continue;
        }
        if !near(sv.min_y(), edges.top) || !near(sv.max_y(), edges.bottom) {
            continue;
        }
        if (sv.x1 - edges.left).abs() < POSITION_TOLERANCE {
            left.get_or_insert(k);
        } else if (sv.x1 - edges.right).abs() < POSITION_TOLERANCE {
            right.get_or_insert(k);
        }
        if left.is_some() && right.is_some() {
            break;
        }
    }

    left.zip(right)
}

/// Promote closed axis-aligned boxes among `segments` to filled rects
///
/// Each segment ends up in exactly one of the two outputs. Leftover
/// segments become solid lines of `line_width` at depth 0.
pub fn reconstruct_rectangles(segments: &[RawSegment], line_width: f32) -> Reconstruction {
    let mut out = Reconstruction::default();
    if segments.is_empty() {
        return out;
    }

    let mut used = vec![false; segments.len()];

    for i in 0..segments.len() {
        if used[i] || !is_horizontal(&segments[i]) {
            continue;
        }
        let s1 = segments[i];
        let (x_left, x_right, y1) = (s1.min_x(), s1.max_x(), s1.y1);

        for j in (i + 1)..segments.len() {
            if used[j] {
                continue;
            }
            let s2 = segments[j];
            if !is_horizontal(&s2) || !colors_match(&s1.color, &s2.color) {
                continue;
            }
            // Top and bottom must be distinct edges
            if (s2.y1 - y1).abs() < POSITION_TOLERANCE {
                continue;
            }
            if !near(s2.min_x(), x_left) || !near(s2.max_x(), x_right) {
                continue;
            }

            let y2 = s2.y1;
            let edges = BoxEdges {
                left: x_left,
                right: x_right,
                top: y1.min(y2),
                bottom: y1.max(y2),
            };
            if let Some((left, right)) = find_verticals(segments, &used, (i, j), edges) {
                out.rects.push(Rect::filled(
                    edges.left,
                    edges.top,
                    edges.right - edges.left,
                    edges.bottom - edges.top,
                    s1.color,
                ));
                for k in [i, j, left, right] {
                    used[k] = true;
                }
                break;
            }
        }
    }

    for (s, _) in segments.iter().zip(&used).filter(|(_, u)| !**u) {
        out.lines.push(Line::solid(
            Point3::xy(s.x1, s.y1),
            Point3::xy(s.x2, s.y2),
            line_width,
            s.color,
        ));
    }

    if !out.rects.is_empty() {
        tracing::debug!(
            "reconstructed {} rects from {} segments ({} left as lines)",
            out.rects.len(),
            segments.len(),
            out.lines.len()
        );
    }

    out
}
