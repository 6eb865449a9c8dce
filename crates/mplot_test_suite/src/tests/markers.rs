//! Marker rendering tests
//!
//! Every marker shape, filled and outlined, plus scatter plots

use crate::runner::TestSuite;
use crate::tests::sample;
use mplot_core::{Color, MarkerShape, StyleState};

const SHAPES: [MarkerShape; 9] = [
    MarkerShape::Circle,
    MarkerShape::Square,
    MarkerShape::Diamond,
    MarkerShape::Plus,
    MarkerShape::Cross,
    MarkerShape::TriangleUp,
    MarkerShape::TriangleDown,
    MarkerShape::Star,
    MarkerShape::Point,
];

fn shape_row(filled: bool) -> impl FnOnce(&mut crate::harness::TestContext) + Send {
    move |ctx| {
        let plot = ctx.plot();
        plot.draw_background(Color::WHITE);
        for (i, shape) in SHAPES.iter().enumerate() {
            let x = 60.0 + i as f64 * 85.0;
            plot.set_style(
                StyleState::default()
                    .with_marker(*shape, 24.0, filled)
                    .with_line_width(3.0),
            );
            plot.draw_markers(&[x], &[300.0], None, Color::from_hex(0x1f77b4));
        }
    }
}

/// Create the markers test suite
pub fn suite() -> TestSuite {
    let mut suite = TestSuite::new("markers");

    suite.add("all_shapes_filled", shape_row(true));
    suite.add("all_shapes_outline", shape_row(false));

    suite.add("scatter", |ctx| {
        let plot = ctx.plot();
        plot.draw_background(Color::WHITE);
        plot.set_style(StyleState::default().with_marker(MarkerShape::Circle, 5.0, true));
        let (xs, ys) = sample(50.0, 750.0, 60, |x| 300.0 + 200.0 * ((x * 0.37).sin() * (x * 0.011).cos()));
        plot.draw_markers(&xs, &ys, None, Color::from_hex(0xd62728).with_alpha(0.7));
    });

    // Style strings as plotting layers pass them
    suite.add("parsed_styles", |ctx| {
        let plot = ctx.plot();
        plot.draw_background(Color::WHITE);
        for (i, style) in ["o", "s", "d", "+", "x", "^", "v", "*", "."].iter().enumerate() {
            let shape = MarkerShape::parse(style);
            plot.set_style(StyleState::default().with_marker(shape, 14.0, true));
            let x = 60.0 + i as f64 * 85.0;
            plot.draw_markers(&[x, x, x], &[150.0, 300.0, 450.0], None, Color::BLACK);
        }
    });

    // Markers drawn over a line plot
    suite.add("line_with_markers", |ctx| {
        let plot = ctx.plot();
        plot.draw_background(Color::WHITE);
        let (xs, ys) = sample(80.0, 720.0, 9, |x| 150.0 + x * 0.4);
        plot.style_mut().line_width = 2.0;
        plot.draw_path(&xs, &ys, None, Color::from_hex(0x2ca02c));
        plot.set_style(StyleState::default().with_marker(MarkerShape::Square, 8.0, false));
        plot.draw_markers(&xs, &ys, None, Color::from_hex(0x2ca02c));
    });

    suite
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{record, run_on_gpu};
    use mplot_core::RenderCommand;

    fn circles(name: &str) -> Vec<mplot_core::Circle> {
        let (_, commands) = record(suite(), name, false);
        commands
            .into_iter()
            .find_map(|c| match c {
                RenderCommand::Circles(circles, _) => Some(circles),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_every_shape_is_drawn() {
        let drawn: Vec<MarkerShape> = circles("all_shapes_filled").iter().map(|c| c.shape).collect();
        assert_eq!(drawn, SHAPES.to_vec());
    }

    #[test]
    fn test_outline_markers_carry_stroke() {
        let outlined = circles("all_shapes_outline");
        assert!(outlined.iter().all(|c| c.stroke_width == 3.0));
        let filled = circles("all_shapes_filled");
        assert!(filled.iter().all(|c| c.stroke_width == 0.0));
    }

    #[test]
    fn test_parsed_styles_match_codes() {
        let shapes: Vec<u32> = circles("parsed_styles")
            .iter()
            .step_by(3)
            .map(|c| c.shape.code())
            .collect();
        assert_eq!(shapes, (0..9).collect::<Vec<u32>>());
    }

    #[test]
    #[ignore] // Requires GPU
    fn run_markers_suite() {
        run_on_gpu(suite());
    }
}
