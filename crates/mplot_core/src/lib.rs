//! mplot Core
//!
//! Host-side half of the mplot plot renderer. A plotting layer streams draw
//! calls in logical plot coordinates; this crate turns them into typed
//! primitives in device pixels and hands them to a [`PlotRenderer`].
//!
//! - **Coordinate Transformer**: aspect-preserving logical → physical mapping
//! - **Draw-Command Collector**: per-frame primitive lists driven by a [`StyleState`]
//! - **Rectangle Reconstruction**: promotes four-edge boxes back into filled rects
//! - **Renderer variants**: recording, CPU software rasterizer (the GPU
//!   variant lives in `mplot_gpu`)
//!
//! # Example
//!
//! ```rust
//! use mplot_core::{Color, PlotCollector, RecordingRenderer, Size};
//!
//! let mut plot = PlotCollector::new(
//!     RecordingRenderer::new(),
//!     Size::new(800.0, 600.0),
//!     Size::new(800.0, 600.0),
//! );
//!
//! plot.new_frame();
//! plot.draw_background(Color::WHITE);
//! plot.draw_path(&[0.0, 100.0], &[0.0, 0.0], None, Color::RED);
//! let stats = plot.end_frame().unwrap();
//! assert_eq!(stats.lines, 1);
//! ```

pub mod collector;
pub mod color;
pub mod error;
pub mod math;
pub mod primitives;
pub mod reconstruct;
pub mod recording;
pub mod renderer;
pub mod software;
pub mod style;
pub mod transform;

pub use collector::{FrameStats, PlotCollector};
pub use color::Color;
pub use error::{RenderError, Result};
pub use math::Mat4;
pub use primitives::{
    Circle, DashPattern, ImageCommand, Line, MarkerShape, Point3, RawSegment, Rect, TextCommand,
    Triangle,
};
pub use reconstruct::{reconstruct_rectangles, Reconstruction, POSITION_TOLERANCE};
pub use recording::{replay_commands, RecordingRenderer, RenderCommand};
pub use renderer::PlotRenderer;
pub use software::SoftwareRenderer;
pub use style::{LineStyle, StyleState};
pub use transform::{Size, Viewport};
