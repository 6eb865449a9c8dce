//! mplot Visual Test Suite
//!
//! Visual regression testing for the mplot renderers. Each case draws a
//! frame through [`PlotCollector`](mplot_core::PlotCollector), the harness
//! replays it into the GPU backend (the software rasterizer stands in when
//! no adapter is available) and compares the pixels to a stored reference.
//!
//! # Test Categories
//!
//! - **shapes**: rects, backgrounds, closed-path boxes
//! - **lines**: solid, dashed, dotted and joined polylines
//! - **markers**: every marker shape, filled and outlined
//! - **reconstruction**: boxes recovered from separate edge segments
//! - **triangles**: lit and unlit meshes
//! - **images**: greyscale grids
//! - **text**: labels and rotated text (skipped without a font)
//! - **aspect**: logical canvases letterboxed into other target shapes

pub mod compare;
pub mod harness;
pub mod runner;
pub mod tests;

pub use compare::{compare_images, diff_pixels, CompareResult, SOFT_THRESHOLD};
pub use harness::{TestContext, TestHarness, TestHarnessConfig, TestResult};
pub use runner::{RunResult, TestRunner, TestSuite};
