//! Test harness for visual tests
//!
//! Provides infrastructure for running visual tests, including:
//! - Recording a frame through [`PlotCollector`]
//! - Replaying it into the GPU backend (or the software rasterizer when no
//!   adapter is available) and reading the pixels back
//! - Reference image comparison and blessing

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use mplot_core::{
    replay_commands, Color, FrameStats, PlotCollector, PlotRenderer, RecordingRenderer,
    RenderCommand, Size, SoftwareRenderer,
};
use mplot_gpu::{HeadlessRenderer, RendererConfig};
use serde::Deserialize;

use crate::compare::{compare_images, diff_pixels};

/// Environment variable that turns every run into a reference update
pub const BLESS_ENV: &str = "BLESS";

/// Result of a visual test
#[derive(Debug)]
pub enum TestResult {
    /// Test passed
    Passed,
    /// Test passed but reference image was created/updated
    PassedWithNewReference,
    /// Output differs from the reference beyond the thresholds
    Failed {
        rmse: f64,
        diff_pct: f64,
        diff_path: PathBuf,
    },
    /// Test skipped (e.g., no font for a text test)
    Skipped { reason: String },
}

impl TestResult {
    pub fn is_passed(&self) -> bool {
        matches!(
            self,
            TestResult::Passed | TestResult::PassedWithNewReference
        )
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TestResult::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TestResult::Failed { .. })
    }
}

/// Context for a single test
///
/// Draw calls go through a [`PlotCollector`] that records into a
/// [`RecordingRenderer`]; the harness ends the frame and replays it.
pub struct TestContext {
    plot: PlotCollector<RecordingRenderer>,
    /// Test name
    pub name: String,
}

impl TestContext {
    /// Create a context drawing a `logical` canvas into a `physical` target
    pub fn new(name: &str, logical: Size, physical: Size, text_enabled: bool) -> Self {
        let recorder = if text_enabled {
            RecordingRenderer::new()
        } else {
            RecordingRenderer::without_text()
        };
        Self {
            plot: PlotCollector::new(recorder, logical, physical),
            name: name.to_string(),
        }
    }

    /// The collector to draw with
    pub fn plot(&mut self) -> &mut PlotCollector<RecordingRenderer> {
        &mut self.plot
    }

    pub fn logical_size(&self) -> Size {
        self.plot.viewport().logical
    }

    pub fn physical_size(&self) -> Size {
        self.plot.viewport().physical
    }

    /// End the frame and hand back everything recorded
    pub fn finish(&mut self) -> Result<(FrameStats, Vec<RenderCommand>)> {
        let stats = self.plot.end_frame().context("Failed to end test frame")?;
        Ok((stats, self.plot.renderer_mut().take_commands()))
    }
}

/// Configuration for test harness
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TestHarnessConfig {
    /// Output directory for test results
    pub output_dir: PathBuf,
    /// Reference image directory
    pub reference_dir: PathBuf,
    /// Default target width (logical and physical)
    pub default_width: u32,
    pub default_height: u32,
    /// Highest acceptable RMSE on the 0-255 scale
    pub max_rmse: f64,
    /// Highest acceptable percentage of changed pixels
    pub max_diff_pct: f64,
    /// Overwrite references instead of comparing
    pub bless: bool,
    /// Try the GPU backend before the software rasterizer
    pub use_gpu: bool,
}

impl Default for TestHarnessConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test_output"),
            reference_dir: PathBuf::from("test_output/references"),
            default_width: 800,
            default_height: 600,
            max_rmse: 2.0,
            max_diff_pct: 2.0,
            bless: false,
            use_gpu: true,
        }
    }
}

impl TestHarnessConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).context("Failed to parse harness config")
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&source)
    }

    /// Apply the `BLESS` environment variable (any value but `0`)
    pub fn with_env_overrides(mut self) -> Self {
        if std::env::var_os(BLESS_ENV).is_some_and(|v| v != "0") {
            self.bless = true;
        }
        self
    }

    pub fn default_size(&self) -> Size {
        Size::new(self.default_width as f32, self.default_height as f32)
    }
}

/// Visual test harness
pub struct TestHarness {
    /// GPU backend, `None` when running on the software rasterizer
    gpu: RefCell<Option<HeadlessRenderer>>,
    config: TestHarnessConfig,
}

impl TestHarness {
    /// Create a new test harness with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(TestHarnessConfig::default().with_env_overrides())
    }

    /// Create a new test harness with custom configuration
    pub fn with_config(config: TestHarnessConfig) -> Result<Self> {
        if config.default_width == 0 || config.default_height == 0 {
            bail!(
                "default size must be non-zero, got {}x{}",
                config.default_width,
                config.default_height
            );
        }

        let gpu = if config.use_gpu {
            let renderer_config = RendererConfig {
                texture_format: wgpu::TextureFormat::Rgba8Unorm,
                ..RendererConfig::default()
            };
            match pollster::block_on(HeadlessRenderer::new(
                config.default_width,
                config.default_height,
                renderer_config,
            )) {
                Ok(renderer) => Some(renderer),
                Err(e) => {
                    tracing::warn!("GPU unavailable ({}), using software renderer", e);
                    None
                }
            }
        } else {
            None
        };

        // Create output directories
        std::fs::create_dir_all(&config.output_dir).context("Failed to create output directory")?;
        std::fs::create_dir_all(&config.reference_dir)
            .context("Failed to create reference directory")?;

        Ok(Self {
            gpu: RefCell::new(gpu),
            config,
        })
    }

    pub fn config(&self) -> &TestHarnessConfig {
        &self.config
    }

    /// Whether frames are rendered on the GPU
    pub fn uses_gpu(&self) -> bool {
        self.gpu.borrow().is_some()
    }

    /// Whether the active backend can draw text
    pub fn supports_text(&self) -> bool {
        self.gpu.borrow().as_ref().is_some_and(|gpu| gpu.supports_text())
    }

    /// Create a test context with default size
    pub fn create_context(&self, name: &str) -> TestContext {
        let size = self.config.default_size();
        self.create_context_with_size(name, size, size)
    }

    /// Create a test context with explicit logical and physical sizes
    pub fn create_context_with_size(&self, name: &str, logical: Size, physical: Size) -> TestContext {
        TestContext::new(name, logical, physical, self.supports_text())
    }

    /// Replay recorded commands into the active backend and read the pixels
    ///
    /// The target is cleared to white first, so frames without a background
    /// compare the same on every backend.
    pub fn render_commands(&self, commands: &[RenderCommand], width: u32, height: u32) -> Result<Vec<u8>> {
        if width == 0 || height == 0 {
            bail!("cannot render a {}x{} frame", width, height);
        }

        let mut gpu = self.gpu.borrow_mut();
        match gpu.as_mut() {
            Some(gpu) => {
                gpu.resize(width, height).context("Failed to resize GPU target")?;
                // A previous case may have left a custom projection installed
                gpu.set_view_projection(None);
                gpu.clear(Color::WHITE);
                replay_commands(commands, gpu).context("Failed to replay frame on GPU")?;
                gpu.read_pixels().context("Failed to read back GPU frame")
            }
            None => {
                let mut software = SoftwareRenderer::new(width, height);
                software.clear(Color::WHITE);
                replay_commands(commands, &mut software)
                    .context("Failed to replay frame in software")?;
                Ok(software.into_pixels())
            }
        }
    }

    /// Run a test at the default size
    pub fn run_test<F>(&self, name: &str, test_fn: F) -> Result<TestResult>
    where
        F: FnOnce(&mut TestContext),
    {
        let size = self.config.default_size();
        self.run_test_with_size(name, size, size, test_fn)
    }

    /// Run a test with explicit logical and physical sizes
    pub fn run_test_with_size<F>(
        &self,
        name: &str,
        logical: Size,
        physical: Size,
        test_fn: F,
    ) -> Result<TestResult>
    where
        F: FnOnce(&mut TestContext),
    {
        let mut ctx = self.create_context_with_size(name, logical, physical);
        test_fn(&mut ctx);

        let (stats, commands) = ctx.finish()?;
        // The test may have resized the target
        let physical = ctx.physical_size();
        let (width, height) = (physical.width.round() as u32, physical.height.round() as u32);

        tracing::info!(
            "Test '{}': {} primitives ({} rects, {} reconstructed, {} lines, {} markers, {} triangles, {} texts, {} images)",
            name,
            stats.total(),
            stats.rects,
            stats.reconstructed,
            stats.lines,
            stats.circles,
            stats.triangles,
            stats.texts,
            stats.images
        );

        let pixels = self.render_commands(&commands, width, height)?;
        let output_path = self.output_path(name);
        save_png(&output_path, &pixels, width, height)?;
        tracing::debug!("Rendered test '{}' to {:?}", name, output_path);

        self.check_reference(name, &output_path, &pixels, width, height)
    }

    /// Compare rendered pixels with the stored reference, creating it when
    /// missing or when blessing
    fn check_reference(
        &self,
        name: &str,
        output_path: &Path,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<TestResult> {
        let reference_path = self.reference_path(name);

        if self.config.bless || !reference_path.exists() {
            std::fs::copy(output_path, &reference_path)
                .context("Failed to create reference image")?;
            tracing::info!(
                "Test '{}' created new reference at {:?}",
                name,
                reference_path
            );
            return Ok(TestResult::PassedWithNewReference);
        }

        let reference = image::open(&reference_path)
            .context("Failed to open reference image")?
            .to_rgba8();
        let diff_path = self.diff_path(name);

        if reference.dimensions() != (width, height) {
            tracing::warn!(
                "Test '{}' FAILED: size {}x{} differs from reference {:?}",
                name,
                width,
                height,
                reference.dimensions()
            );
            return Ok(TestResult::Failed {
                rmse: f64::INFINITY,
                diff_pct: 100.0,
                diff_path,
            });
        }

        let result = compare_images(pixels, reference.as_raw(), width, height)?;
        if result.within(self.config.max_rmse, self.config.max_diff_pct) {
            tracing::info!(
                "Test '{}' PASSED (rmse: {:.3}, diff: {:.3}%)",
                name,
                result.rmse,
                result.diff_pct
            );
            return Ok(TestResult::Passed);
        }

        save_png(&diff_path, &diff_pixels(pixels, reference.as_raw()), width, height)?;
        tracing::warn!(
            "Test '{}' FAILED (rmse: {:.3} > {:.3} or diff: {:.3}% > {:.3}%, max channel diff {})",
            name,
            result.rmse,
            self.config.max_rmse,
            result.diff_pct,
            self.config.max_diff_pct,
            result.max_diff
        );
        Ok(TestResult::Failed {
            rmse: result.rmse,
            diff_pct: result.diff_pct,
            diff_path,
        })
    }

    /// Get the reference image path for a test
    pub fn reference_path(&self, name: &str) -> PathBuf {
        self.config.reference_dir.join(format!("{}.png", name))
    }

    /// Get the output image path for a test
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}.png", name))
    }

    /// Get the diff image path for a test
    pub fn diff_path(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(format!("{}_diff.png", name))
    }
}

fn save_png(path: &Path, pixels: &[u8], width: u32, height: u32) -> Result<()> {
    image::save_buffer(path, pixels, width, height, image::ColorType::Rgba8)
        .with_context(|| format!("Failed to save PNG {}", path.display()))
}
