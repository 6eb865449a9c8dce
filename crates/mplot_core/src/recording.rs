//! Recording backend
//!
//! Captures every renderer call as a [`RenderCommand`] so a frame can be
//! inspected in tests or replayed into another backend later.

use crate::color::Color;
use crate::error::Result;
use crate::math::Mat4;
use crate::primitives::{Circle, ImageCommand, Line, Rect, TextCommand, Triangle};
use crate::renderer::PlotRenderer;
use crate::transform::Size;

/// One recorded renderer call
#[derive(Clone, Debug, PartialEq)]
pub enum RenderCommand {
    Clear(Color),
    Rects(Vec<Rect>, Size),
    Lines(Vec<Line>, Size),
    Circles(Vec<Circle>, Size),
    Triangles(Vec<Triangle>, Size),
    Text(TextCommand),
    Image(ImageCommand),
    Resize { width: u32, height: u32 },
    SetViewProjection(Option<Mat4>),
    FinishFrame,
}

/// A renderer that records commands for later inspection or replay
#[derive(Debug)]
pub struct RecordingRenderer {
    commands: Vec<RenderCommand>,
    text_enabled: bool,
}

impl Default for RecordingRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRenderer {
    /// Create a recorder that reports text support
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            text_enabled: true,
        }
    }

    /// Create a recorder that reports no text support
    pub fn without_text() -> Self {
        Self {
            commands: Vec::new(),
            text_enabled: false,
        }
    }

    /// Get the recorded commands
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Take the recorded commands
    pub fn take_commands(&mut self) -> Vec<RenderCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of frames submitted so far
    pub fn frame_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RenderCommand::FinishFrame))
            .count()
    }

    /// Replay the recorded commands into another renderer
    pub fn replay(&self, target: &mut dyn PlotRenderer) -> Result<()> {
        replay_commands(&self.commands, target)
    }
}

/// Feed a command list into `target`, stopping at the first failed submission
pub fn replay_commands(commands: &[RenderCommand], target: &mut dyn PlotRenderer) -> Result<()> {
    for command in commands {
        match command {
            RenderCommand::Clear(color) => target.clear(*color),
            RenderCommand::Rects(rects, size) => target.draw_rects(rects, *size),
            RenderCommand::Lines(lines, size) => target.draw_lines(lines, *size),
            RenderCommand::Circles(circles, size) => target.draw_circles(circles, *size),
            RenderCommand::Triangles(tris, size) => target.draw_triangles(tris, *size),
            RenderCommand::Text(text) => target.draw_text(text),
            RenderCommand::Image(image) => target.draw_image(image),
            RenderCommand::Resize { width, height } => target.resize(*width, *height)?,
            RenderCommand::SetViewProjection(m) => target.set_view_projection(*m),
            RenderCommand::FinishFrame => target.finish_frame()?,
        }
    }
    Ok(())
}

impl PlotRenderer for RecordingRenderer {
    fn draw_rects(&mut self, rects: &[Rect], target: Size) {
        self.commands.push(RenderCommand::Rects(rects.to_vec(), target));
    }

    fn draw_lines(&mut self, lines: &[Line], target: Size) {
        self.commands.push(RenderCommand::Lines(lines.to_vec(), target));
    }

    fn draw_circles(&mut self, circles: &[Circle], target: Size) {
        self.commands
            .push(RenderCommand::Circles(circles.to_vec(), target));
    }

    fn draw_triangles(&mut self, triangles: &[Triangle], target: Size) {
        self.commands
            .push(RenderCommand::Triangles(triangles.to_vec(), target));
    }

    fn draw_text(&mut self, text: &TextCommand) {
        if self.text_enabled {
            self.commands.push(RenderCommand::Text(text.clone()));
        }
    }

    fn measure_text(&mut self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * 0.5
    }

    fn draw_image(&mut self, image: &ImageCommand) {
        self.commands.push(RenderCommand::Image(image.clone()));
    }

    fn clear(&mut self, color: Color) {
        self.commands.push(RenderCommand::Clear(color));
    }

    fn supports_text(&self) -> bool {
        self.text_enabled
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.commands.push(RenderCommand::Resize { width, height });
        Ok(())
    }

    fn set_view_projection(&mut self, view_proj: Option<Mat4>) {
        self.commands.push(RenderCommand::SetViewProjection(view_proj));
    }

    fn finish_frame(&mut self) -> Result<()> {
        self.commands.push(RenderCommand::FinishFrame);
        Ok(())
    }
}
