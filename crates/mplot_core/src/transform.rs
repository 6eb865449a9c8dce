//! Coordinate Transformer
//!
//! Maps logical plot coordinates (origin bottom-left) into device pixels
//! (origin top-left). The logical canvas is scaled uniformly by
//! `min(pw / lw, ph / lh)` and centered inside the physical target, so a
//! mismatched aspect ratio letterboxes instead of distorting.
//!
//! Zero logical sizes produce non-finite output; callers guard against them.

/// Width/height pair
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Logical canvas placed inside a physical render target
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub logical: Size,
    pub physical: Size,
}

impl Viewport {
    pub fn new(logical: Size, physical: Size) -> Self {
        Self { logical, physical }
    }

    /// Uniform logical → physical scale factor
    pub fn scale(&self) -> f32 {
        (self.physical.width / self.logical.width).min(self.physical.height / self.logical.height)
    }

    /// Centering offsets `(off_x, off_y)` in physical pixels
    pub fn offset(&self) -> (f32, f32) {
        let scale = self.scale();
        (
            (self.physical.width - self.logical.width * scale) / 2.0,
            (self.physical.height - self.logical.height * scale) / 2.0,
        )
    }

    /// Map a logical point to device pixels (Y flipped)
    pub fn to_physical(&self, x: f64, y: f64) -> (f32, f32) {
        let scale = self.scale();
        let (off_x, off_y) = self.offset();
        (
            off_x + x as f32 * scale,
            self.physical.height - off_y - y as f32 * scale,
        )
    }

    /// Scale a logical length into pixels
    pub fn scale_length(&self, len: f64) -> f32 {
        len as f32 * self.scale()
    }

    /// Device-space `(x, y, width, height)` of the logical box spanned by
    /// the two x and two y coordinates, in any order
    pub fn physical_rect(&self, x1: f64, x2: f64, y1: f64, y2: f64) -> (f32, f32, f32, f32) {
        let (left, top) = self.to_physical(x1.min(x2), y1.max(y2));
        let (right, bottom) = self.to_physical(x1.max(x2), y1.min(y2));
        (left, top, right - left, bottom - top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_target_centers_horizontally() {
        let vp = Viewport::new(Size::new(800.0, 600.0), Size::new(1600.0, 600.0));
        assert_eq!(vp.scale(), 1.0);
        assert_eq!(vp.offset(), (400.0, 0.0));
        assert_eq!(vp.to_physical(0.0, 0.0), (400.0, 600.0));
        assert_eq!(vp.to_physical(800.0, 600.0), (1200.0, 0.0));
    }

    #[test]
    fn test_tall_target_centers_vertically() {
        let vp = Viewport::new(Size::new(100.0, 100.0), Size::new(200.0, 400.0));
        assert_eq!(vp.scale(), 2.0);
        assert_eq!(vp.offset(), (0.0, 100.0));
        assert_eq!(vp.to_physical(0.0, 0.0), (0.0, 300.0));
        assert_eq!(vp.to_physical(100.0, 100.0), (200.0, 100.0));
    }

    #[test]
    fn test_identity_viewport() {
        let vp = Viewport::new(Size::new(640.0, 480.0), Size::new(640.0, 480.0));
        assert_eq!(vp.to_physical(10.0, 20.0), (10.0, 460.0));
        assert_eq!(vp.scale_length(3.0), 3.0);
    }

    #[test]
    fn test_physical_rect_orders_corners() {
        let vp = Viewport::new(Size::new(100.0, 100.0), Size::new(100.0, 100.0));
        assert_eq!(vp.physical_rect(60.0, 10.0, 80.0, 20.0), (10.0, 20.0, 50.0, 60.0));
    }

    #[test]
    fn test_zero_logical_size_is_not_finite() {
        let vp = Viewport::new(Size::new(0.0, 0.0), Size::new(100.0, 100.0));
        assert!(!vp.scale().is_finite());
        assert!(Size::new(0.0, 10.0).is_empty());
    }
}
