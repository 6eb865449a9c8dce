//! Pixel comparison for visual regression
//!
//! Both buffers are tightly packed RGBA8. A pixel counts as different when
//! any of its channels is off by more than [`SOFT_THRESHOLD`].

use anyhow::{bail, Result};

/// Per-channel difference tolerated before a pixel counts as changed
pub const SOFT_THRESHOLD: u8 = 5;

/// Statistics from comparing two images
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CompareResult {
    /// Root mean square error over every channel, 0-255 scale
    pub rmse: f64,
    /// Largest single-channel difference
    pub max_diff: u8,
    /// Percentage of pixels over the soft threshold
    pub diff_pct: f64,
    pub diff_count: usize,
}

impl CompareResult {
    /// Whether both metrics are inside the given limits
    pub fn within(&self, max_rmse: f64, max_diff_pct: f64) -> bool {
        self.rmse <= max_rmse && self.diff_pct <= max_diff_pct
    }
}

/// Compare `actual` against `expected`, both `width * height` RGBA8 pixels
pub fn compare_images(actual: &[u8], expected: &[u8], width: u32, height: u32) -> Result<CompareResult> {
    let pixel_count = width as usize * height as usize;
    let expected_len = pixel_count * 4;
    if actual.len() != expected_len || expected.len() != expected_len {
        bail!(
            "image size mismatch: expected {} bytes for {}x{}, got {} and {}",
            expected_len,
            width,
            height,
            actual.len(),
            expected.len()
        );
    }
    if pixel_count == 0 {
        return Ok(CompareResult::default());
    }

    let mut sum_sq = 0.0f64;
    let mut max_diff = 0u8;
    let mut diff_count = 0usize;

    for (a, e) in actual.chunks_exact(4).zip(expected.chunks_exact(4)) {
        let mut exceeds = false;
        for (&ca, &ce) in a.iter().zip(e) {
            let d = ca.abs_diff(ce);
            sum_sq += f64::from(d) * f64::from(d);
            max_diff = max_diff.max(d);
            exceeds |= d > SOFT_THRESHOLD;
        }
        if exceeds {
            diff_count += 1;
        }
    }

    Ok(CompareResult {
        rmse: (sum_sq / expected_len as f64).sqrt(),
        max_diff,
        diff_pct: diff_count as f64 / pixel_count as f64 * 100.0,
        diff_count,
    })
}

/// Heat map of the differences: dark green where pixels match, red scaled
/// by ten times the largest color-channel difference otherwise
///
/// Only the overlapping pixels of the two buffers are visited.
pub fn diff_pixels(actual: &[u8], expected: &[u8]) -> Vec<u8> {
    actual
        .chunks_exact(4)
        .zip(expected.chunks_exact(4))
        .flat_map(|(a, e)| {
            let d = a[..3]
                .iter()
                .zip(&e[..3])
                .map(|(&ca, &ce)| ca.abs_diff(ce))
                .max()
                .unwrap_or(0);
            if d <= SOFT_THRESHOLD {
                [0, 128, 0, 255]
            } else {
                [(u32::from(d) * 10).min(255) as u8, 0, 0, 255]
            }
        })
        .collect()
}
