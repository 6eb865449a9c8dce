//! Visual test cases organized by category

pub mod markers;

use crate::runner::TestSuite;

/// Create all test suites
pub fn all_suites() -> Vec<TestSuite> {
    vec![
        shapes::suite(),
        lines::suite(),
        markers::suite(),
        reconstruction::suite(),
        triangles::suite(),
        images::suite(),
        text::suite(),
        aspect::suite(),
    ]
}

/// Evenly spaced samples of `f` over `[start, end]`
pub(crate) fn sample(start: f64, end: f64, count: usize, f: impl Fn(f64) -> f64) -> (Vec<f64>, Vec<f64>) {
    let step = (end - start) / (count.max(2) - 1) as f64;
    (0..count)
        .map(|i| {
            let x = start + step * i as f64;
            (x, f(x))
        })
        .unzip()
}

#[cfg(test)]
pub(crate) mod support {
    use mplot_core::{FrameStats, RenderCommand, Size};

    use crate::harness::{TestContext, TestHarness};
    use crate::runner::TestSuite;

    /// Record one case without rendering it
    pub fn record(mut suite: TestSuite, name: &str, text: bool) -> (FrameStats, Vec<RenderCommand>) {
        let index = suite
            .cases
            .iter()
            .position(|c| c.name == name)
            .unwrap_or_else(|| panic!("no case named {name}"));
        let case = suite.cases.swap_remove(index);
        let (logical, physical) = case
            .sizes
            .unwrap_or((Size::new(800.0, 600.0), Size::new(800.0, 600.0)));
        let mut ctx = TestContext::new(name, logical, physical, text);
        (case.test_fn)(&mut ctx);
        ctx.finish().unwrap()
    }

    /// Render every case of `suite` on the GPU and require a pass
    pub fn run_on_gpu(mut suite: TestSuite) {
        let harness = TestHarness::new().unwrap();
        assert!(harness.uses_gpu(), "no GPU adapter");
        for case in suite.cases.drain(..) {
            let name = case.full_name();
            let result = crate::runner::run_case(&harness, case).unwrap();
            assert!(
                result.is_passed() || result.is_skipped(),
                "Test {} failed: {:?}",
                name,
                result
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suite_names_are_unique() {
        let suites = all_suites();
        let mut names: Vec<String> = suites
            .iter()
            .flat_map(|s| s.cases.iter().map(|c| c.full_name()))
            .collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(suites.len(), 8);
    }

    #[test]
    fn test_sample_endpoints() {
        let (xs, ys) = sample(0.0, 10.0, 11, |x| x * 2.0);
        assert_eq!(xs.len(), 11);
        assert_eq!(xs[10], 10.0);
        assert_eq!(ys[5], 10.0);
    }
}
