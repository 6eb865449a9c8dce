//! Test runner for executing test suites
//!
//! Manages test execution, result collection, and reporting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::Result;
use mplot_core::Size;

use crate::harness::{TestContext, TestHarness, TestResult};

/// Type of test case
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestType {
    /// Geometry only
    Standard,
    /// Needs a font; skipped on backends without text
    Text,
}

type TestFn = Box<dyn FnOnce(&mut TestContext) + Send>;

/// A single test case
pub struct TestCase {
    /// Test name
    pub name: String,
    /// Test category
    pub category: String,
    /// Test function
    pub test_fn: TestFn,
    /// Type of test
    pub test_type: TestType,
    /// Logical and physical size, when different from the harness default
    pub sizes: Option<(Size, Size)>,
}

impl TestCase {
    pub fn new<F>(name: &str, category: &str, test_fn: F) -> Self
    where
        F: FnOnce(&mut TestContext) + Send + 'static,
    {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            test_fn: Box::new(test_fn),
            test_type: TestType::Standard,
            sizes: None,
        }
    }

    pub fn new_text<F>(name: &str, category: &str, test_fn: F) -> Self
    where
        F: FnOnce(&mut TestContext) + Send + 'static,
    {
        Self {
            test_type: TestType::Text,
            ..Self::new(name, category, test_fn)
        }
    }

    /// File-system friendly `category_name`
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.category, self.name)
    }
}

/// Result of running a test
pub struct TestRun {
    /// Test name
    pub name: String,
    /// Test category
    pub category: String,
    /// Test result
    pub result: TestResult,
    /// Time taken
    pub duration: Duration,
}

impl TestRun {
    pub fn is_passed(&self) -> bool {
        self.result.is_passed()
    }
}

/// Test suite containing multiple test cases
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Test cases
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cases: Vec::new(),
        }
    }

    pub fn add<F>(&mut self, name: &str, test_fn: F) -> &mut Self
    where
        F: FnOnce(&mut TestContext) + Send + 'static,
    {
        self.cases.push(TestCase::new(name, &self.name, test_fn));
        self
    }

    /// Add a test that draws text
    pub fn add_text<F>(&mut self, name: &str, test_fn: F) -> &mut Self
    where
        F: FnOnce(&mut TestContext) + Send + 'static,
    {
        self.cases.push(TestCase::new_text(name, &self.name, test_fn));
        self
    }

    /// Add a test whose logical canvas differs from its physical target
    pub fn add_sized<F>(&mut self, name: &str, logical: Size, physical: Size, test_fn: F) -> &mut Self
    where
        F: FnOnce(&mut TestContext) + Send + 'static,
    {
        let mut case = TestCase::new(name, &self.name, test_fn);
        case.sizes = Some((logical, physical));
        self.cases.push(case);
        self
    }
}

/// Run one case through `harness`, skipping text cases the backend can't draw
pub fn run_case(harness: &TestHarness, case: TestCase) -> Result<TestResult> {
    if case.test_type == TestType::Text && !harness.supports_text() {
        return Ok(TestResult::Skipped {
            reason: "no text support on this backend".into(),
        });
    }
    let full_name = case.full_name();
    match case.sizes {
        Some((logical, physical)) => {
            harness.run_test_with_size(&full_name, logical, physical, case.test_fn)
        }
        None => harness.run_test(&full_name, case.test_fn),
    }
}

/// Test runner for executing suites
pub struct TestRunner {
    /// Test harness
    harness: TestHarness,
    /// Test suites to run
    suites: Vec<TestSuite>,
    /// Filter pattern (None = run all)
    filter: Option<String>,
}

impl TestRunner {
    /// Create a new test runner
    pub fn new() -> Result<Self> {
        Ok(Self::with_harness(TestHarness::new()?))
    }

    /// Create with custom harness
    pub fn with_harness(harness: TestHarness) -> Self {
        Self {
            harness,
            suites: Vec::new(),
            filter: None,
        }
    }

    /// Add a test suite
    pub fn add_suite(&mut self, suite: TestSuite) -> &mut Self {
        self.suites.push(suite);
        self
    }

    /// Set a filter pattern
    pub fn filter(&mut self, pattern: &str) -> &mut Self {
        self.filter = Some(pattern.to_string());
        self
    }

    fn matches(&self, case: &TestCase) -> bool {
        self.filter
            .as_deref()
            .map_or(true, |p| case.name.contains(p) || case.category.contains(p))
    }

    /// Run all tests
    pub fn run(&mut self) -> RunResult {
        let start = Instant::now();
        let mut results = Vec::new();
        let suites = std::mem::take(&mut self.suites);

        for suite in suites {
            tracing::info!("Running suite: {}", suite.name);

            for case in suite.cases {
                if !self.matches(&case) {
                    continue;
                }

                let test_start = Instant::now();
                let full_name = case.full_name();
                let (name, category) = (case.name.clone(), case.category.clone());
                tracing::debug!("Running test: {}", full_name);

                let result = match run_case(&self.harness, case) {
                    Ok(result) => result,
                    Err(e) => {
                        tracing::error!("Test {} failed with error: {:#}", full_name, e);
                        TestResult::Failed {
                            rmse: f64::INFINITY,
                            diff_pct: 100.0,
                            diff_path: self.harness.diff_path(&full_name),
                        }
                    }
                };

                let duration = test_start.elapsed();
                match &result {
                    TestResult::Skipped { reason } => {
                        tracing::warn!("  - {} skipped: {}", name, reason)
                    }
                    r if r.is_passed() => tracing::info!("  ✓ {} ({:?})", name, duration),
                    _ => tracing::error!("  ✗ {} ({:?})", name, duration),
                }

                results.push(TestRun {
                    name,
                    category,
                    result,
                    duration,
                });
            }
        }

        RunResult::new(results, start.elapsed())
    }

    /// Get the harness
    pub fn harness(&self) -> &TestHarness {
        &self.harness
    }
}

/// Results from running tests
pub struct RunResult {
    /// Individual test results
    pub results: Vec<TestRun>,
    /// Total time taken
    pub duration: Duration,
}

impl RunResult {
    pub fn new(results: Vec<TestRun>, duration: Duration) -> Self {
        Self { results, duration }
    }

    /// Count of passed tests
    pub fn passed(&self) -> usize {
        self.results.iter().filter(|r| r.is_passed()).count()
    }

    /// Count of failed tests
    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.result.is_skipped()).count()
    }

    /// Total test count
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// No test failed (skips are fine)
    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    /// Get results by category
    pub fn by_category(&self) -> HashMap<String, Vec<&TestRun>> {
        let mut map: HashMap<String, Vec<&TestRun>> = HashMap::new();
        for result in &self.results {
            map.entry(result.category.clone()).or_default().push(result);
        }
        map
    }

    /// Print summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════╗");
        println!("║           TEST RESULTS SUMMARY           ║");
        println!("╠══════════════════════════════════════════╣");
        println!("║  Passed:  {:>5}                          ║", self.passed());
        println!("║  Failed:  {:>5}                          ║", self.failed());
        println!("║  Skipped: {:>5}                          ║", self.skipped());
        println!("║  Total:   {:>5}                          ║", self.total());
        println!("║  Time:    {:>8.2?}                      ║", self.duration);
        println!("╚══════════════════════════════════════════╝");

        if self.failed() > 0 {
            println!("\nFailed tests:");
            for run in self.results.iter().filter(|r| r.result.is_failed()) {
                match &run.result {
                    TestResult::Failed {
                        rmse,
                        diff_pct,
                        diff_path,
                    } => println!(
                        "  ✗ {}::{} (rmse {:.2}, {:.2}% changed, diff {})",
                        run.category,
                        run.name,
                        rmse,
                        diff_pct,
                        diff_path.display()
                    ),
                    _ => println!("  ✗ {}::{}", run.category, run.name),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::TestHarnessConfig;
    use mplot_core::Color;

    fn run(result: TestResult) -> TestRun {
        TestRun {
            name: "case".into(),
            category: "cat".into(),
            result,
            duration: Duration::ZERO,
        }
    }

    fn software_harness(dir: &str) -> TestHarness {
        let root = std::env::temp_dir().join("mplot_runner_tests").join(dir);
        let _ = std::fs::remove_dir_all(&root);
        TestHarness::with_config(TestHarnessConfig {
            output_dir: root.clone(),
            reference_dir: root.join("references"),
            default_width: 32,
            default_height: 32,
            use_gpu: false,
            ..TestHarnessConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_run_result_counts() {
        let result = RunResult::new(
            vec![
                run(TestResult::Passed),
                run(TestResult::PassedWithNewReference),
                run(TestResult::Skipped {
                    reason: "no font".into(),
                }),
                run(TestResult::Failed {
                    rmse: 9.0,
                    diff_pct: 10.0,
                    diff_path: "diff.png".into(),
                }),
            ],
            Duration::ZERO,
        );
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.skipped(), 1);
        assert_eq!(result.total(), 4);
        assert!(!result.all_passed());
        assert_eq!(result.by_category()["cat"].len(), 4);
    }

    #[test]
    fn test_skips_do_not_fail_the_run() {
        let result = RunResult::new(
            vec![run(TestResult::Skipped {
                reason: "no font".into(),
            })],
            Duration::ZERO,
        );
        assert!(result.all_passed());
    }

    #[test]
    fn test_suite_add_records_category() {
        let mut suite = TestSuite::new("shapes");
        suite.add("one", |_| {}).add_text("two", |_| {});
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.cases[0].category, "shapes");
        assert_eq!(suite.cases[0].full_name(), "shapes_one");
        assert_eq!(suite.cases[1].test_type, TestType::Text);
    }

    #[test]
    fn test_filter_and_text_skip() {
        let mut suite = TestSuite::new("demo");
        suite.add("keep_box", |ctx| {
            ctx.plot().draw_rectangle(4.0, 12.0, 4.0, 12.0, Color::RED);
        });
        suite.add("other", |_| {});
        suite.add_text("keep_label", |ctx| {
            ctx.plot().draw_text("hi", 4.0, 4.0, 10.0, 0.0, Color::BLACK);
        });

        let mut runner = TestRunner::with_harness(software_harness("filter"));
        runner.add_suite(suite).filter("keep");
        let result = runner.run();

        assert_eq!(result.total(), 2);
        assert_eq!(result.passed(), 1);
        assert_eq!(result.skipped(), 1);
        assert!(result.all_passed());
    }
}
