//! Visual Test Runner
//!
//! Command-line tool for running visual regression tests for mplot.
//!
//! Usage:
//!   mplot-visual-tests                      # Run all tests
//!   mplot-visual-tests --filter markers     # Run tests matching "markers"
//!   mplot-visual-tests --list               # List all tests
//!   mplot-visual-tests --config suite.toml  # Load harness settings
//!   mplot-visual-tests --bless              # Rewrite reference images

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use mplot_test_suite::{tests, TestHarness, TestHarnessConfig, TestRunner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mplot-visual-tests", version, about = "Visual regression tests for mplot")]
struct Args {
    /// List all tests and exit
    #[arg(long)]
    list: bool,

    /// Only run tests whose name or category contains this pattern
    #[arg(long)]
    filter: Option<String>,

    /// Harness configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Replace reference images with the current output
    #[arg(long)]
    bless: bool,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list {
        println!("Available test suites:");
        for suite in tests::all_suites() {
            println!("\n  {}:", suite.name);
            for case in &suite.cases {
                println!("    - {}", case.name);
            }
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => TestHarnessConfig::load(path)?,
        None => TestHarnessConfig::default(),
    }
    .with_env_overrides();
    config.bless |= args.bless;

    println!("╔══════════════════════════════════════════╗");
    println!("║      MPLOT VISUAL REGRESSION TESTS       ║");
    println!("╚══════════════════════════════════════════╝\n");

    let harness = TestHarness::with_config(config)?;
    println!(
        "Backend: {} (text {})\n",
        if harness.uses_gpu() { "GPU" } else { "software" },
        if harness.supports_text() { "on" } else { "off" }
    );

    let mut runner = TestRunner::with_harness(harness);
    for suite in tests::all_suites() {
        runner.add_suite(suite);
    }

    if let Some(ref pattern) = args.filter {
        println!("Running tests matching: {}\n", pattern);
        runner.filter(pattern);
    }

    let result = runner.run();
    result.print_summary();

    if result.all_passed() {
        println!("\nAll tests passed!");
        Ok(())
    } else {
        std::process::exit(1);
    }
}
