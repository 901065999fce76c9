//! Integration Test Harness
//!
//! Runs every integration test target and prints a summary.
//!
//! # Usage
//!
//! Run all tests:
//! ```text
//! cargo run -p integration-tests
//! ```
//!
//! Run a single category:
//! ```text
//! cargo test -p integration-tests --test event_sink_tests
//! cargo test -p integration-tests --test marshaling_tests
//! cargo test -p integration-tests --test concurrency_tests
//! ```
//!
//! Run with increased logging:
//! ```text
//! RUST_LOG=dcom_events=trace cargo run -p integration-tests
//! ```

use std::process::Command;
use std::time::{Duration, Instant};

/// Test category
#[derive(Debug, Clone)]
struct TestCategory {
    name: &'static str,
    description: &'static str,
    test_name: &'static str,
}

const TEST_CATEGORIES: &[TestCategory] = &[
    TestCategory {
        name: "Event Sink Tests",
        description: "Dispatch, QueryInterface and reference counting through the vtable",
        test_name: "event_sink_tests",
    },
    TestCategory {
        name: "Marshaling Tests",
        description: "VARIANT cells to typed handler parameters, out-parameters",
        test_name: "marshaling_tests",
    },
    TestCategory {
        name: "Concurrency Tests",
        description: "Concurrent delivery from multithreaded apartment threads",
        test_name: "concurrency_tests",
    },
];

fn print_test_categories() {
    println!("Test Categories:");
    println!("{}", "-".repeat(80));
    for (i, cat) in TEST_CATEGORIES.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, cat.name, cat.description);
    }
    println!("{}", "-".repeat(80));
    println!();
}

fn run_test_category(category: &TestCategory) -> (bool, Duration, String) {
    println!("\n{}", "=".repeat(80));
    println!("Running: {}", category.name);
    println!("{}", "=".repeat(80));

    let start = Instant::now();
    let status = Command::new("cargo")
        .args(["test", "-p", "integration-tests", "--test", category.test_name])
        .status();
    let duration = start.elapsed();

    match status {
        Ok(status) if status.success() => (true, duration, "PASSED".to_string()),
        Ok(status) => (
            false,
            duration,
            format!("FAILED (exit code: {:?})", status.code()),
        ),
        Err(e) => (false, duration, format!("Failed to execute: {}", e)),
    }
}

fn main() {
    print_test_categories();

    let total_start = Instant::now();
    let results: Vec<_> = TEST_CATEGORIES
        .iter()
        .map(|category| {
            let (success, duration, summary) = run_test_category(category);
            (category.name, success, duration, summary)
        })
        .collect();
    let total_duration = total_start.elapsed();

    println!("\n{}", "=".repeat(80));
    println!("SUMMARY");
    println!("{}", "=".repeat(80));

    let failed = results.iter().filter(|(_, s, _, _)| !*s).count();
    println!(
        "\nCategories: {} | Passed: {} | Failed: {}",
        results.len(),
        results.len() - failed,
        failed
    );
    println!("Total Duration: {:?}\n", total_duration);

    println!("{:<30} {:<10} {:<15} {}", "Category", "Status", "Duration", "Details");
    println!("{}", "-".repeat(80));
    for (name, success, duration, summary) in &results {
        let status = if *success { "PASS" } else { "FAIL" };
        println!("{:<30} {:<10} {:<15?} {}", name, status, duration, summary);
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
