//! Integration Test: No Panicking Unwraps
//!
//! **Policy**: production code propagates errors with `?` or handles them.
//! `unwrap()` and `expect()` are only allowed in test code.

use architectural_enforcement::{production_sources, report, SourceFile};

/// Test that production code never calls unwrap() or expect()
#[test]
fn test_no_unwrap_in_production_code() {
    let mut violations = Vec::new();
    for file in production_sources() {
        check_file(&file, &mut violations);
    }

    report(
        "CRITICAL: unwrap()/expect() found in production code!",
        &violations,
        &[
            "✅ USE instead:",
            "  - `?` with a thiserror/anyhow error",
            "  - unwrap_or / unwrap_or_default / unwrap_or_else",
            "  - explicit match with logging",
        ],
    );
}

fn check_file(file: &SourceFile, violations: &mut Vec<String>) {
    for (line_number, code) in file.production_code() {
        if code.contains(".unwrap()") {
            violations.push(file.violation(line_number, "unwrap()"));
        }
        if code.contains(".expect(") {
            violations.push(file.violation(line_number, "expect()"));
        }
    }
}

#[test]
fn test_detector_allows_unwrap_or_variants() {
    let file = SourceFile {
        path: "lib.rs".into(),
        lines: vec![
            "let a = x.unwrap_or(1);".to_string(),
            "let b = y.unwrap_or_default();".to_string(),
            "let c = z.unwrap();".to_string(),
        ],
    };
    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("lib.rs:3"));
}
