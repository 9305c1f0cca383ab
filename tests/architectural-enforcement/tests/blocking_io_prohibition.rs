//! Integration Test: Blocking I/O Prohibition
//!
//! **Policy**: async functions in the fleet crates MUST NOT block the runtime.
//! **Required**: `tokio::fs`, `tokio::io`, async `reqwest`; never `std::fs`,
//! `std::net`, `std::process::Command` or `reqwest::blocking` from async code.
//!
//! Blocking calls are acceptable in plain functions that run before the
//! runtime does real work (config loading) and in test code.

use architectural_enforcement::{is_in_async_function, production_sources, report, SourceFile};

/// Test that async production code does not use blocking I/O
#[test]
fn test_no_blocking_io_in_async_code() {
    let mut violations = Vec::new();
    for file in production_sources() {
        check_file(&file, &mut violations);
    }

    report(
        "CRITICAL: Blocking I/O calls found in async production code!",
        &violations,
        &[
            "❌ FORBIDDEN in async fns:",
            "  - std::fs::*, std::net::*, std::process::Command",
            "  - reqwest::blocking::*",
            "  - std::io::stdin() / std::io::stdout()",
            "✅ REQUIRED async I/O:",
            "  - tokio::fs::write().await, tokio::io::stdout()",
            "  - reqwest::Client (async)",
            "✅ ACCEPTABLE blocking I/O:",
            "  - Non-async functions (e.g. config loading before the runtime starts)",
            "  - Test code",
        ],
    );
}

fn check_file(file: &SourceFile, violations: &mut Vec<String>) {
    let lines = file.line_refs();

    for (line_number, code) in file.production_code() {
        let idx = line_number - 1;

        if code.contains("reqwest::blocking") {
            violations.push(file.violation(line_number, "Blocking HTTP client"));
            continue;
        }

        // Importing at module level drags the blocking API into every fn
        if code.trim_start().starts_with("use std::fs")
            || code.trim_start().starts_with("use std::net")
        {
            violations.push(file.violation(line_number, "Blocking I/O import"));
            continue;
        }

        if !is_in_async_function(&lines, idx) {
            continue;
        }

        if code.contains("std::fs::") {
            violations.push(file.violation(line_number, "Blocking file I/O"));
        }
        if code.contains("std::net::") {
            violations.push(file.violation(line_number, "Blocking network I/O"));
        }
        if code.contains("std::process::Command") {
            violations.push(file.violation(line_number, "Blocking process I/O"));
        }
        if code.contains("std::io::stdin()") || code.contains("std::io::stdout()") {
            violations.push(file.violation(line_number, "Blocking stdin/stdout in async"));
        }
    }
}

#[test]
fn test_detector_flags_fs_in_async_fn() {
    let file = SourceFile {
        path: "sample.rs".into(),
        lines: vec![
            "pub async fn export(path: &Path) -> Result<()> {".to_string(),
            "    std::fs::write(path, \"x\")?;".to_string(),
            "    Ok(())".to_string(),
            "}".to_string(),
        ],
    };
    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("sample.rs:2"));
}

#[test]
fn test_detector_allows_fs_in_sync_fn() {
    let file = SourceFile {
        path: "config.rs".into(),
        lines: vec![
            "pub fn load(path: &Path) -> Result<String, Error> {".to_string(),
            "    std::fs::read_to_string(path)".to_string(),
            "}".to_string(),
        ],
    };
    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    assert!(violations.is_empty());
}
