//! Integration Test: Sleep Prohibition
//!
//! **Policy**: production code MUST NOT sleep. Periodic work uses
//! `tokio::time::interval`; waiting uses channels, `watch` or cancellation
//! tokens.
//! **Exceptions**: test code (paused-clock tests advance time by sleeping).

use architectural_enforcement::{production_sources, report, SourceFile};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let mut violations = Vec::new();
    for file in production_sources() {
        check_file(&file, &mut violations);
    }

    report(
        "CRITICAL: Sleep calls found in production code!",
        &violations,
        &[
            "✅ ACCEPTABLE:",
            "  - tokio::time::interval() for periodic ticks",
            "  - Test code (#[cfg(test)] modules)",
            "❌ FORBIDDEN:",
            "  - std::thread::sleep anywhere",
            "  - tokio::time::sleep in polling loops or as synchronization",
        ],
    );
}

fn check_file(file: &SourceFile, violations: &mut Vec<String>) {
    for (line_number, code) in file.production_code() {
        if code.contains("thread::sleep") {
            violations.push(file.violation(line_number, "Blocking thread sleep"));
        } else if code.contains("time::sleep") || code.contains("sleep(") {
            violations.push(file.violation(line_number, "Async sleep"));
        }
    }
}

#[test]
fn test_detector_ignores_test_module() {
    let file = SourceFile {
        path: "ticker.rs".into(),
        lines: vec![
            "fn run() {".to_string(),
            "    std::thread::sleep(d);".to_string(),
            "}".to_string(),
            "#[cfg(test)]".to_string(),
            "mod tests {".to_string(),
            "    async fn t() { tokio::time::sleep(d).await; }".to_string(),
            "}".to_string(),
        ],
    };
    let mut violations = Vec::new();
    check_file(&file, &mut violations);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("ticker.rs:2"));
}
