//! Architectural Enforcement Integration Tests
//!
//! Shared source-scanning helpers for the tests in `tests/`, which enforce:
//! - No blocking I/O inside async functions
//! - No sleep() calls in production code (timers use `tokio::time::interval`)
//! - No `unwrap()`/`expect()` in production code
//!
//! The scanners are line-based heuristics, not a parser. They are meant to
//! catch violations early, not to prove their absence.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source trees, relative to the workspace root
pub const PRODUCTION_DIRS: [&str; 2] = ["fleet/core/src", "fleet/cli/src"];

/// Workspace root (two levels above this crate)
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// One scanned Rust file
pub struct SourceFile {
    /// Path as displayed in violations
    pub path: PathBuf,
    /// All lines of the file
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Read a file, `None` if unreadable
    #[must_use]
    pub fn read(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        Some(Self {
            path: path.to_path_buf(),
            lines: content.lines().map(str::to_string).collect(),
        })
    }

    /// Number of leading lines that are production code
    ///
    /// Everything from the first top-level `#[cfg(test)]` on is test code.
    #[must_use]
    pub fn production_len(&self) -> usize {
        self.lines
            .iter()
            .position(|l| l.trim_end() == "#[cfg(test)]")
            .unwrap_or(self.lines.len())
    }

    /// Production lines as `(1-based line number, code without comment)`
    pub fn production_code(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines[..self.production_len()]
            .iter()
            .enumerate()
            .map(|(idx, line)| (idx + 1, strip_comment(line)))
    }

    /// Borrowed view of the lines for the function-scope heuristics
    #[must_use]
    pub fn line_refs(&self) -> Vec<&str> {
        self.lines.iter().map(String::as_str).collect()
    }

    /// Format a violation at `line_number`
    #[must_use]
    pub fn violation(&self, line_number: usize, what: &str) -> String {
        let line = self
            .lines
            .get(line_number - 1)
            .map_or("", |l| l.trim());
        format!("{}:{} - {}: {}", self.path.display(), line_number, what, line)
    }
}

/// Every `.rs` file under the production trees
#[must_use]
pub fn production_sources() -> Vec<SourceFile> {
    let root = workspace_root();
    let mut files = Vec::new();

    for dir in PRODUCTION_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            continue;
        }

        for entry in walkdir::WalkDir::new(&path)
            .into_iter()
            .filter_map(Result::ok)
        {
            if entry.path().extension().and_then(|s| s.to_str()) == Some("rs") {
                if let Some(file) = SourceFile::read(entry.path()) {
                    files.push(file);
                }
            }
        }
    }

    files
}

/// Code part of a line (drops `//` comments, including doc comments)
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn is_fn_signature(line: &str) -> bool {
    let line = line.trim_start();
    let line = line
        .strip_prefix("pub(crate) ")
        .or_else(|| line.strip_prefix("pub(super) "))
        .or_else(|| line.strip_prefix("pub "))
        .unwrap_or(line);
    line.starts_with("fn ") || line.starts_with("async fn ")
}

fn is_scope_boundary(line: &str) -> bool {
    let line = line.trim();
    line.starts_with("mod ") || (line.starts_with("impl") && line.contains('{'))
}

/// Whether the line at `current_idx` sits inside an `async fn`
#[must_use]
pub fn is_in_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i];

        if is_fn_signature(line) {
            return line.contains("async fn ");
        }

        if is_scope_boundary(line) {
            return false;
        }
    }
    false
}

/// Whether the line at `current_idx` sits inside a plain (non-async) `fn`
#[must_use]
pub fn is_in_non_async_function(lines: &[&str], current_idx: usize) -> bool {
    for i in (0..current_idx).rev() {
        let line = lines[i];

        if is_fn_signature(line) {
            return !line.contains("async fn ");
        }

        if is_scope_boundary(line) {
            return false;
        }
    }
    false
}

/// Print violations and panic if there are any
///
/// # Panics
///
/// Panics when `violations` is not empty.
pub fn report(title: &str, violations: &[String], guidance: &[&str]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {title}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!();
    for line in guidance {
        eprintln!("  {line}");
    }

    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_async_function_detection() {
        let code = vec![
            "pub async fn bad_function() {",
            "    let contents = std::fs::read_to_string(\"file.txt\")?;",
            "}",
        ];
        assert!(is_in_async_function(&code, 1));
        assert!(!is_in_non_async_function(&code, 1));
    }

    #[test]
    fn test_non_async_function_detection() {
        let code = vec![
            "pub(crate) fn load() -> Result<(), Error> {",
            "    let contents = std::fs::read_to_string(\"fleet.toml\")?;",
            "}",
        ];
        assert!(is_in_non_async_function(&code, 1));
        assert!(!is_in_async_function(&code, 1));
    }

    #[test]
    fn test_production_len_stops_at_test_module() {
        let file = SourceFile {
            path: PathBuf::from("x.rs"),
            lines: vec![
                "fn a() {}".to_string(),
                "#[cfg(test)]".to_string(),
                "mod tests {".to_string(),
            ],
        };
        assert_eq!(file.production_len(), 1);
    }

    #[test]
    fn test_strip_comment() {
        assert_eq!(strip_comment("let x = 1; // note"), "let x = 1; ");
        assert_eq!(strip_comment("/// docs"), "");
    }

    #[test]
    fn test_workspace_root_has_production_dirs() {
        let root = workspace_root();
        for dir in PRODUCTION_DIRS {
            assert!(root.join(dir).exists(), "missing {dir}");
        }
    }
}
