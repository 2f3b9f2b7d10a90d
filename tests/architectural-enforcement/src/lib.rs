//! Architectural Enforcement Integration Tests
//!
//! Source scanners shared by the tests in `tests/`. They enforce:
//! - All deferred work in the core goes through the cancellable timers
//! - No thread sleeps or blocking clients in production code
//! - The core never writes to the terminal itself
//!
//! Only production code is scanned: everything from the first
//! `#[cfg(test)]` line of a file onwards is ignored, as are comments.

use std::fs;
use std::path::{Path, PathBuf};

/// Workspace root, resolved from this package's manifest
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File, relative to the workspace root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Offending line, trimmed
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.file.display(), self.line, self.text)
    }
}

/// Lines of production code in `content`, with their 1-based numbers
///
/// Stops at the first `#[cfg(test)]` and drops `//` comments.
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .filter_map(|(idx, line)| {
            let code = line.split("//").next().unwrap_or(line);
            if code.trim().is_empty() {
                None
            } else {
                Some((idx + 1, code))
            }
        })
        .collect()
}

/// Scan every `.rs` file under `dir` (relative to the workspace root)
///
/// Files whose name is in `exempt` are skipped.
pub fn scan(dir: &str, patterns: &[&str], exempt: &[&str]) -> Vec<Violation> {
    let root = workspace_root();
    let mut violations = Vec::new();

    for entry in walkdir::WalkDir::new(root.join(dir))
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or_default();
        if exempt.contains(&name) {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };

        for (line, code) in production_lines(&content) {
            if patterns.iter().any(|p| code.contains(p)) {
                violations.push(Violation {
                    file: path.strip_prefix(&root).unwrap_or(path).to_path_buf(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }

    violations
}

/// Panic with a readable report when `violations` is not empty
pub fn report(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} violation(s): {rule}", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "use tokio::time;\n// time::sleep in a comment\nfn a() {}\n#[cfg(test)]\nmod tests { time::sleep(); }\n";
        let lines = production_lines(source);
        assert_eq!(lines, vec![(1, "use tokio::time;"), (3, "fn a() {}")]);
    }

    #[test]
    fn test_trailing_comment_is_dropped() {
        let lines = production_lines("let x = 1; // time::sleep later\n");
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].1.contains("sleep"));
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}
