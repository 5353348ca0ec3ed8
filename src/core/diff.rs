//! Changed-method detection from unified diffs.
//!
//! Heuristic: inside each `diff --git` block for a changed file, a line that
//! looks like a Java method declaration becomes the current method (and is
//! recorded when the line is added). Added body lines belong to the current
//! method or, when the hunk starts inside a body, to the nearest declaration
//! found by scanning the new file upward. Files with no detected method are
//! left out, so they fall back to whole-file seeds.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use tracing::{debug, trace};

use crate::core::context::ChangedMethods;
use crate::infra::io::read_source;
use crate::infra::utils::NameUtils;

/// How far above a changed line to look for its method declaration.
pub const BACKFILL_LINES: usize = 200;

const METHOD_DECL: &str = r"\b(public|protected|private|static|final|synchronized|abstract|default)\b[^()]*?\b([A-Za-z_][A-Za-z0-9_]*)\s*\(";

/// Scans diffs for changed Java methods.
pub struct DiffMethodScanner {
    decl: Regex,
    root: PathBuf,
    /// New-file lines, loaded on first backfill per path.
    cache: HashMap<String, Vec<String>>,
}

/// Per-file-block state while walking the diff.
#[derive(Default)]
struct BlockState {
    file: Option<String>,
    method: Option<String>,
    /// 1-based new-file line number of the next `+`/` ` line.
    next_line: Option<usize>,
}

impl DiffMethodScanner {
    pub fn new(root: &Path) -> Result<Self> {
        Ok(Self {
            decl: Regex::new(METHOD_DECL)?,
            root: root.to_path_buf(),
            cache: HashMap::new(),
        })
    }

    /// Method name declared on `line`, if it looks like a declaration.
    pub fn declared_name<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.decl
            .captures(line)
            .and_then(|c| c.get(2))
            .map(|m| m.as_str())
    }

    /// Map each changed file to the method names its hunks touch.
    pub fn scan(&mut self, diff: &str, files: &[String]) -> ChangedMethods {
        let wanted: HashSet<String> = files
            .iter()
            .map(|f| NameUtils::normalize_rel_path(f))
            .collect();

        let mut out = ChangedMethods::new();
        let mut state = BlockState::default();

        for line in diff.lines() {
            if line.starts_with("diff --git") {
                state = BlockState {
                    file: block_path(line).filter(|p| wanted.contains(p)),
                    ..BlockState::default()
                };
                continue;
            }

            let Some(file) = state.file.clone() else {
                continue;
            };

            if line.starts_with("@@") {
                // Methods never carry across hunks
                state.method = None;
                state.next_line = hunk_new_start(line);
                continue;
            }

            if line.starts_with("+++") || line.starts_with("---") {
                continue;
            }

            let Some(prefix) = line.chars().next() else {
                continue;
            };
            if !matches!(prefix, '+' | '-' | ' ') {
                continue;
            }

            // Removed lines do not exist in the new file
            let lineno = if prefix == '-' {
                None
            } else {
                let current = state.next_line;
                state.next_line = current.map(|n| n + 1);
                current
            };

            let code = line[1..].trim();

            if let Some(name) = self.declared_name(code) {
                state.method = Some(name.to_string());
                if prefix == '+' {
                    add_method(&mut out, &file, name);
                }
                continue;
            }

            if prefix == '+' {
                let target = state
                    .method
                    .clone()
                    .or_else(|| lineno.and_then(|n| self.backfill(&file, n)));

                match target {
                    Some(name) => add_method(&mut out, &file, &name),
                    None => trace!(path = %file, ?lineno, "added line outside any method"),
                }
            }
        }

        debug!(
            files = out.len(),
            methods = out.values().map(Vec::len).sum::<usize>(),
            "changed methods from diff"
        );

        out
    }

    /// Nearest declaration at or above `lineno` in the new file.
    fn backfill(&mut self, path: &str, lineno: usize) -> Option<String> {
        if !self.cache.contains_key(path) {
            let lines = read_source(self.root.join(path))
                .map(|s| s.text.lines().map(str::to_string).collect())
                .unwrap_or_default();
            self.cache.insert(path.to_string(), lines);
        }

        let lines = self.cache.get(path)?;
        if lines.is_empty() || lineno == 0 {
            return None;
        }

        let last = lineno.min(lines.len()) - 1;
        let first = last.saturating_sub(BACKFILL_LINES - 1);

        (first..=last)
            .rev()
            .find_map(|i| self.declared_name(&lines[i]))
            .map(str::to_string)
    }
}

/// Convenience wrapper: scan `diff` for the changed `files` under `root`.
pub fn changed_methods_from_diff(root: &Path, diff: &str, files: &[String]) -> Result<ChangedMethods> {
    Ok(DiffMethodScanner::new(root)?.scan(diff, files))
}

fn add_method(out: &mut ChangedMethods, path: &str, name: &str) {
    let names = out.entry(path.to_string()).or_default();
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

/// `diff --git a/x b/src/Foo.java` -> `src/Foo.java`
fn block_path(line: &str) -> Option<String> {
    let b = line.split_whitespace().nth(3)?;
    let b = b.strip_prefix("b/").unwrap_or(b);
    Some(NameUtils::normalize_rel_path(b))
}

/// `@@ -10,5 +20,8 @@ ...` -> `20`
fn hunk_new_start(line: &str) -> Option<usize> {
    let plus = line.split_once('+')?.1;
    let range = plus.split("@@").next()?.trim();
    range.split(',').next()?.trim().parse().ok()
}
