//! Gitignore-aware source walker.
//!
//! Walks a source root with ripgrep's `ignore` crate (so `.gitignore`,
//! `.git/info/exclude` and the global gitignore apply), skips dot entries,
//! drops anything matching the configured exclude globs, keeps only allowed
//! extensions and returns paths sorted for reproducible indexing.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Walker over one source root. Exclude globs prune whole directories
/// while walking and are checked again on each file.
pub struct FileWalker
{
    /// Exclude globs, matched against root-relative paths
    excludes: GlobSet,

    /// Lower-cased extensions to keep; empty keeps everything
    extensions: Vec<String>,
}

impl FileWalker
{
    /// Compile `exclude_globs` (e.g. `**/target/**`); invalid globs fail.
    pub fn new(exclude_globs: &[String]) -> Result<Self>
    {
        let mut set = GlobSetBuilder::new();

        for glob in exclude_globs
        {
            set.add(Glob::new(glob)?);
        }

        Ok(Self {
            excludes: set.build()?,
            extensions: Vec::new(),
        })
    }

    /// Keep only files with one of these extensions (no leading dot needed).
    pub fn with_extensions(
        mut self,
        extensions: &[String],
    ) -> Self
    {
        self.extensions = extensions
            .iter()
            .map(|e| {
                e.trim_start_matches('.')
                    .to_ascii_lowercase()
            })
            .collect();
        self
    }

    /// Whether `path` passes the extension allow-list
    pub fn matches_extension(
        &self,
        path: &Path,
    ) -> bool
    {
        if self
            .extensions
            .is_empty()
        {
            return true;
        }

        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|want| want.eq_ignore_ascii_case(ext))
            })
    }

    fn excluded(
        &self,
        root: &Path,
        path: &Path,
    ) -> bool
    {
        let rel = path
            .strip_prefix(root)
            .unwrap_or(path);

        self.excludes
            .is_match(rel)
    }

    fn walk_builder(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut walk = WalkBuilder::new(root);

        walk.hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(false);

        // Prune excluded directories before descending into them
        let excludes = self
            .excludes
            .clone();
        let root = root.to_path_buf();
        walk.filter_entry(move |entry: &DirEntry| {
            let is_dir = entry
                .file_type()
                .is_some_and(|ft| ft.is_dir());
            let rel = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path());

            !is_dir || !excludes.is_match(rel)
        });

        walk
    }

    /// Matching files under `root`, sorted, as absolute paths. Unreadable
    /// entries are skipped; a missing root yields nothing.
    pub fn walk_files<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<PathBuf>
    {
        let root = root.as_ref();

        let mut files: Vec<PathBuf> = self
            .walk_builder(root)
            .build()
            .flatten()
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(DirEntry::into_path)
            .filter(|path| self.matches_extension(path) && !self.excluded(root, path))
            .collect();

        files.sort();
        files
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// Create a file with parent dirs as needed
    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn relative(
        root: &Path,
        files: Vec<PathBuf>,
    ) -> Vec<PathBuf>
    {
        files
            .into_iter()
            .map(|p| {
                p.strip_prefix(root)
                    .map(Path::to_path_buf)
                    .unwrap_or(p)
            })
            .collect()
    }

    #[test]
    fn keeps_only_listed_extensions_sorted() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "com/b/B.java", "class B {}")?;
        write_file(root, "com/a/A.JAVA", "class A {}")?;
        write_file(root, "README.md", "# Test")?;

        let walker = FileWalker::new(&[])?.with_extensions(&["java".to_string()]);
        let files = relative(root, walker.walk_files(root));

        assert_eq!(
            files,
            vec![PathBuf::from("com/a/A.JAVA"), PathBuf::from("com/b/B.java")]
        );
        Ok(())
    }

    #[test]
    fn additional_globs_prune_and_filter() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, "target/gen/Gen.java", "class Gen {}")?;
        write_file(root, "src/Keep.java", "class Keep {}")?;
        write_file(root, "src/KeepTest.java", "class KeepTest {}")?;

        let ignores = vec!["target/**".to_string(), "**/*Test.java".to_string()];
        let walker = FileWalker::new(&ignores)?;
        let files = relative(root, walker.walk_files(root));

        assert_eq!(files, vec![PathBuf::from("src/Keep.java")]);
        Ok(())
    }

    #[test]
    fn hidden_entries_are_skipped() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        write_file(root, ".cache/X.java", "class X {}")?;
        write_file(root, ".Hidden.java", "class Hidden {}")?;
        write_file(root, "Y.java", "class Y {}")?;

        let files = relative(root, FileWalker::new(&[])?.walk_files(root));
        assert_eq!(files, vec![PathBuf::from("Y.java")]);
        Ok(())
    }

    #[test]
    fn missing_root_yields_nothing() -> Result<()>
    {
        let temp_dir = TempDir::new()?;
        let files = FileWalker::new(&[])?.walk_files(
            temp_dir
                .path()
                .join("absent"),
        );

        assert!(files.is_empty());
        Ok(())
    }
}
