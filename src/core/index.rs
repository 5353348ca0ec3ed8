//! Project-wide source index: every parseable file under the source root,
//! with type lookup by fully-qualified and by simple name.

use std::path::{Path, PathBuf};

use anyhow::Result;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::infra::config::Config;
use crate::infra::io::read_source;
use crate::infra::walk::FileWalker;
use crate::parsers::java_parser::{JavaParser, ParsedFile, TypeDecl};

/// Parsed files plus type tables. Immutable once built.
#[derive(Debug, Default)]
pub struct SourceIndex
{
    /// Project root all paths are relative to
    root: PathBuf,

    /// Files sorted by relative path
    files: Vec<ParsedFile>,

    /// Relative path -> position in `files`
    by_path: IndexMap<String, usize>,

    /// Type FQN -> (file position, type position); first declaration wins
    by_fqn: IndexMap<String, (usize, usize)>,

    /// Simple type name -> FQNs declaring it
    by_simple: IndexMap<String, Vec<String>>,
}

impl SourceIndex
{
    /// Walk `root/<source_root>`, parse every matching file in parallel and
    /// index the results. A missing source root gives an empty index.
    #[instrument(skip(root, config), fields(root = %root.display()))]
    pub fn build(
        root: &Path,
        config: &Config,
    ) -> Result<Self>
    {
        let source_root = root.join(&config.source_root);

        if !source_root.is_dir()
        {
            warn!(
                source_root = %source_root.display(),
                "source root missing; index is empty"
            );
            return Ok(Self::from_files(root, Vec::new()));
        }

        // Sorted file list
        let paths = FileWalker::new(&config.ignore_patterns)?
            .with_extensions(&config.extensions)
            .walk_files(&source_root);

        debug!(candidates = paths.len(), "walked source root");

        let parser = JavaParser::new();
        let max_size = config.max_file_size;

        // Order-preserving parallel parse keeps first-write-wins deterministic
        let parsed: Vec<ParsedFile> = paths
            .par_iter()
            .filter_map(|abs| parse_one(&parser, root, abs, max_size))
            .collect();

        let index = Self::from_files(root, parsed);

        info!(
            files = index
                .files
                .len(),
            types = index
                .by_fqn
                .len(),
            "source index built"
        );

        Ok(index)
    }

    /// Index already-parsed files (sorted here by path).
    pub fn from_files(
        root: &Path,
        mut files: Vec<ParsedFile>,
    ) -> Self
    {
        files.sort_by(|a, b| {
            a.path
                .cmp(&b.path)
        });

        let mut index = Self {
            root: root.to_path_buf(),
            ..Self::default()
        };

        for (fi, file) in files
            .iter()
            .enumerate()
        {
            index
                .by_path
                .entry(
                    file.path
                        .clone(),
                )
                .or_insert(fi);

            for (ti, ty) in file
                .types
                .iter()
                .enumerate()
            {
                if index
                    .by_fqn
                    .contains_key(&ty.fqn)
                {
                    debug!(fqn = %ty.fqn, path = %file.path, "duplicate type ignored");
                    continue;
                }

                index
                    .by_fqn
                    .insert(
                        ty.fqn
                            .clone(),
                        (fi, ti),
                    );
                index
                    .by_simple
                    .entry(
                        ty.name
                            .clone(),
                    )
                    .or_default()
                    .push(
                        ty.fqn
                            .clone(),
                    );
            }
        }

        index.files = files;
        index
    }

    pub fn root(&self) -> &Path
    {
        &self.root
    }

    pub fn files(&self) -> &[ParsedFile]
    {
        &self.files
    }

    pub fn is_empty(&self) -> bool
    {
        self.files
            .is_empty()
    }

    /// File by repo-relative path
    pub fn file(
        &self,
        path: &str,
    ) -> Option<&ParsedFile>
    {
        self.by_path
            .get(path)
            .map(|&i| &self.files[i])
    }

    /// Type declaration by FQN
    pub fn type_decl(
        &self,
        fqn: &str,
    ) -> Option<&TypeDecl>
    {
        self.by_fqn
            .get(fqn)
            .map(|&(fi, ti)| &self.files[fi].types[ti])
    }

    /// File declaring the type `fqn`
    pub fn file_of_type(
        &self,
        fqn: &str,
    ) -> Option<&ParsedFile>
    {
        self.by_fqn
            .get(fqn)
            .map(|&(fi, _)| &self.files[fi])
    }

    pub fn has_type(
        &self,
        fqn: &str,
    ) -> bool
    {
        self.by_fqn
            .contains_key(fqn)
    }

    /// All FQNs whose simple name is `name`
    pub fn types_named(
        &self,
        name: &str,
    ) -> &[String]
    {
        self.by_simple
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate every (file, type) pair in path order
    pub fn types(&self) -> impl Iterator<Item = (&ParsedFile, &TypeDecl)>
    {
        self.files
            .iter()
            .flat_map(|f| {
                f.types
                    .iter()
                    .map(move |t| (f, t))
            })
    }
}

/// Repo-relative `/`-separated form of `abs`
pub fn relative_path(
    root: &Path,
    abs: &Path,
) -> String
{
    abs.strip_prefix(root)
        .unwrap_or(abs)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Read and parse one file; failures are logged and dropped.
fn parse_one(
    parser: &JavaParser,
    root: &Path,
    abs: &Path,
    max_size: u64,
) -> Option<ParsedFile>
{
    let rel = relative_path(root, abs);

    let source = match read_source(abs)
    {
        Ok(s) => s,
        Err(e) =>
        {
            warn!(path = %rel, error = %e, "unreadable file skipped");
            return None;
        }
    };

    let mut parsed = match parser.parse(&rel, &source.text)
    {
        Ok(p) => p,
        Err(e) =>
        {
            warn!(path = %rel, error = %e, "parse failed; file excluded");
            return None;
        }
    };

    parsed.size = source.size;

    // Oversized files still feed the graph but never carry content
    if source.size >= max_size
    {
        debug!(path = %rel, size = source.size, "oversized; content dropped");
        parsed.content = None;
    }

    Some(parsed)
}
