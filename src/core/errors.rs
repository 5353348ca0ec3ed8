//! Error types shared by the library seams.
//!
//! Only usage-level problems surface as `ContextError`; everything that can
//! go wrong for a single file is a `ParseError` and gets absorbed by the
//! index (logged, file skipped).

use std::path::PathBuf;

use miette::Diagnostic;

/// Usage-level failures that stop a request before any processing
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ContextError
{
    /// The project root does not exist or is not a directory
    #[error("project root not found: {}", .0.display())]
    #[diagnostic(
        code(callscope::root_not_found),
        help("pass --repo-path pointing at an existing project directory")
    )]
    RootNotFound(PathBuf),

    /// The changed-file list was empty after trimming
    #[error("no changed files were given")]
    #[diagnostic(
        code(callscope::no_changed_files),
        help("pass --changed-files as a comma-separated list of repo-relative paths")
    )]
    NoChangedFiles,

    /// The `--changed-methods` payload is not a JSON object of string lists
    #[error("invalid changed-methods JSON")]
    #[diagnostic(
        code(callscope::changed_methods),
        help("expected a JSON object mapping file paths to arrays of method names")
    )]
    ChangedMethods(#[source] serde_json::Error),
}

/// Per-file parse failures (non-fatal for the index)
#[derive(Debug, thiserror::Error)]
pub enum ParseError
{
    /// The grammar could not be attached to the parser
    #[error("failed to load Java grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// Tree-sitter returned no tree at all
    #[error("parser produced no tree for {0}")]
    NoTree(String),

    /// The tree contains ERROR or MISSING nodes
    #[error("syntax error in {path} at line {line}")]
    Syntax
    {
        path: String,
        line: usize,
    },
}
