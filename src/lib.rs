//! **callscope** - whole-project call-graph context for Java code review
//!
//! Indexes a Java source tree with tree-sitter, resolves call sites into a
//! method-level call graph, and packages changed files together with the
//! files of their callers and callees plus readable call chains.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Indexing, resolution, graph traversal and context assembly
pub mod core {
    /// Usage and parse error types
    pub mod errors;
    pub use self::errors::{ContextError, ParseError};

    /// Parsed source tree with type lookup tables
    pub mod index;
    pub use self::index::SourceIndex;

    /// Call-site to method resolution
    pub mod resolve;
    pub use self::resolve::{JavaResolver, Resolver, SymbolResolver};

    /// Forward and reverse method call graph
    pub mod callgraph;
    pub use self::callgraph::{CallGraph, MethodIdentity, MethodLocation};

    /// Index, resolver and graph for one project
    pub mod workspace;
    pub use self::workspace::Workspace;

    /// Depth-bounded neighbourhood collection
    pub mod collect;

    /// Call-chain strings
    pub mod chains;
    pub use self::chains::ChainStyle;

    /// Changed-file context assembly
    pub mod context;
    pub use self::context::{ContextRequest, ContextResult, assemble};

    /// Changed-method detection from unified diffs
    pub mod diff;

    /// Token-budgeted text rendering
    pub mod render;

    /// Method lookup, traces, stats and DOT export
    pub mod trace;

    /// Command handlers
    pub mod run;
    pub use self::run::{context_run, stats_run, trace_run};
}

/// Language processing
pub mod parsers {
    /// Java declarations, call sites and local types via tree-sitter
    pub mod java_parser;
    pub use self::java_parser::{JavaParser, ParsedFile};
}

/// Infrastructure - configuration, I/O, walking and helpers
pub mod infra {
    /// Layered configuration (file, environment, defaults)
    pub mod config;
    pub use self::config::{Config, OverloadPolicy, init as config_init, load_config};

    /// Source file reading
    pub mod io;

    /// Gitignore-aware directory walking
    pub mod walk;
    pub use self::walk::FileWalker;

    /// Name, type-text and tree-sitter node helpers
    pub mod utils;
}

pub use self::cli::{AppContext, Cli, Commands};
pub use self::core::{CallGraph, ContextRequest, ContextResult, MethodIdentity, Workspace, assemble};
pub use self::infra::{Config, load_config};
