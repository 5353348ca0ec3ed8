//! Explicit graph handle: index, resolver and call graph for one project,
//! built once and shared by every request against that project.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::callgraph::CallGraph;
use crate::core::errors::ContextError;
use crate::core::index::SourceIndex;
use crate::core::resolve::Resolver;
use crate::infra::config::Config;

/// A built project. Read-only after `open`; call `rebuild` to refresh.
#[derive(Debug)]
pub struct Workspace
{
    root: PathBuf,
    config: Config,
    index: SourceIndex,
    resolver: Resolver,
    graph: CallGraph,
}

impl Workspace
{
    /// Index `root`, set up the resolver and build the call graph.
    ///
    /// Fails only when `root` is not a directory; a missing source root
    /// gives an empty graph with the resolver marked unavailable.
    #[instrument(skip(root, config), fields(root = %root.display()))]
    pub fn open(
        root: &Path,
        config: Config,
    ) -> Result<Self>
    {
        if !root.is_dir()
        {
            return Err(ContextError::RootNotFound(root.to_path_buf()).into());
        }

        // Canonical root keeps relative paths stable across `./` spellings
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

        let resolver = Resolver::init(&root, &config);
        if let Some(reason) = resolver.unavailable_reason()
        {
            warn!(reason, "symbol resolver unavailable; no call graph");
        }

        let index = SourceIndex::build(&root, &config)?;
        let graph = CallGraph::build(&index, &resolver, config.overloads);

        info!(
            methods = graph.method_count(),
            edges = graph.edge_count(),
            "workspace ready"
        );

        Ok(Self {
            root,
            config,
            index,
            resolver,
            graph,
        })
    }

    /// Rebuild index and graph from disk, keeping root and config.
    pub fn rebuild(&mut self) -> Result<()>
    {
        let fresh = Self::open(&self.root, self.config.clone())?;
        *self = fresh;
        Ok(())
    }

    pub fn root(&self) -> &Path
    {
        &self.root
    }

    pub fn config(&self) -> &Config
    {
        &self.config
    }

    pub fn index(&self) -> &SourceIndex
    {
        &self.index
    }

    pub fn graph(&self) -> &CallGraph
    {
        &self.graph
    }

    pub fn resolver_available(&self) -> bool
    {
        self.resolver
            .is_available()
    }
}
