//! Project call graph: method identities, forward/reverse adjacency and
//! declaration locations.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::core::index::SourceIndex;
use crate::core::resolve::{Scope, SymbolResolver};
use crate::infra::config::OverloadPolicy;
use crate::infra::utils::NameUtils;
use crate::parsers::java_parser::MethodDecl;

/// Graph node: owner type FQN, method name and an optional erased parameter
/// list. Without the discriminator, overloads share one identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MethodIdentity
{
    pub owner: String,
    pub name: String,
    pub params: Option<String>,
}

impl MethodIdentity
{
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Self
    {
        Self {
            owner: owner.into(),
            name: name.into(),
            params: None,
        }
    }

    pub fn with_params(
        mut self,
        params: impl Into<String>,
    ) -> Self
    {
        self.params = Some(params.into());
        self
    }

    /// Identity of a declared method under the given policy
    pub fn declared(
        owner: &str,
        method: &MethodDecl,
        policy: OverloadPolicy,
    ) -> Self
    {
        let id = Self::new(owner, &method.name);

        match policy
        {
            OverloadPolicy::Merge => id,
            OverloadPolicy::Distinguish => id.with_params(method.param_list()),
        }
    }

    /// Canonical key: `com.x.Foo#bar` or `com.x.Foo#bar(String,int)`
    pub fn key(&self) -> String
    {
        match &self.params
        {
            Some(p) => format!("{}#{}({})", self.owner, self.name, p),
            None => format!("{}#{}", self.owner, self.name),
        }
    }

    /// Parse a canonical key back into an identity
    pub fn parse_key(key: &str) -> Option<Self>
    {
        let (owner, rest) = key.split_once('#')?;

        if owner.is_empty() || rest.is_empty()
        {
            return None;
        }

        match rest.split_once('(')
        {
            Some((name, params)) =>
            {
                let params = params.strip_suffix(')')?;
                Some(Self::new(owner, name).with_params(params))
            }
            None => Some(Self::new(owner, rest)),
        }
    }

    /// Human form used in call chains: `Foo.bar()`
    pub fn display_name(&self) -> String
    {
        format!("{}.{}()", NameUtils::simple_name(&self.owner), self.name)
    }
}

impl fmt::Display for MethodIdentity
{
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result
    {
        f.write_str(&self.key())
    }
}

/// Where a method is declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodLocation
{
    /// Repo-relative path
    pub path: String,

    /// 1-based declaration line
    pub line: usize,
}

/// Directed method call graph. Edge multiplicity collapses to a set and
/// insertion order is preserved everywhere.
#[derive(Debug, Clone, Default)]
pub struct CallGraph
{
    /// caller -> callees
    forward: IndexMap<MethodIdentity, IndexSet<MethodIdentity>>,

    /// callee -> callers
    reverse: IndexMap<MethodIdentity, IndexSet<MethodIdentity>>,

    /// identity -> first registered declaration
    locations: IndexMap<MethodIdentity, MethodLocation>,
}

impl CallGraph
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Register every declared method, then resolve each call site into edges
    #[instrument(skip_all, fields(files = index.files().len()))]
    pub fn build(
        index: &SourceIndex,
        resolver: &dyn SymbolResolver,
        policy: OverloadPolicy,
    ) -> Self
    {
        let mut graph = Self::new();
        let mut unresolved = 0usize;

        for (file, ty) in index.types()
        {
            for method in &ty.methods
            {
                let caller = MethodIdentity::declared(&ty.fqn, method, policy);

                graph.register(
                    caller.clone(),
                    MethodLocation {
                        path: file
                            .path
                            .clone(),
                        line: method.line,
                    },
                );

                let scope = Scope {
                    file,
                    ty,
                    method,
                };

                for call in &method.calls
                {
                    match resolver.resolve(index, &scope, call)
                    {
                        Some(target) =>
                        {
                            for callee in target.into_identities()
                            {
                                graph.add_edge(caller.clone(), callee);
                            }
                        }
                        None =>
                        {
                            unresolved += 1;
                            trace!(
                                caller = %caller,
                                call = %call.name,
                                line = call.line,
                                "unresolved call"
                            );
                        }
                    }
                }
            }
        }

        debug!(
            methods = graph
                .locations
                .len(),
            edges = graph.edge_count(),
            unresolved,
            "call graph built"
        );

        graph
    }

    /// Record a declaration; the first registration of an identity wins.
    /// Returns false when the identity was already known.
    pub fn register(
        &mut self,
        id: MethodIdentity,
        location: MethodLocation,
    ) -> bool
    {
        if self
            .locations
            .contains_key(&id)
        {
            debug!(method = %id, path = %location.path, "identity collision; keeping first");
            return false;
        }

        self.locations
            .insert(id, location);
        true
    }

    /// Add `from -> to` to both adjacency maps
    pub fn add_edge(
        &mut self,
        from: MethodIdentity,
        to: MethodIdentity,
    )
    {
        self.reverse
            .entry(to.clone())
            .or_default()
            .insert(from.clone());
        self.forward
            .entry(from)
            .or_default()
            .insert(to);
    }

    /// Direct callees in insertion order
    pub fn callees(
        &self,
        id: &MethodIdentity,
    ) -> impl Iterator<Item = &MethodIdentity>
    {
        self.forward
            .get(id)
            .into_iter()
            .flatten()
    }

    /// Direct callers in insertion order
    pub fn callers(
        &self,
        id: &MethodIdentity,
    ) -> impl Iterator<Item = &MethodIdentity>
    {
        self.reverse
            .get(id)
            .into_iter()
            .flatten()
    }

    pub fn location(
        &self,
        id: &MethodIdentity,
    ) -> Option<&MethodLocation>
    {
        self.locations
            .get(id)
    }

    /// Declared methods in registration order
    pub fn methods(&self) -> impl Iterator<Item = (&MethodIdentity, &MethodLocation)>
    {
        self.locations
            .iter()
    }

    /// Every identity that appears as a node (declared or edge endpoint)
    pub fn nodes(&self) -> IndexSet<&MethodIdentity>
    {
        self.locations
            .keys()
            .chain(
                self.forward
                    .keys(),
            )
            .chain(
                self.reverse
                    .keys(),
            )
            .collect()
    }

    /// All edges as (caller, callee) pairs
    pub fn edges(&self) -> impl Iterator<Item = (&MethodIdentity, &MethodIdentity)>
    {
        self.forward
            .iter()
            .flat_map(|(from, tos)| {
                tos.iter()
                    .map(move |to| (from, to))
            })
    }

    /// Methods with at least one outgoing edge, with their fan-out
    pub fn caller_counts(&self) -> impl Iterator<Item = (&MethodIdentity, usize)>
    {
        self.forward
            .iter()
            .map(|(k, v)| (k, v.len()))
    }

    /// Methods with at least one incoming edge, with their fan-in
    pub fn callee_counts(&self) -> impl Iterator<Item = (&MethodIdentity, usize)>
    {
        self.reverse
            .iter()
            .map(|(k, v)| (k, v.len()))
    }

    pub fn method_count(&self) -> usize
    {
        self.locations
            .len()
    }

    pub fn edge_count(&self) -> usize
    {
        self.forward
            .values()
            .map(IndexSet::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool
    {
        self.locations
            .is_empty()
            && self
                .forward
                .is_empty()
    }
}
