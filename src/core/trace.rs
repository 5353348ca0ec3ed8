//! Graph inspection: method lookup, caller/callee traces, summary stats
//! and Graphviz export.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use owo_colors::OwoColorize;
use petgraph::algo::tarjan_scc;
use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use ptree::TreeBuilder;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::core::callgraph::{CallGraph, MethodIdentity, MethodLocation};
use crate::core::collect::Direction;

/// Identities matching `query`, in graph order.
///
/// Accepted forms: a canonical key (`com.x.Foo#bar`, optionally with a
/// parameter list), `Foo.bar` / `com.x.Foo.bar`, or a bare method name.
pub fn find_methods<'g>(
    graph: &'g CallGraph,
    query: &str,
) -> Vec<&'g MethodIdentity>
{
    let query = query.trim();
    let nodes = graph.nodes();

    if query.contains('#')
    {
        let Some(wanted) = MethodIdentity::parse_key(query)
        else
        {
            return Vec::new();
        };

        return nodes
            .into_iter()
            .filter(|id| {
                id.owner == wanted.owner
                    && id.name == wanted.name
                    && (wanted
                        .params
                        .is_none()
                        || id.params == wanted.params)
            })
            .collect();
    }

    match query.rsplit_once('.')
    {
        Some((ty, name)) => nodes
            .into_iter()
            .filter(|id| id.name == name && owner_matches(&id.owner, ty))
            .collect(),
        None => nodes
            .into_iter()
            .filter(|id| id.name == query)
            .collect(),
    }
}

/// `ty` is the full owner FQN or a dotted suffix of it
fn owner_matches(
    owner: &str,
    ty: &str,
) -> bool
{
    owner == ty
        || owner
            .strip_suffix(ty)
            .is_some_and(|head| head.ends_with('.'))
}

/// One method reached while tracing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceHop
{
    pub method: MethodIdentity,

    /// Hops from the traced method
    pub depth: usize,

    /// Neighbour it was reached from (the traced method at depth 1)
    pub via: MethodIdentity,

    /// `None` for methods outside the indexed sources
    pub location: Option<MethodLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceReport
{
    pub target: MethodIdentity,
    pub location: Option<MethodLocation>,
    pub callers: Vec<TraceHop>,
    pub callees: Vec<TraceHop>,
}

/// Callers within `up` hops and callees within `down` hops of `target`.
pub fn trace(
    graph: &CallGraph,
    target: &MethodIdentity,
    up: usize,
    down: usize,
) -> TraceReport
{
    TraceReport {
        target: target.clone(),
        location: graph
            .location(target)
            .cloned(),
        callers: hops(graph, target, up, Direction::Reverse),
        callees: hops(graph, target, down, Direction::Forward),
    }
}

fn hops(
    graph: &CallGraph,
    target: &MethodIdentity,
    limit: usize,
    direction: Direction,
) -> Vec<TraceHop>
{
    let mut out = Vec::new();
    let mut seen: IndexSet<&MethodIdentity> = IndexSet::from([target]);
    let mut queue = VecDeque::from([(target, 0usize)]);

    while let Some((node, depth)) = queue.pop_front()
    {
        if depth >= limit
        {
            continue;
        }

        for next in direction.neighbours(graph, node)
        {
            if !seen.insert(next)
            {
                continue;
            }

            out.push(TraceHop {
                method: next.clone(),
                depth: depth + 1,
                via: node.clone(),
                location: graph
                    .location(next)
                    .cloned(),
            });
            queue.push_back((next, depth + 1));
        }
    }

    out
}

impl TraceReport
{
    /// Tree view: the traced method with caller and callee subtrees.
    pub fn render_tree(
        &self,
        color: bool,
    ) -> String
    {
        let mut builder = TreeBuilder::new(label(&self.target, self.location.as_ref(), color));

        for (title, hops) in [("callers", &self.callers), ("callees", &self.callees)]
        {
            let title = format!("{title} ({})", hops.len());
            if hops.is_empty()
            {
                builder.add_empty_child(title);
                continue;
            }

            builder.begin_child(title);
            add_hops(&mut builder, hops, &self.target, color);
            builder.end_child();
        }

        let tree = builder.build();
        let mut buf = Vec::new();

        // Writing into memory cannot fail
        let _ = ptree::write_tree(&tree, &mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

fn add_hops(
    builder: &mut TreeBuilder,
    hops: &[TraceHop],
    parent: &MethodIdentity,
    color: bool,
)
{
    for hop in hops
        .iter()
        .filter(|h| &h.via == parent)
    {
        let text = label(&hop.method, hop.location.as_ref(), color);
        let has_children = hops
            .iter()
            .any(|h| h.via == hop.method);

        if has_children
        {
            builder.begin_child(text);
            add_hops(builder, hops, &hop.method, color);
            builder.end_child();
        }
        else
        {
            builder.add_empty_child(text);
        }
    }
}

fn label(
    id: &MethodIdentity,
    location: Option<&MethodLocation>,
    color: bool,
) -> String
{
    let name = id.display_name();
    let place = match location
    {
        Some(loc) => format!("{}:{}", loc.path, loc.line),
        None => "external".to_string(),
    };

    if color
    {
        format!("{} {}", name.green(), place.dimmed())
    }
    else
    {
        format!("{name} {place}")
    }
}

/// Summary numbers for one graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphStats
{
    /// Declared methods
    pub methods: usize,
    pub edges: usize,

    /// Distinct declaring types
    pub types: usize,

    /// Methods calling at least one resolved method
    pub callers: usize,

    /// Methods called by at least one method
    pub callees: usize,

    /// Edge endpoints with no declaration in the sources
    pub external: usize,

    /// Strongly connected groups of mutually recursive methods
    pub recursive_groups: usize,

    /// Highest fan-in first
    pub most_called: Vec<(MethodIdentity, usize)>,

    /// Highest fan-out first
    pub most_calling: Vec<(MethodIdentity, usize)>,
}

pub fn stats(
    graph: &CallGraph,
    top: usize,
) -> GraphStats
{
    let types = graph
        .methods()
        .map(|(id, _)| id.owner.as_str())
        .unique()
        .count();

    let external = graph
        .nodes()
        .into_iter()
        .filter(|id| {
            graph
                .location(id)
                .is_none()
        })
        .count();

    let g = to_petgraph(graph);
    let recursive_groups = tarjan_scc(&g)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1
                || g.contains_edge(scc[0], scc[0])
        })
        .count();

    GraphStats {
        methods: graph.method_count(),
        edges: graph.edge_count(),
        types,
        callers: graph
            .caller_counts()
            .count(),
        callees: graph
            .callee_counts()
            .count(),
        external,
        recursive_groups,
        most_called: top_n(graph.callee_counts(), top),
        most_calling: top_n(graph.caller_counts(), top),
    }
}

/// Count descending, then key ascending for stable output
fn top_n<'g>(
    counts: impl Iterator<Item = (&'g MethodIdentity, usize)>,
    n: usize,
) -> Vec<(MethodIdentity, usize)>
{
    counts
        .sorted_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| a.0.cmp(b.0))
        })
        .take(n)
        .map(|(id, c)| (id.clone(), c))
        .collect()
}

#[derive(Tabled)]
struct SummaryRow
{
    metric: &'static str,
    value: usize,
}

#[derive(Tabled)]
struct RankRow
{
    method: String,
    calls: usize,
}

impl GraphStats
{
    pub fn render_tables(&self) -> String
    {
        let summary = Table::new(vec![
            SummaryRow {
                metric: "methods",
                value: self.methods,
            },
            SummaryRow {
                metric: "types",
                value: self.types,
            },
            SummaryRow {
                metric: "callers",
                value: self.callers,
            },
            SummaryRow {
                metric: "callees",
                value: self.callees,
            },
            SummaryRow {
                metric: "call edges",
                value: self.edges,
            },
            SummaryRow {
                metric: "external methods",
                value: self.external,
            },
            SummaryRow {
                metric: "recursive groups",
                value: self.recursive_groups,
            },
        ])
        .to_string();

        let mut out = summary;

        for (title, rows) in [
            ("Most called", &self.most_called),
            ("Most calling", &self.most_calling),
        ]
        {
            if rows.is_empty()
            {
                continue;
            }

            let table = Table::new(rows.iter().map(|(id, calls)| RankRow {
                method: id.key(),
                calls: *calls,
            }))
            .to_string();

            out.push_str(&format!("\n\n{title}\n{table}"));
        }

        out.push('\n');
        out
    }
}

/// Graphviz DOT text; nodes are labelled with canonical keys.
pub fn to_dot(graph: &CallGraph) -> String
{
    let g = to_petgraph(graph);

    format!("{}", Dot::with_config(&g, &[DotConfig::EdgeNoLabel]))
}

/// Edges carry an empty label; DOT output omits it
fn to_petgraph(graph: &CallGraph) -> DiGraph<String, &'static str>
{
    let mut g = DiGraph::new();
    let mut ids: IndexMap<&MethodIdentity, NodeIndex> = IndexMap::new();

    for id in graph.nodes()
    {
        let ix = g.add_node(id.key());
        ids.insert(id, ix);
    }

    for (from, to) in graph.edges()
    {
        if let (Some(&a), Some(&b)) = (ids.get(from), ids.get(to))
        {
            g.add_edge(a, b, "");
        }
    }

    g
}
