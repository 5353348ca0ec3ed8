//! Human-readable call chains between seeds and related methods.

use std::collections::VecDeque;

use indexmap::{IndexMap, IndexSet};

use crate::core::callgraph::{CallGraph, MethodIdentity};
use crate::core::collect::Direction;

/// How a chain is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ChainStyle
{
    /// Endpoints only: `A.a() -> C.c()`
    #[default]
    Pair,

    /// Every hop: `A.a() -> B.b() -> C.c()`
    Path,
}

/// Chains from each seed to the related methods it reaches within `down`
/// callee hops (`seed -> m`) and from those reaching it within `up` caller
/// hops (`m -> seed`). Duplicates removed in first-seen order, then capped.
pub fn format_chains(
    graph: &CallGraph,
    seeds: &IndexSet<MethodIdentity>,
    related: &IndexSet<MethodIdentity>,
    up: usize,
    down: usize,
    style: ChainStyle,
    cap: usize,
) -> Vec<String>
{
    let mut chains: IndexSet<String> = IndexSet::new();

    for seed in seeds
    {
        for path in reach(graph, seed, down, Direction::Forward, related)
        {
            chains.insert(render(&path, style));
        }

        for mut path in reach(graph, seed, up, Direction::Reverse, related)
        {
            // Callers read left to right into the seed
            path.reverse();
            chains.insert(render(&path, style));
        }
    }

    chains
        .into_iter()
        .take(cap)
        .collect()
}

/// BFS from `seed`; returns the hop path (seed first) to every reached
/// member of `related`, traversing through non-members.
fn reach<'g>(
    graph: &'g CallGraph,
    seed: &'g MethodIdentity,
    limit: usize,
    direction: Direction,
    related: &IndexSet<MethodIdentity>,
) -> Vec<Vec<&'g MethodIdentity>>
{
    let mut found = Vec::new();

    if limit == 0
    {
        return found;
    }

    // node -> node it was discovered from
    let mut parent: IndexMap<&MethodIdentity, Option<&MethodIdentity>> = IndexMap::new();
    parent.insert(seed, None);

    let mut queue = VecDeque::from([(seed, 0usize)]);

    while let Some((node, depth)) = queue.pop_front()
    {
        if depth >= limit
        {
            continue;
        }

        for next in direction.neighbours(graph, node)
        {
            if parent.contains_key(next)
            {
                continue;
            }

            parent.insert(next, Some(node));

            if related.contains(next)
            {
                found.push(trail(&parent, next));
            }

            queue.push_back((next, depth + 1));
        }
    }

    found
}

/// Walk parent links back to the seed; result is seed-first.
fn trail<'g>(
    parent: &IndexMap<&'g MethodIdentity, Option<&'g MethodIdentity>>,
    end: &'g MethodIdentity,
) -> Vec<&'g MethodIdentity>
{
    let mut out = vec![end];
    let mut cur = end;

    while let Some(&Some(prev)) = parent.get(cur)
    {
        out.push(prev);
        cur = prev;
    }

    out.reverse();
    out
}

fn render(
    path: &[&MethodIdentity],
    style: ChainStyle,
) -> String
{
    let names: Vec<String> = match style
    {
        ChainStyle::Pair => [path.first(), path.last()]
            .into_iter()
            .flatten()
            .map(|m| m.display_name())
            .collect(),
        ChainStyle::Path => path
            .iter()
            .map(|m| m.display_name())
            .collect(),
    };

    names.join(" -> ")
}
