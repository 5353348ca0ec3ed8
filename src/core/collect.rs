//! Bounded neighbourhood collection around seed methods.

use std::collections::VecDeque;

use indexmap::IndexSet;
use itertools::Either;

use crate::core::callgraph::{CallGraph, MethodIdentity};

/// Traversal direction over the call graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction
{
    /// Callees (downstream)
    Forward,

    /// Callers (upstream)
    Reverse,
}

impl Direction
{
    /// Direct neighbours of `id` in this direction
    pub fn neighbours<'g>(
        self,
        graph: &'g CallGraph,
        id: &MethodIdentity,
    ) -> impl Iterator<Item = &'g MethodIdentity>
    {
        match self
        {
            Direction::Forward => Either::Left(graph.callees(id)),
            Direction::Reverse => Either::Right(graph.callers(id)),
        }
    }
}

/// Methods within `down` callee hops and `up` caller hops of any seed,
/// seeds excluded. Each pass starts with the seeds marked visited, so the
/// traversal terminates on cyclic graphs.
pub fn collect(
    graph: &CallGraph,
    seeds: &IndexSet<MethodIdentity>,
    up: usize,
    down: usize,
) -> IndexSet<MethodIdentity>
{
    let mut related = IndexSet::new();

    if seeds.is_empty()
    {
        return related;
    }

    bfs(graph, seeds, down, Direction::Forward, &mut related);
    bfs(graph, seeds, up, Direction::Reverse, &mut related);

    // A seed reached from another seed is still not "related"
    related.retain(|id| !seeds.contains(id));
    related
}

/// One breadth-first pass; reached nodes are appended to `out`.
fn bfs(
    graph: &CallGraph,
    seeds: &IndexSet<MethodIdentity>,
    limit: usize,
    direction: Direction,
    out: &mut IndexSet<MethodIdentity>,
)
{
    if limit == 0
    {
        return;
    }

    let mut visited: IndexSet<&MethodIdentity> = seeds
        .iter()
        .collect();
    let mut queue: VecDeque<(&MethodIdentity, usize)> = seeds
        .iter()
        .map(|s| (s, 0))
        .collect();

    while let Some((node, depth)) = queue.pop_front()
    {
        if depth >= limit
        {
            continue;
        }

        for next in direction.neighbours(graph, node)
        {
            if visited.insert(next)
            {
                out.insert(next.clone());
                queue.push_back((next, depth + 1));
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn id(name: &str) -> MethodIdentity
    {
        MethodIdentity::new("p.T", name)
    }

    fn seeds(names: &[&str]) -> IndexSet<MethodIdentity>
    {
        names
            .iter()
            .map(|n| id(n))
            .collect()
    }

    /// a -> b -> c -> d, and x -> a
    fn chain() -> CallGraph
    {
        let mut g = CallGraph::new();
        g.add_edge(id("a"), id("b"));
        g.add_edge(id("b"), id("c"));
        g.add_edge(id("c"), id("d"));
        g.add_edge(id("x"), id("a"));
        g
    }

    #[test]
    fn depth_limits_each_direction()
    {
        let g = chain();

        assert_eq!(collect(&g, &seeds(&["a"]), 0, 1), seeds(&["b"]));
        assert_eq!(collect(&g, &seeds(&["a"]), 0, 2), seeds(&["b", "c"]));
        assert_eq!(collect(&g, &seeds(&["a"]), 1, 0), seeds(&["x"]));
        assert_eq!(collect(&g, &seeds(&["c"]), 5, 0), seeds(&["b", "a", "x"]));
    }

    #[test]
    fn zero_depths_and_empty_seeds_are_empty()
    {
        let g = chain();

        assert!(collect(&g, &seeds(&["a"]), 0, 0).is_empty());
        assert!(collect(&g, &IndexSet::new(), 3, 3).is_empty());
    }

    #[test]
    fn mutual_recursion_terminates()
    {
        let mut g = CallGraph::new();
        g.add_edge(id("a"), id("b"));
        g.add_edge(id("b"), id("a"));

        assert_eq!(collect(&g, &seeds(&["a"]), 5, 5), seeds(&["b"]));
    }

    #[test]
    fn seeds_never_appear_in_result()
    {
        let g = chain();

        // b is reachable from a but is itself a seed
        let got = collect(&g, &seeds(&["a", "b"]), 2, 2);
        assert_eq!(got, seeds(&["c", "d", "x"]));
    }
}
