// Traversal invariants over random call graphs.
use std::collections::{HashSet, VecDeque};

use indexmap::IndexSet;
use proptest::prelude::*;

use callscope::core::callgraph::{CallGraph, MethodIdentity};
use callscope::core::chains::{ChainStyle, format_chains};
use callscope::core::collect::collect;

fn id(n: u8) -> MethodIdentity {
    MethodIdentity::new("p.T", format!("m{n}"))
}

fn graph_of(edges: &[(u8, u8)]) -> CallGraph {
    let mut g = CallGraph::new();
    for &(a, b) in edges {
        g.add_edge(id(a), id(b));
    }
    g
}

/// Plain BFS distance check, independent of the collector.
fn within(g: &CallGraph, seeds: &IndexSet<MethodIdentity>, limit: usize, forward: bool) -> HashSet<MethodIdentity> {
    let mut seen: HashSet<MethodIdentity> = seeds.iter().cloned().collect();
    let mut queue: VecDeque<(MethodIdentity, usize)> = seeds.iter().map(|s| (s.clone(), 0)).collect();
    let mut out = HashSet::new();

    while let Some((node, d)) = queue.pop_front() {
        if d == limit {
            continue;
        }
        let next: Vec<MethodIdentity> = if forward {
            g.callees(&node).cloned().collect()
        } else {
            g.callers(&node).cloned().collect()
        };
        for n in next {
            if seen.insert(n.clone()) {
                out.insert(n.clone());
                queue.push_back((n, d + 1));
            }
        }
    }

    out
}

fn edges() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..12, 0u8..12), 0..40)
}

fn seed_set() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(0u8..12, 1..4)
}

proptest! {
    #[test]
    fn related_excludes_seeds_and_matches_bfs(
        edges in edges(),
        seeds in seed_set(),
        up in 0usize..4,
        down in 0usize..4,
    ) {
        let g = graph_of(&edges);
        let seeds: IndexSet<MethodIdentity> = seeds.into_iter().map(id).collect();

        let got: HashSet<MethodIdentity> = collect(&g, &seeds, up, down).into_iter().collect();

        let mut want = within(&g, &seeds, down, true);
        want.extend(within(&g, &seeds, up, false));
        want.retain(|m| !seeds.contains(m));

        prop_assert!(got.iter().all(|m| !seeds.contains(m)));
        prop_assert_eq!(got, want);
    }

    #[test]
    fn growing_depth_never_shrinks_the_result(
        edges in edges(),
        seeds in seed_set(),
        depth in 0usize..4,
    ) {
        let g = graph_of(&edges);
        let seeds: IndexSet<MethodIdentity> = seeds.into_iter().map(id).collect();

        let small = collect(&g, &seeds, depth, depth);
        let large = collect(&g, &seeds, depth + 1, depth + 1);

        prop_assert!(small.iter().all(|m| large.contains(m)));
    }

    #[test]
    fn chains_are_unique_and_capped(
        edges in edges(),
        seeds in seed_set(),
        cap in 0usize..8,
    ) {
        let g = graph_of(&edges);
        let seeds: IndexSet<MethodIdentity> = seeds.into_iter().map(id).collect();
        let related = collect(&g, &seeds, 2, 2);

        let chains = format_chains(&g, &seeds, &related, 2, 2, ChainStyle::Path, cap);
        let unique: HashSet<&String> = chains.iter().collect();

        prop_assert!(chains.len() <= cap);
        prop_assert_eq!(unique.len(), chains.len());
    }
}
