#![allow(dead_code)]

use fxhash::FxHashSet;
use topologyzoo_treewidth::graph::Graph;
use topologyzoo_treewidth::TreeDecomposition;

pub fn graph(id: &str, n: usize, edges: &[(usize, usize)]) -> Graph {
    let mut graph = Graph::new(id);
    for v in 0..n {
        graph.add_node(&v.to_string());
    }
    for (u, v) in edges.iter().copied() {
        if u != v {
            graph.add_edge(u, v);
        }
    }
    graph
}

/// Decomposition obtained by eliminating the nodes in index order.
///
/// Bag `v` holds `v` and its later neighbours in the filled graph and hangs
/// below the bag of its earliest later neighbour, or below bag `v + 1` when
/// it has none.
pub fn elimination_decomposition(graph: &Graph) -> TreeDecomposition {
    let n = graph.order();
    let mut adjacency: Vec<FxHashSet<usize>> = vec![FxHashSet::default(); n];
    for (u, v) in graph.edges() {
        adjacency[u].insert(v);
        adjacency[v].insert(u);
    }
    let mut td = TreeDecomposition::default();
    let mut parents = Vec::with_capacity(n);
    for v in 0..n {
        let later: Vec<usize> = adjacency[v].iter().copied().filter(|u| *u > v).collect();
        for a in &later {
            for b in &later {
                if a != b {
                    adjacency[*a].insert(*b);
                }
            }
        }
        let mut bag: FxHashSet<usize> = later.iter().copied().collect();
        bag.insert(v);
        td.add_bag(bag);
        parents.push(later.iter().copied().min().or(if v + 1 < n { Some(v + 1) } else { None }));
    }
    for (v, parent) in parents.into_iter().enumerate() {
        if let Some(p) = parent {
            td.add_edge(v, p);
        }
    }
    td
}
