use crate::graph::Graph;
use crate::io::TdHeader;
use bitvec::prelude::*;
use fxhash::FxHashSet;
use std::cmp::max;
use std::collections::VecDeque;
use thiserror::Error;

/// Why a decomposition is not a valid tree decomposition of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("vertex index {0} is not a node of the graph")]
    UnknownNode(usize),
    #[error("decomposition declares {declared} vertices but the graph has {actual}")]
    VertexCountMismatch { declared: usize, actual: usize },
    #[error("bag {0} is not connected to the root bag")]
    DisconnectedTree(usize),
    #[error("decomposition tree contains a cycle")]
    Cyclic,
    #[error("node {0} is not contained in any bag")]
    MissingNode(String),
    #[error("edge ({0}, {1}) is not contained in any bag")]
    UncoveredEdge(String, String),
    #[error("bags containing node {0} do not induce a subtree")]
    DisconnectedNodeOccurrence(String),
    #[error("declared width+1 is {declared} but the largest bag has {actual} vertices")]
    DeclaredWidthMismatch { declared: usize, actual: usize },
}

#[derive(Debug, Default, Clone)]
pub struct Bag {
    pub id: usize,
    pub vertex_set: FxHashSet<usize>,
    pub neighbors: Vec<usize>,
}

/// A tree decomposition as reported by a solver. Bag ids and vertex
/// indices are 0-based; structure is not trusted until [`validate`] passes.
///
/// [`validate`]: TreeDecomposition::validate
#[derive(Debug, Clone, Default)]
pub struct TreeDecomposition {
    bags: Vec<Bag>,
    edges: Vec<(usize, usize)>,
    root: Option<usize>,
    max_bag_size: usize,
    header: Option<TdHeader>,
}

impl TreeDecomposition {
    pub fn with_header(header: TdHeader) -> Self {
        Self {
            header: Some(header),
            ..Self::default()
        }
    }

    pub fn add_bag(&mut self, vertex_set: FxHashSet<usize>) -> usize {
        let id = self.bags.len();
        if id == 0 {
            self.root = Some(id);
        }
        self.max_bag_size = max(self.max_bag_size, vertex_set.len());
        self.bags.push(Bag {
            id,
            vertex_set,
            neighbors: Vec::new(),
        });
        id
    }

    /// Duplicate edges are kept so that validation reports them as a cycle.
    pub fn add_edge(&mut self, b1: usize, b2: usize) {
        assert!(b1 < self.bags.len());
        assert!(b2 < self.bags.len());
        self.bags[b1].neighbors.push(b2);
        self.bags[b2].neighbors.push(b1);
        self.edges.push((b1.min(b2), b1.max(b2)));
    }

    pub fn bags(&self) -> &[Bag] {
        &self.bags
    }

    pub fn tree_edges(&self) -> Vec<(usize, usize)> {
        self.edges.clone()
    }

    pub fn header(&self) -> Option<TdHeader> {
        self.header
    }

    pub fn max_bag_size(&self) -> usize {
        self.max_bag_size
    }

    pub fn width(&self) -> usize {
        self.max_bag_size.saturating_sub(1)
    }

    /// Breadth-first parents from the root. `None` for the root and for bags
    /// not reachable from it.
    fn parents(&self, visited: &mut BitVec) -> Vec<Option<usize>> {
        let mut parent = vec![None; self.bags.len()];
        let root = match self.root {
            Some(root) => root,
            None => return parent,
        };
        let mut queue = VecDeque::new();
        visited.set(root, true);
        queue.push_back(root);
        while let Some(b) = queue.pop_front() {
            for n in self.bags[b].neighbors.iter().copied() {
                if !visited[n] {
                    visited.set(n, true);
                    parent[n] = Some(b);
                    queue.push_back(n);
                }
            }
        }
        parent
    }

    /// Checks that this is a tree decomposition of `graph` and returns its width.
    ///
    /// Stops at the first violation found. A decomposition without bags is only
    /// valid for the empty graph.
    pub fn validate(&self, graph: &Graph) -> Result<usize, Violation> {
        let n = graph.order();
        if let Some(header) = self.header {
            if header.vertices != n {
                return Err(Violation::VertexCountMismatch {
                    declared: header.vertices,
                    actual: n,
                });
            }
        }
        if let Some(v) = self
            .bags
            .iter()
            .flat_map(|b| b.vertex_set.iter().copied())
            .filter(|v| *v >= n)
            .min()
        {
            return Err(Violation::UnknownNode(v + 1));
        }
        if self.bags.is_empty() {
            return match graph.nodes().next() {
                None => Ok(0),
                Some(v) => Err(Violation::MissingNode(String::from(graph.label(v)))),
            };
        }

        let mut visited = bitvec![0; self.bags.len()];
        let parent = self.parents(&mut visited);
        if let Some(b) = visited.iter().position(|seen| !*seen) {
            return Err(Violation::DisconnectedTree(b + 1));
        }
        if self.edges.len() != self.bags.len() - 1 {
            return Err(Violation::Cyclic);
        }

        let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); n];
        for bag in &self.bags {
            for v in bag.vertex_set.iter().copied() {
                occurrences[v].push(bag.id);
            }
        }

        if let Some(v) = graph.nodes().find(|v| occurrences[*v].is_empty()) {
            return Err(Violation::MissingNode(String::from(graph.label(v))));
        }

        for (u, v) in graph.edges() {
            let covered = occurrences[u]
                .iter()
                .any(|b| self.bags[*b].vertex_set.contains(&v));
            if !covered {
                return Err(Violation::UncoveredEdge(
                    String::from(graph.label(u)),
                    String::from(graph.label(v)),
                ));
            }
        }

        // In a rooted tree the bags holding v form a subtree iff exactly one
        // of them has a parent that does not hold v.
        for v in graph.nodes() {
            let tops = occurrences[v]
                .iter()
                .filter(|b| match parent[**b] {
                    None => true,
                    Some(p) => !self.bags[p].vertex_set.contains(&v),
                })
                .count();
            if tops != 1 {
                return Err(Violation::DisconnectedNodeOccurrence(String::from(
                    graph.label(v),
                )));
            }
        }

        if let Some(header) = self.header {
            if header.max_bag_size != self.max_bag_size {
                return Err(Violation::DeclaredWidthMismatch {
                    declared: header.max_bag_size,
                    actual: self.max_bag_size,
                });
            }
        }
        Ok(self.width())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::parse_tree_decomposition;

    fn path_graph() -> Graph {
        let mut graph = Graph::new("path");
        for v in &["1", "2", "3"] {
            graph.add_node(v);
        }
        graph.add_edge(0, 1);
        graph.add_edge(1, 2);
        graph
    }

    fn td(text: &str) -> TreeDecomposition {
        parse_tree_decomposition(text).unwrap()
    }

    #[test]
    fn path_with_two_bags_has_width_one() {
        let graph = path_graph();
        assert_eq!(td("s td 2 2 3\nb 1 1 2\nb 2 2 3\n1 2\n").validate(&graph), Ok(1));
    }

    #[test]
    fn single_bag_is_always_valid() {
        let graph = path_graph();
        assert_eq!(td("s td 1 3 3\nb 1 1 2 3\n").validate(&graph), Ok(2));
    }

    #[test]
    fn missing_node() {
        let graph = path_graph();
        assert_eq!(
            td("s td 2 2 3\nb 1 1 2\nb 2 2 1\n1 2\n").validate(&graph),
            Err(Violation::MissingNode(String::from("3")))
        );
    }

    #[test]
    fn uncovered_edge() {
        let graph = path_graph();
        assert_eq!(
            td("s td 2 2 3\nb 1 1 2\nb 2 3\n1 2\n").validate(&graph),
            Err(Violation::UncoveredEdge(String::from("2"), String::from("3")))
        );
    }

    #[test]
    fn disconnected_occurrence() {
        let graph = path_graph();
        assert_eq!(
            td("s td 3 2 3\nb 1 1 2\nb 2 2 3\nb 3 3 1\n1 2\n2 3\n").validate(&graph),
            Err(Violation::DisconnectedNodeOccurrence(String::from("1")))
        );
    }

    #[test]
    fn structure_must_be_a_tree() {
        let graph = path_graph();
        assert_eq!(
            td("s td 2 2 3\nb 1 1 2\nb 2 2 3\n").validate(&graph),
            Err(Violation::DisconnectedTree(2))
        );
        assert_eq!(
            td("s td 3 2 3\nb 1 1 2\nb 2 2 3\nb 3 2\n1 2\n2 3\n3 1\n").validate(&graph),
            Err(Violation::Cyclic)
        );
        assert_eq!(
            td("s td 2 2 3\nb 1 1 2\nb 2 2 3\n1 2\n2 1\n").validate(&graph),
            Err(Violation::Cyclic)
        );
    }

    #[test]
    fn header_must_match() {
        let graph = path_graph();
        assert_eq!(
            td("s td 2 2 4\nb 1 1 2\nb 2 2 3\n1 2\n").validate(&graph),
            Err(Violation::VertexCountMismatch {
                declared: 4,
                actual: 3
            })
        );
        assert_eq!(
            td("s td 2 3 3\nb 1 1 2\nb 2 2 3\n1 2\n").validate(&graph),
            Err(Violation::DeclaredWidthMismatch {
                declared: 3,
                actual: 2
            })
        );
    }

    #[test]
    fn vertices_outside_the_graph() {
        let graph = path_graph();
        assert_eq!(
            td("s td 1 4 3\nb 1 1 2 3 4\n").validate(&graph),
            Err(Violation::UnknownNode(4))
        );
    }

    #[test]
    fn empty_decompositions() {
        let empty = Graph::new("empty");
        assert_eq!(td("s td 0 0 0\n").validate(&empty), Ok(0));
        assert_eq!(TreeDecomposition::default().validate(&empty), Ok(0));
        assert_eq!(
            td("s td 0 0 3\n").validate(&path_graph()),
            Err(Violation::MissingNode(String::from("1")))
        );
    }

    #[test]
    fn edgeless_graph_has_width_zero() {
        let mut graph = Graph::new("isolated");
        graph.add_node("a");
        graph.add_node("b");
        assert_eq!(td("s td 2 1 2\nb 1 1\nb 2 2\n1 2\n").validate(&graph), Ok(0));
    }

    #[test]
    fn width_ignores_root_choice() {
        let mut td = TreeDecomposition::default();
        let a = td.add_bag([0, 1].iter().copied().collect());
        let b = td.add_bag([1, 2].iter().copied().collect());
        td.add_edge(b, a);
        assert_eq!(td.validate(&path_graph()), Ok(1));
        assert_eq!(td.width(), 1);
    }
}
