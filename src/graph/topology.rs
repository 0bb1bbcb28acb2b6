use fxhash::{FxHashMap, FxHashSet};

/// An undirected simple graph with stable, string-labelled nodes.
///
/// Nodes are addressed internally by their insertion index, which is also
/// the order used when the graph is handed to a solver (index + 1).
#[derive(Clone, Debug)]
pub struct Graph {
    id: String,
    labels: Vec<String>,
    index: FxHashMap<String, usize>,
    edges: FxHashSet<(usize, usize)>,
}

impl Graph {
    pub fn new(id: &str) -> Self {
        Self {
            id: String::from(id),
            labels: Vec::new(),
            index: FxHashMap::default(),
            edges: FxHashSet::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rename(&mut self, id: &str) {
        self.id = String::from(id);
    }

    /// Adds a node, returning its index. Re-adding a label returns the existing index.
    pub fn add_node(&mut self, label: &str) -> usize {
        if let Some(idx) = self.index.get(label) {
            return *idx;
        }
        let idx = self.labels.len();
        self.labels.push(String::from(label));
        self.index.insert(String::from(label), idx);
        idx
    }

    /// Adds an edge between two existing nodes. Returns false for self loops,
    /// duplicate edges and unknown nodes.
    pub fn add_edge(&mut self, u: usize, v: usize) -> bool {
        if u == v || u >= self.labels.len() || v >= self.labels.len() {
            return false;
        }
        self.edges.insert((u.min(v), u.max(v)))
    }

    pub fn order(&self) -> usize {
        self.labels.len()
    }

    pub fn size(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        0..self.labels.len()
    }

    /// Edges as `(u, v)` with `u < v`, sorted.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges: Vec<_> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        edges
    }

    /// Label of node `u`.
    ///
    /// # Panics
    ///
    /// If `u` is not a node, i.e. `u >= self.order()`. Indices from
    /// [`nodes`](Self::nodes), [`edges`](Self::edges) and
    /// [`index_of`](Self::index_of) are always in range.
    pub fn label(&self, u: usize) -> &str {
        &self.labels[u]
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index.get(label).copied()
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.labels == other.labels && self.edges == other.edges
    }
}

impl Eq for Graph {}
