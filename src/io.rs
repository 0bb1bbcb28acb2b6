//! PACE 2017 text formats: `p tw` graphs going to the solver and
//! `s td` tree decompositions coming back.

use crate::error::{ParseError, ParseErrorKind};
use crate::graph::Graph;
use crate::tree_decomposition::TreeDecomposition;
use fxhash::{FxHashMap, FxHashSet};
use std::convert::TryFrom;
use std::io::{self, BufRead, Write};

fn invalid_input(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn nums(line: &str) -> Option<(usize, usize)> {
    let mut it = line.split_whitespace().map(|s| s.parse::<usize>());
    match (it.next(), it.next(), it.next()) {
        (Some(Ok(u)), Some(Ok(v)), None) => Some((u, v)),
        _ => None,
    }
}

/// Parses `p tw <n> <m>`.
pub fn pace_p(line: &str) -> Result<(usize, usize), io::Error> {
    let rest = line
        .trim()
        .strip_prefix('p')
        .map(str::trim_start)
        .and_then(|l| l.strip_prefix("tw"))
        .ok_or_else(|| invalid_input("Invalid problem line"))?;
    nums(rest).ok_or_else(|| invalid_input("Invalid problem line"))
}

/// Parses a 1-based edge line `<u> <v>` into 0-based indices.
pub fn pace_e(line: &str) -> Result<(usize, usize), io::Error> {
    match nums(line) {
        Some((u, v)) if u > 0 && v > 0 => Ok((u - 1, v - 1)),
        _ => Err(invalid_input("Invalid edge line")),
    }
}

/// Reads a PACE `.gr` graph. Nodes are labelled `1..=n`.
pub struct PaceReader<T: BufRead>(pub T);

impl<T: BufRead> TryFrom<PaceReader<T>> for Graph {
    type Error = io::Error;

    fn try_from(reader: PaceReader<T>) -> Result<Self, Self::Error> {
        let reader = reader.0;
        let mut graph: Option<Graph> = None;
        for line in reader.lines() {
            let line = line?;
            match line.trim_start().chars().next() {
                None | Some('c') => {}
                Some('p') => {
                    if graph.is_some() {
                        return Err(invalid_input("Duplicate problem line"));
                    }
                    let (n, _) = pace_p(&line)?;
                    let mut g = Graph::new("");
                    for v in 1..=n {
                        g.add_node(&v.to_string());
                    }
                    graph = Some(g);
                }
                _ => {
                    let g = graph
                        .as_mut()
                        .ok_or_else(|| invalid_input("Edge before problem line"))?;
                    let (u, v) = pace_e(&line)?;
                    if u >= g.order() || v >= g.order() {
                        return Err(invalid_input("Edge references unknown vertex"));
                    }
                    if u != v {
                        g.add_edge(u, v);
                    }
                }
            }
        }
        graph.ok_or_else(|| invalid_input("Missing problem line"))
    }
}

/// Writes `graph` in the solver input format: `p tw <n> <m>` followed by
/// one sorted 1-based edge per line.
pub fn write_graph<W: Write>(graph: &Graph, mut writer: W) -> io::Result<()> {
    writeln!(writer, "p tw {} {}", graph.order(), graph.size())?;
    for (u, v) in graph.edges() {
        writeln!(writer, "{} {}", u + 1, v + 1)?;
    }
    writer.flush()
}

/// Serializes a tree decomposition in `s td` format.
pub struct PaceWriter<'a, W: Write> {
    td: &'a TreeDecomposition,
    vertex_count: usize,
    writer: W,
}

impl<'a, W: Write> PaceWriter<'a, W> {
    pub fn new(td: &'a TreeDecomposition, vertex_count: usize, writer: W) -> Self {
        Self {
            td,
            vertex_count,
            writer,
        }
    }

    pub fn output(mut self) -> io::Result<()> {
        let bags = self.td.bags();
        writeln!(
            self.writer,
            "s td {} {} {}",
            bags.len(),
            self.td.max_bag_size(),
            self.vertex_count
        )?;
        for bag in bags {
            let mut vertices: Vec<usize> = bag.vertex_set.iter().map(|v| v + 1).collect();
            vertices.sort_unstable();
            write!(self.writer, "b {}", bag.id + 1)?;
            for v in vertices {
                write!(self.writer, " {}", v)?;
            }
            writeln!(self.writer)?;
        }
        for (a, b) in self.td.tree_edges() {
            writeln!(self.writer, "{} {}", a + 1, b + 1)?;
        }
        self.writer.flush()
    }
}

/// Values of the `s td <bags> <width+1> <vertices>` header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TdHeader {
    pub bags: usize,
    pub max_bag_size: usize,
    pub vertices: usize,
}

fn parse_header(tokens: &[&str]) -> Option<TdHeader> {
    if tokens.len() != 5 || tokens[1] != "td" {
        return None;
    }
    let bags = tokens[2].parse().ok()?;
    let max_bag_size = tokens[3].parse().ok()?;
    let vertices = tokens[4].parse().ok()?;
    Some(TdHeader {
        bags,
        max_bag_size,
        vertices,
    })
}

/// Strict parser for solver output.
///
/// Vertex indices are only checked to be positive integers here; whether
/// they exist in the graph is decided by [`TreeDecomposition::validate`].
pub fn parse_tree_decomposition(text: &str) -> Result<TreeDecomposition, ParseError> {
    use ParseErrorKind::*;

    let mut header: Option<TdHeader> = None;
    // keyed by 0-based id; the declared count is only a bound, never an allocation size
    let mut bags: FxHashMap<usize, FxHashSet<usize>> = FxHashMap::default();
    let mut declared = 0;
    let mut edges: Vec<(usize, usize)> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let err = |kind, msg: &str| ParseError::new(kind, line_no, line, msg);
        match tokens.first() {
            None => continue,
            Some(&"c") => continue,
            Some(&"s") => {
                if header.is_some() {
                    return Err(err(DuplicateHeader, "second `s td` line"));
                }
                let h = parse_header(&tokens)
                    .ok_or_else(|| err(MalformedHeader, "expected `s td <bags> <width+1> <vertices>`"))?;
                declared = h.bags;
                header = Some(h);
            }
            Some(_) if header.is_none() => {
                return Err(err(MissingHeader, "expected `s td` header before content"));
            }
            Some(&"b") => {
                let id: usize = tokens
                    .get(1)
                    .and_then(|t| t.parse().ok())
                    .ok_or_else(|| err(MalformedBag, "expected `b <id> <vertices>`"))?;
                if id == 0 || id > declared {
                    return Err(err(BagOutOfRange, &format!("bag {} not in 1..={}", id, declared)));
                }
                if bags.contains_key(&(id - 1)) {
                    return Err(err(DuplicateBag, &format!("bag {} declared twice", id)));
                }
                let mut vertex_set = FxHashSet::default();
                for t in &tokens[2..] {
                    match t.parse::<usize>() {
                        Ok(v) if v > 0 => {
                            vertex_set.insert(v - 1);
                        }
                        _ => return Err(err(MalformedVertex, &format!("`{}` is not a vertex index", t))),
                    }
                }
                if vertex_set.is_empty() {
                    return Err(err(EmptyBag, &format!("bag {} has no vertices", id)));
                }
                bags.insert(id - 1, vertex_set);
            }
            Some(_) => {
                let (a, b) = match (tokens.len(), tokens[0].parse::<usize>(), tokens.get(1).map(|t| t.parse::<usize>())) {
                    (2, Ok(a), Some(Ok(b))) => (a, b),
                    _ => return Err(err(MalformedTreeEdge, "expected `<bag> <bag>`")),
                };
                for x in &[a, b] {
                    if *x == 0 || *x > declared {
                        return Err(err(TreeEdgeOutOfRange, &format!("bag {} not in 1..={}", x, declared)));
                    }
                }
                if a == b {
                    return Err(err(SelfLoop, &format!("bag {}", a)));
                }
                edges.push((a - 1, b - 1));
            }
        }
    }

    let header = header.ok_or_else(|| ParseError::new(MissingHeader, 0, "", "no `s td` line"))?;
    let found = bags.len();
    if found != header.bags {
        return Err(ParseError::new(
            BagCountMismatch,
            0,
            "",
            &format!("declared {} bags, found {}", header.bags, found),
        ));
    }

    let mut td = TreeDecomposition::with_header(header);
    // ids are unique and within 1..=declared, so with the count matching they are exactly 0..found
    let mut bags: Vec<(usize, FxHashSet<usize>)> = bags.into_iter().collect();
    bags.sort_unstable_by_key(|(id, _)| *id);
    for (_, vertex_set) in bags {
        td.add_bag(vertex_set);
    }
    for (a, b) in edges {
        td.add_edge(a, b);
    }
    Ok(td)
}
