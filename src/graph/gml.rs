//! Minimal reader for the GML files shipped with the Topology Zoo.
//!
//! Only the structure is interpreted: `node [ id .. ]` and
//! `edge [ source .. target .. ]` inside the top-level `graph [ .. ]`.
//! All other attributes are skipped.

use crate::graph::Graph;
use log::{debug, warn};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GmlError {
    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),
    #[error("unexpected `]` at byte {0}")]
    UnbalancedBracket(usize),
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("no top-level `graph [ ... ]` block")]
    MissingGraph,
    #[error("node without id")]
    NodeWithoutId,
    #[error("edge without source or target")]
    IncompleteEdge,
    #[error("edge references unknown node {0}")]
    UnknownNode(String),
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Open,
    Close,
    Word(&'a str),
    Str(&'a str),
}

#[derive(Debug)]
enum Value<'a> {
    Scalar(&'a str),
    List(Vec<(&'a str, Value<'a>)>),
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token<'_>)>, GmlError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'#' => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push((i, Token::Open));
                i += 1;
            }
            b']' => {
                tokens.push((i, Token::Close));
                i += 1;
            }
            b'"' => {
                let start = i + 1;
                let end = text[start..]
                    .find('"')
                    .ok_or(GmlError::UnterminatedString(i))?;
                tokens.push((i, Token::Str(&text[start..start + end])));
                i = start + end + 1;
            }
            _ => {
                let start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && bytes[i] != b'['
                    && bytes[i] != b']'
                {
                    i += 1;
                }
                tokens.push((start, Token::Word(&text[start..i])));
            }
        }
    }
    Ok(tokens)
}

fn parse_list<'a, I>(tokens: &mut I, nested: bool) -> Result<Vec<(&'a str, Value<'a>)>, GmlError>
where
    I: Iterator<Item = (usize, Token<'a>)>,
{
    let mut entries = Vec::new();
    loop {
        let key = match tokens.next() {
            None if nested => return Err(GmlError::UnexpectedEnd),
            None => return Ok(entries),
            Some((_, Token::Close)) if nested => return Ok(entries),
            Some((pos, Token::Close)) => return Err(GmlError::UnbalancedBracket(pos)),
            Some((_, Token::Word(key))) | Some((_, Token::Str(key))) => key,
            Some((_, Token::Open)) => {
                // keyless list; consume it to stay in sync
                parse_list(tokens, true)?;
                continue;
            }
        };
        let value = match tokens.next() {
            None => return Err(GmlError::UnexpectedEnd),
            Some((_, Token::Open)) => Value::List(parse_list(tokens, true)?),
            Some((pos, Token::Close)) => return Err(GmlError::UnbalancedBracket(pos)),
            Some((_, Token::Word(v))) | Some((_, Token::Str(v))) => Value::Scalar(v),
        };
        entries.push((key, value));
    }
}

fn scalar<'a>(entries: &[(&'a str, Value<'a>)], key: &str) -> Option<&'a str> {
    entries.iter().find_map(|(k, v)| match v {
        Value::Scalar(s) if *k == key => Some(*s),
        _ => None,
    })
}

/// Reads a GML document into a [`Graph`] named `id`. Directed graphs are
/// read as undirected; parallel edges are merged and self loops dropped.
pub fn read_gml(id: &str, text: &str) -> Result<Graph, GmlError> {
    let tokens = tokenize(text)?;
    let mut iter = tokens.into_iter();
    let top = parse_list(&mut iter, false)?;
    let body = top
        .iter()
        .find_map(|(k, v)| match v {
            Value::List(body) if *k == "graph" => Some(body),
            _ => None,
        })
        .ok_or(GmlError::MissingGraph)?;

    let mut graph = Graph::new(id);
    for (key, value) in body {
        if let (&"node", Value::List(attrs)) = (key, value) {
            let node = scalar(attrs, "id").ok_or(GmlError::NodeWithoutId)?;
            graph.add_node(node);
        }
    }

    let mut merged = 0;
    for (key, value) in body {
        if let (&"edge", Value::List(attrs)) = (key, value) {
            let source = scalar(attrs, "source").ok_or(GmlError::IncompleteEdge)?;
            let target = scalar(attrs, "target").ok_or(GmlError::IncompleteEdge)?;
            let u = graph
                .index_of(source)
                .ok_or_else(|| GmlError::UnknownNode(String::from(source)))?;
            let v = graph
                .index_of(target)
                .ok_or_else(|| GmlError::UnknownNode(String::from(target)))?;
            if u == v {
                warn!("{}: dropping self loop on node {}", id, source);
            } else if !graph.add_edge(u, v) {
                merged += 1;
            }
        }
    }
    if merged > 0 {
        warn!("{}: merged {} parallel edge(s)", id, merged);
    }
    debug!(
        "{}: read {} nodes and {} edges",
        id,
        graph.order(),
        graph.size()
    );
    Ok(graph)
}
