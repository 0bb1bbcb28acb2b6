use criterion::{black_box, criterion_group, criterion_main, Criterion};
use topologyzoo_treewidth::graph::Graph;
use topologyzoo_treewidth::io::parse_tree_decomposition;

fn grid(k: usize) -> Graph {
    let mut graph = Graph::new("grid");
    for v in 0..k * k {
        graph.add_node(&v.to_string());
    }
    for r in 0..k {
        for c in 0..k {
            let v = r * k + c;
            if c + 1 < k {
                graph.add_edge(v, v + 1);
            }
            if r + 1 < k {
                graph.add_edge(v, v + k);
            }
        }
    }
    graph
}

/// Path decomposition of a k x k grid: windows of k + 1 consecutive nodes.
fn grid_decomposition(k: usize) -> String {
    let n = k * k;
    let bags = n - k;
    let mut text = format!("s td {} {} {}\n", bags, k + 1, n);
    for b in 0..bags {
        text.push_str(&format!("b {}", b + 1));
        for v in b..=b + k {
            text.push_str(&format!(" {}", v + 1));
        }
        text.push('\n');
    }
    for b in 1..bags {
        text.push_str(&format!("{} {}\n", b, b + 1));
    }
    text
}

fn validation(c: &mut Criterion) {
    let graph = grid(30);
    let text = grid_decomposition(30);
    let td = parse_tree_decomposition(&text).unwrap();
    assert_eq!(td.validate(&graph), Ok(30));

    c.bench_function("parse_grid_30", |b| {
        b.iter(|| parse_tree_decomposition(black_box(&text)))
    });
    c.bench_function("validate_grid_30", |b| {
        b.iter(|| black_box(&td).validate(&graph))
    });
}

criterion_group!(benches, validation);
criterion_main!(benches);
