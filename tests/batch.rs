#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use topologyzoo_treewidth::graph::{GraphDirectory, GraphSource};
use topologyzoo_treewidth::{
    BatchConfig, BatchOrchestrator, ExperimentHome, ExternalSolver, ResultStore, RunStatus,
};

/// Answers every graph with a single bag holding all of its vertices.
const ONE_BAG_SOLVER: &str = r#"#!/bin/sh
read p tw n m
printf 's td 1 %s %s\nb 1' "$n" "$n"
i=1
while [ "$i" -le "$n" ]; do
  printf ' %s' "$i"
  i=$((i + 1))
done
printf '\n'
"#;

fn write_solver(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("solver.sh");
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn write_corpus(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("Triangle.gml"),
        "graph [ node [ id 0 ] node [ id 1 ] node [ id 2 ]
           edge [ source 0 target 1 ] edge [ source 1 target 2 ] edge [ source 2 target 0 ] ]",
    )
    .unwrap();
    fs::write(
        dir.join("Link.gml"),
        "graph [ multigraph 1 node [ id 0 ] node [ id 1 ]
           edge [ source 0 target 1 ] edge [ source 1 target 0 ] ]",
    )
    .unwrap();
    fs::write(dir.join("Broken.gml"), "graph [ node [ id 0 ]").unwrap();
}

#[test]
fn computes_corpus_and_resumes() {
    let scratch = tempfile::tempdir().unwrap();
    let corpus = scratch.path().join("topologyZoo");
    write_corpus(&corpus);
    let solver = ExternalSolver::new(write_solver(scratch.path(), ONE_BAG_SOLVER));
    let home = ExperimentHome::resolve_from(Some(scratch.path()), Path::new("/")).unwrap();

    let graphs = GraphDirectory::new(&corpus).graphs().unwrap();
    assert_eq!(graphs.len(), 2);

    let store = ResultStore::open(&home).unwrap();
    let config = BatchConfig {
        timeout: Duration::from_secs(30),
        ..BatchConfig::default()
    };
    let summary = BatchOrchestrator::new(&store, config.clone())
        .solver(&solver)
        .run_all(&graphs)
        .unwrap();
    assert_eq!(summary.successes, 2);

    let triangle = store.get("Triangle").unwrap();
    assert_eq!(triangle.status, RunStatus::Success);
    assert_eq!(triangle.width, Some(2));
    assert_eq!((triangle.nodes, triangle.edges), (3, 3));
    assert_eq!(store.get("Link").unwrap().width, Some(1));

    let table = fs::read_to_string(store.write_table(&graphs).unwrap()).unwrap();
    let rows: Vec<Vec<&str>> = table
        .lines()
        .skip(1)
        .map(|l| l.split_whitespace().collect())
        .collect();
    assert_eq!(rows, vec![vec!["Link", "2", "1", "1"], vec!["Triangle", "3", "3", "2"]]);

    // a fresh store over the same home sees the records and runs nothing
    let reopened = ResultStore::open(&home).unwrap();
    let summary = BatchOrchestrator::new(&reopened, config).run_all(&graphs).unwrap();
    assert_eq!(summary.skipped, 2);
    let statuses = |store: &ResultStore| -> Vec<(String, RunStatus, Option<usize>)> {
        store
            .records()
            .into_iter()
            .map(|r| (r.graph_id, r.status, r.width))
            .collect()
    };
    assert_eq!(statuses(&reopened), statuses(&store));
}

#[test]
fn lying_solver_is_recorded_as_invalid() {
    let scratch = tempfile::tempdir().unwrap();
    let corpus = scratch.path().join("corpus");
    write_corpus(&corpus);
    // claims a single bag holding only the first vertex
    let solver = ExternalSolver::new(write_solver(
        scratch.path(),
        "#!/bin/sh\nread p tw n m\nprintf 's td 1 1 %s\\nb 1 1\\n' \"$n\"\n",
    ));
    let home = ExperimentHome::resolve_from(Some(scratch.path()), Path::new("/")).unwrap();
    let store = ResultStore::open(&home).unwrap();
    let graphs = GraphDirectory::new(&corpus).graphs().unwrap();

    let summary = BatchOrchestrator::new(&store, BatchConfig::default())
        .solver(&solver)
        .run_all(&graphs)
        .unwrap();
    assert_eq!(summary.invalid, 2);
    let record = store.get("Triangle").unwrap();
    assert_eq!(record.status, RunStatus::InvalidDecomposition);
    assert_eq!(record.width, None);
    assert!(record.detail.unwrap().contains("not contained in any bag"));
}

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use std::process::Command;

    fn binary() -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_topologyzoo-treewidth"));
        command
            .env_remove("SOLVER_EXECUTABLE_PATH")
            .env_remove("EXPERIMENT_HOME")
            .env_remove("TOPOLOGY_ZOO_DIR");
        command
    }

    #[test]
    fn end_to_end() {
        let scratch = tempfile::tempdir().unwrap();
        let corpus = scratch.path().join("corpus");
        write_corpus(&corpus);
        let solver = write_solver(scratch.path(), ONE_BAG_SOLVER);

        let status = binary()
            .arg("compute-topologyzoo-treewidths")
            .arg("--corpus")
            .arg(&corpus)
            .arg("--experiment-home")
            .arg(scratch.path())
            .env("SOLVER_EXECUTABLE_PATH", &solver)
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(0));
        assert!(scratch.path().join("output/Triangle.json").is_file());
        assert!(scratch.path().join("output/topologyzoo_treewidths.txt").is_file());
        assert!(scratch
            .path()
            .join("log/compute_topologyzoo_treewidths.log")
            .is_file());

        // everything done: no solver needed any more
        let status = binary()
            .arg("compute-topologyzoo-treewidths")
            .arg("--corpus")
            .arg(&corpus)
            .arg("--experiment-home")
            .arg(scratch.path())
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(0));
    }

    #[test]
    fn missing_solver_is_a_configuration_error() {
        let scratch = tempfile::tempdir().unwrap();
        let corpus = scratch.path().join("corpus");
        write_corpus(&corpus);
        let status = binary()
            .arg("compute-topologyzoo-treewidths")
            .arg("--corpus")
            .arg(&corpus)
            .env("EXPERIMENT_HOME", scratch.path())
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(2));
    }

    #[test]
    fn unusable_experiment_home_is_a_configuration_error() {
        let scratch = tempfile::tempdir().unwrap();
        let status = binary()
            .arg("compute-topologyzoo-treewidths")
            .arg("--experiment-home")
            .arg(scratch.path().join("missing"))
            .status()
            .unwrap();
        assert_eq!(status.code(), Some(2));
    }
}
