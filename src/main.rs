use log::{error, info, warn, LevelFilter};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use structopt::StructOpt;
use topologyzoo_treewidth::error::BatchError;
use topologyzoo_treewidth::graph::{GraphDirectory, GraphSource};
use topologyzoo_treewidth::logging::build_run_logger;
use topologyzoo_treewidth::{
    BatchConfig, BatchOrchestrator, ExperimentHome, ExternalSolver, ResultStore,
};

const EXIT_IO: i32 = 1;
const EXIT_CONFIGURATION: i32 = 2;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "topologyzoo-treewidth",
    about = "Computes treewidths of the Topology Zoo networks with an external PACE solver."
)]
enum Command {
    /// Runs the solver on every graph of the corpus that has no result yet
    /// and writes output/topologyzoo_treewidths.txt.
    #[structopt(name = "compute-topologyzoo-treewidths")]
    ComputeTopologyzooTreewidths(ComputeOpt),
}

#[derive(Debug, StructOpt)]
struct ComputeOpt {
    /// PACE 2017 tree-decomposition solver. Only required while graphs are
    /// left to compute.
    #[structopt(long, env = "SOLVER_EXECUTABLE_PATH", parse(from_os_str))]
    solver: Option<PathBuf>,

    /// Extra argument passed to the solver. Repeatable.
    #[structopt(long = "solver-arg", number_of_values = 1, allow_hyphen_values = true)]
    solver_args: Vec<String>,

    /// Directory holding output/ and log/. Searched upwards from the current
    /// directory if not given.
    #[structopt(long, env = "EXPERIMENT_HOME", parse(from_os_str))]
    experiment_home: Option<PathBuf>,

    /// Directory of .gml (and .gr) graphs.
    #[structopt(
        long,
        env = "TOPOLOGY_ZOO_DIR",
        default_value = "data/topologyZoo",
        parse(from_os_str)
    )]
    corpus: PathBuf,

    /// Seconds the solver may spend on a single graph.
    #[structopt(long, default_value = "3600")]
    timeout: u64,

    /// Graphs solved concurrently.
    #[structopt(long, default_value = "1")]
    workers: usize,

    /// Recompute graphs whose stored result is not a success.
    #[structopt(long)]
    retry_failed: bool,
}

#[cfg(feature = "handle-ctrlc")]
fn install_interrupt_handler() {
    if let Err(e) = topologyzoo_treewidth::signals::initialize() {
        warn!("cannot install interrupt handler: {}", e);
    }
}

#[cfg(not(feature = "handle-ctrlc"))]
fn install_interrupt_handler() {}

fn compute(opt: ComputeOpt) -> i32 {
    let home = match ExperimentHome::resolve(opt.experiment_home.as_deref()) {
        Ok(home) => home,
        Err(e) => {
            eprintln!("error: {}", e);
            return EXIT_CONFIGURATION;
        }
    };
    build_run_logger(home.log_dir(), LevelFilter::Info);
    info!("experiment home: {}", home.root().display());

    install_interrupt_handler();

    let graphs = match GraphDirectory::new(&opt.corpus).graphs() {
        Ok(graphs) => graphs,
        Err(e) => {
            error!("cannot read corpus: {}", e);
            return EXIT_IO;
        }
    };
    let store = match ResultStore::open(&home) {
        Ok(store) => store,
        Err(e) => {
            error!("cannot open result store: {}", e);
            return EXIT_IO;
        }
    };

    let config = BatchConfig {
        timeout: Duration::from_secs(opt.timeout),
        workers: opt.workers.max(1),
        retry_failed: opt.retry_failed,
    };
    let solver_args = opt.solver_args;
    let solver = opt
        .solver
        .map(|path| ExternalSolver::new(path).args(solver_args));
    let mut orchestrator = BatchOrchestrator::new(&store, config);
    if let Some(solver) = &solver {
        info!("solver: {}", solver.executable().display());
        orchestrator = orchestrator.solver(solver);
    }

    let code = match orchestrator.run_all(&graphs) {
        Ok(summary) => {
            println!("{}", summary);
            0
        }
        Err(BatchError::Configuration(e)) => {
            error!("{}", e);
            return EXIT_CONFIGURATION;
        }
        Err(e @ BatchError::Store(_)) => {
            error!("{}", e);
            EXIT_IO
        }
    };

    // completed records are kept even when the batch aborted
    match store.write_table(&graphs) {
        Ok(_) => code,
        Err(e) => {
            error!("cannot write treewidth table: {}", e);
            EXIT_IO
        }
    }
}

fn main() {
    let code = match Command::from_args() {
        Command::ComputeTopologyzooTreewidths(opt) => compute(opt),
    };
    process::exit(code);
}
