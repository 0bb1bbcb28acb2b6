//! Batch treewidth computation over a corpus of network topologies.
//!
//! Every graph is handed to an external PACE 2017 tree-decomposition solver,
//! the returned decomposition is parsed and validated against the graph, and
//! one record per graph is persisted below the experiment's `output/`
//! directory so that interrupted batches resume where they stopped.

pub mod batch;
pub mod error;
pub mod graph;
pub mod home;
pub mod io;
pub mod logging;
pub mod runner;
pub mod signals;
pub mod store;
pub mod timeout;
pub mod tree_decomposition;

pub use batch::{BatchConfig, BatchOrchestrator, BatchSummary, ItemState};
pub use home::ExperimentHome;
pub use runner::{DecompositionSolver, ExternalSolver, ProcessStatus, RawSolverOutput};
pub use store::{ResultStore, RunRecord, RunStatus};
pub use tree_decomposition::{TreeDecomposition, Violation};
