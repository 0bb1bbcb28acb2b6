use crate::error::{BatchError, ConfigurationError, StoreError};
use crate::graph::Graph;
use crate::io::parse_tree_decomposition;
use crate::runner::{DecompositionSolver, ProcessStatus, RawSolverOutput};
use crate::signals::received_ctrl_c;
use crate::store::{ResultStore, RunRecord, RunStatus, StoreSummary};
use chrono::Utc;
use fxhash::FxHashSet;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub timeout: Duration,
    /// Number of graphs processed concurrently. At least one.
    pub workers: usize,
    /// Only `success` records count as done; everything else is recomputed.
    pub retry_failed: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3600),
            workers: 1,
            retry_failed: false,
        }
    }
}

/// Final state of one graph in a batch.
///
/// Every graph starts `Pending` and is `Running` while its pipeline executes;
/// only the terminal states below are reported.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemState {
    /// A record was persisted; carries its status.
    Completed(RunStatus),
    /// The solver could not be run. Nothing was persisted.
    Failed(String),
    TimedOut,
    Skipped,
    /// The batch was interrupted while this graph was running. Nothing was persisted.
    Interrupted,
}

/// Per-run report; the persisted state is summarized by [`StoreSummary`].
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub skipped: usize,
    pub successes: usize,
    pub solver_failures: usize,
    pub timeouts: usize,
    pub invalid: usize,
    pub infra_failures: usize,
    /// Graphs not processed because the batch was interrupted.
    pub not_started: usize,
    pub interrupted: bool,
    /// (graph id, what went wrong) for every non-successful graph.
    pub failures: Vec<(String, String)>,
    pub store: StoreSummary,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "graphs in corpus:      {}", self.total)?;
        writeln!(f, "skipped (already done): {}", self.skipped)?;
        writeln!(f, "success:               {}", self.successes)?;
        writeln!(f, "solver-failure:        {}", self.solver_failures)?;
        writeln!(f, "timeout:               {}", self.timeouts)?;
        writeln!(f, "invalid-decomposition: {}", self.invalid)?;
        writeln!(f, "failed to run:         {}", self.infra_failures)?;
        if self.interrupted {
            writeln!(f, "interrupted; {} graph(s) not started", self.not_started)?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "failures:")?;
            for (graph_id, reason) in &self.failures {
                writeln!(f, "  {}: {}", graph_id, reason)?;
            }
        }
        write!(f, "{}", self.store)
    }
}

/// Drives solver, parser, validator and store over a corpus.
pub struct BatchOrchestrator<'a> {
    store: &'a ResultStore,
    solver: Option<&'a dyn DecompositionSolver>,
    config: BatchConfig,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(store: &'a ResultStore, config: BatchConfig) -> Self {
        Self {
            store,
            solver: None,
            config,
        }
    }

    pub fn solver(mut self, solver: &'a dyn DecompositionSolver) -> Self {
        self.solver = Some(solver);
        self
    }

    fn is_done(&self, graph_id: &str) -> bool {
        match self.store.get(graph_id) {
            None => false,
            Some(record) => !self.config.retry_failed || record.status == RunStatus::Success,
        }
    }

    /// Graphs that still need a solver run. Of several graphs sharing an id
    /// only the first is kept, so no two workers ever write the same record.
    pub fn pending<'g>(&self, graphs: &'g [Graph]) -> Vec<&'g Graph> {
        let mut claimed: FxHashSet<&str> = FxHashSet::default();
        graphs
            .iter()
            .filter(|g| !self.is_done(g.id()) && claimed.insert(g.id()))
            .collect()
    }

    /// Runs every pending graph and summarizes the outcome.
    ///
    /// Per-graph failures are recorded, not returned. Only a missing solver
    /// (checked before anything runs) and store failures abort the batch.
    pub fn run_all(&self, graphs: &[Graph]) -> Result<BatchSummary, BatchError> {
        let pending = self.pending(graphs);
        let mut summary = BatchSummary {
            total: graphs.len(),
            skipped: graphs.len() - pending.len(),
            ..BatchSummary::default()
        };
        info!(
            "{} graphs, {} already done, {} to compute",
            graphs.len(),
            summary.skipped,
            pending.len()
        );
        if pending.is_empty() {
            summary.store = self.store.summary();
            return Ok(summary);
        }
        let solver = self
            .solver
            .ok_or_else(|| ConfigurationError::MissingSolver(pending.len()))?;

        let queue = Mutex::new(pending.into_iter());
        let results: Mutex<Vec<(String, ItemState)>> = Mutex::new(Vec::new());
        let fatal: Mutex<Option<StoreError>> = Mutex::new(None);
        let abort = AtomicBool::new(false);
        let workers = self.config.workers.max(1);

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    if abort.load(Ordering::SeqCst) || received_ctrl_c() {
                        break;
                    }
                    let next = match queue.lock() {
                        Ok(mut queue) => queue.next(),
                        Err(_) => break,
                    };
                    let graph = match next {
                        Some(graph) => graph,
                        None => break,
                    };
                    match self.process(solver, graph) {
                        Ok(state) => {
                            if let Ok(mut results) = results.lock() {
                                results.push((String::from(graph.id()), state));
                            }
                        }
                        Err(e) => {
                            error!("store failure on {}: {}", graph.id(), e);
                            abort.store(true, Ordering::SeqCst);
                            if let Ok(mut fatal) = fatal.lock() {
                                fatal.get_or_insert(e);
                            }
                            break;
                        }
                    }
                });
            }
        });

        if let Some(e) = fatal.into_inner().ok().flatten() {
            return Err(e.into());
        }

        let results = results.into_inner().unwrap_or_default();
        let remaining = queue.into_inner().map(|q| q.count()).unwrap_or(0);
        for (graph_id, state) in results {
            match state {
                ItemState::Completed(RunStatus::Success) => summary.successes += 1,
                ItemState::Completed(status) => {
                    match status {
                        RunStatus::SolverFailure => summary.solver_failures += 1,
                        RunStatus::Timeout => summary.timeouts += 1,
                        _ => summary.invalid += 1,
                    }
                    let detail = self
                        .store
                        .get(&graph_id)
                        .and_then(|r| r.detail)
                        .unwrap_or_else(|| status.to_string());
                    summary.failures.push((graph_id, format!("{}: {}", status, detail)));
                }
                ItemState::TimedOut => {
                    summary.timeouts += 1;
                    summary.failures.push((graph_id, RunStatus::Timeout.to_string()));
                }
                ItemState::Failed(reason) => {
                    summary.infra_failures += 1;
                    summary.failures.push((graph_id, reason));
                }
                ItemState::Interrupted => {
                    summary.interrupted = true;
                    summary.not_started += 1;
                }
                ItemState::Skipped => summary.skipped += 1,
            }
        }
        if remaining > 0 || received_ctrl_c() {
            summary.interrupted = true;
            summary.not_started += remaining;
        }
        summary.failures.sort();
        summary.store = self.store.summary();
        Ok(summary)
    }

    /// Pipeline for one graph: run, parse, validate, persist.
    pub fn process(
        &self,
        solver: &dyn DecompositionSolver,
        graph: &Graph,
    ) -> Result<ItemState, StoreError> {
        // callers outside run_all may hand in graphs that are already done
        if self.is_done(graph.id()) {
            return Ok(ItemState::Skipped);
        }
        debug!("{}: pending -> running", graph.id());
        let raw = match solver.solve(graph, self.config.timeout) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{}: cannot run solver: {}", graph.id(), e);
                self.store
                    .append_log(graph.id(), &format!("[{}] cannot run solver: {}", Utc::now(), e));
                return Ok(ItemState::Failed(e.to_string()));
            }
        };
        self.store.append_log(graph.id(), &log_entry(graph, &raw));

        let (status, width, detail) = match raw.status {
            ProcessStatus::Interrupted => return Ok(ItemState::Interrupted),
            ProcessStatus::TimedOut => (
                RunStatus::Timeout,
                None,
                Some(format!("no result within {}s", self.config.timeout.as_secs_f64())),
            ),
            ProcessStatus::Finished if !raw.succeeded() => (
                RunStatus::SolverFailure,
                None,
                Some(match raw.exit_code {
                    Some(code) => format!("solver exited with code {}", code),
                    None => String::from("solver killed by a signal"),
                }),
            ),
            ProcessStatus::Finished => match check(graph, &raw.stdout) {
                Ok(width) => (RunStatus::Success, Some(width), None),
                Err(reason) => {
                    self.store.append_log(
                        graph.id(),
                        &format!("invalid decomposition: {}\n--- solver output ---\n{}", reason, raw.stdout),
                    );
                    (RunStatus::InvalidDecomposition, None, Some(reason))
                }
            },
        };

        match status {
            RunStatus::Success => info!(
                "returned tree decomposition of width {} for graph {} is valid",
                width.unwrap_or_default(),
                graph.id()
            ),
            _ => warn!("{}: {}", graph.id(), detail.as_deref().unwrap_or("")),
        }

        let record = RunRecord {
            graph_id: String::from(graph.id()),
            status,
            width,
            elapsed_secs: raw.elapsed.as_secs_f64(),
            exit_code: raw.exit_code,
            timestamp: Utc::now(),
            nodes: graph.order(),
            edges: graph.size(),
            detail,
        };
        self.store.save(&record)?;
        Ok(match status {
            RunStatus::Timeout => ItemState::TimedOut,
            other => ItemState::Completed(other),
        })
    }
}

/// Parses and validates solver output, returning the width or a description
/// of why the output is not a valid decomposition of `graph`.
fn check(graph: &Graph, stdout: &str) -> Result<usize, String> {
    let td = parse_tree_decomposition(stdout).map_err(|e| format!("parse error: {}", e))?;
    td.validate(graph).map_err(|v| v.to_string())
}

fn log_entry(graph: &Graph, raw: &RawSolverOutput) -> String {
    format!(
        "[{}] graph {} ({} nodes, {} edges): {:?}, exit code {:?}, {:.3}s\n--- stderr ---\n{}",
        Utc::now(),
        graph.id(),
        graph.order(),
        graph.size(),
        raw.status,
        raw.exit_code,
        raw.elapsed.as_secs_f64(),
        raw.stderr
    )
}
