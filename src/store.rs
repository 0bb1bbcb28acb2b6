//! Persistent per-graph results under `output/` and diagnostics under `log/`.
//!
//! One JSON file per graph id. Files are written to a temporary name and
//! renamed into place, so a record is either complete or absent.

use crate::error::StoreError;
use crate::graph::Graph;
use crate::home::ExperimentHome;
use chrono::{DateTime, Utc};
use fxhash::FxHashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const RECORD_EXTENSION: &str = "json";
const TMP_EXTENSION: &str = "tmp";
pub const TABLE_FILE: &str = "topologyzoo_treewidths.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    Success,
    SolverFailure,
    Timeout,
    InvalidDecomposition,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::SolverFailure => "solver-failure",
            Self::Timeout => "timeout",
            Self::InvalidDecomposition => "invalid-decomposition",
        };
        f.write_str(s)
    }
}

/// Outcome of one solver run on one graph. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub graph_id: String,
    pub status: RunStatus,
    /// Present iff `status` is `Success`.
    pub width: Option<usize>,
    pub elapsed_secs: f64,
    pub exit_code: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub nodes: usize,
    pub edges: usize,
    /// Parse error, violation or failure context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregate over all persisted records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub successes: usize,
    pub solver_failures: usize,
    pub timeouts: usize,
    pub invalid: usize,
    /// width -> number of graphs
    pub widths: BTreeMap<usize, usize>,
}

impl StoreSummary {
    pub fn total(&self) -> usize {
        self.successes + self.solver_failures + self.timeouts + self.invalid
    }
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "stored results: {}", self.total())?;
        writeln!(f, "  success:               {}", self.successes)?;
        writeln!(f, "  solver-failure:        {}", self.solver_failures)?;
        writeln!(f, "  timeout:               {}", self.timeouts)?;
        writeln!(f, "  invalid-decomposition: {}", self.invalid)?;
        if !self.widths.is_empty() {
            writeln!(f, "  width distribution:")?;
            for (width, count) in &self.widths {
                writeln!(f, "    {:>4}: {}", width, count)?;
            }
        }
        Ok(())
    }
}

/// File-backed map graph id -> [`RunRecord`], with an in-memory index so
/// that saves are visible to later lookups within the same batch.
pub struct ResultStore {
    output: PathBuf,
    log: PathBuf,
    index: Mutex<FxHashMap<String, RunRecord>>,
}

/// Turns a graph id into a file name stem.
/// File name stem for a graph id. ASCII letters, digits, `-` and `.` are
/// kept; every other byte becomes `_XX` (upper-case hex), so distinct ids
/// never share a file.
fn file_stem(graph_id: &str) -> String {
    let mut stem = String::with_capacity(graph_id.len());
    for byte in graph_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("_{:02X}", byte));
        }
    }
    stem
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Writes `bytes` to `path` via a sibling temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension(TMP_EXTENSION);
    let mut file = File::create(&tmp).map_err(io_err(&tmp))?;
    file.write_all(bytes).map_err(io_err(&tmp))?;
    file.sync_all().map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(io_err(path))?;
    Ok(())
}

impl ResultStore {
    /// Opens the store in `home`, loading every complete record and removing
    /// temporary files left behind by an interrupted run.
    pub fn open(home: &ExperimentHome) -> Result<Self, StoreError> {
        let output = home.output_dir().to_path_buf();
        let log = home.log_dir().to_path_buf();
        let mut index = FxHashMap::default();

        for entry in fs::read_dir(&output).map_err(io_err(&output))? {
            let path = entry.map_err(io_err(&output))?.path();
            match path.extension().and_then(|e| e.to_str()) {
                Some(TMP_EXTENSION) => {
                    warn!("removing incomplete record {}", path.display());
                    fs::remove_file(&path).map_err(io_err(&path))?;
                }
                Some(RECORD_EXTENSION) => {
                    let text = fs::read_to_string(&path).map_err(io_err(&path))?;
                    match serde_json::from_str::<RunRecord>(&text) {
                        Ok(record) => {
                            index.insert(record.graph_id.clone(), record);
                        }
                        Err(e) => warn!("ignoring unreadable record {}: {}", path.display(), e),
                    }
                }
                _ => {}
            }
        }
        info!("opened result store with {} records", index.len());
        Ok(Self {
            output,
            log,
            index: Mutex::new(index),
        })
    }

    fn index(&self) -> MutexGuard<'_, FxHashMap<String, RunRecord>> {
        // a panicking writer cannot leave a half-inserted record behind
        match self.index.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn record_path(&self, graph_id: &str) -> PathBuf {
        self.output
            .join(format!("{}.{}", file_stem(graph_id), RECORD_EXTENSION))
    }

    pub fn log_path(&self, graph_id: &str) -> PathBuf {
        self.log.join(format!("{}.log", file_stem(graph_id)))
    }

    pub fn has_result(&self, graph_id: &str) -> bool {
        self.index().contains_key(graph_id)
    }

    pub fn get(&self, graph_id: &str) -> Option<RunRecord> {
        self.index().get(graph_id).cloned()
    }

    /// All records, sorted by graph id.
    pub fn records(&self) -> Vec<RunRecord> {
        let mut records: Vec<RunRecord> = self.index().values().cloned().collect();
        records.sort_by(|a, b| a.graph_id.cmp(&b.graph_id));
        records
    }

    /// Persists `record` atomically. The index lock is held across the write,
    /// so concurrent saves never race on the same file.
    pub fn save(&self, record: &RunRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Serialize {
            graph_id: record.graph_id.clone(),
            source,
        })?;
        let path = self.record_path(&record.graph_id);
        let mut index = self.index();
        write_atomic(&path, &bytes)?;
        index.insert(record.graph_id.clone(), record.clone());
        debug!("saved {} as {}", record.graph_id, path.display());
        Ok(())
    }

    /// Appends diagnostics for `graph_id` to its log file. Best effort.
    pub fn append_log(&self, graph_id: &str, text: &str) {
        let path = self.log_path(graph_id);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| {
                file.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    file.write_all(b"\n")?;
                }
                Ok(())
            });
        if let Err(e) = result {
            warn!("cannot append to {}: {}", path.display(), e);
        }
    }

    pub fn summary(&self) -> StoreSummary {
        let mut summary = StoreSummary::default();
        for record in self.index().values() {
            match record.status {
                RunStatus::Success => {
                    summary.successes += 1;
                    if let Some(width) = record.width {
                        *summary.widths.entry(width).or_insert(0) += 1;
                    }
                }
                RunStatus::SolverFailure => summary.solver_failures += 1,
                RunStatus::Timeout => summary.timeouts += 1,
                RunStatus::InvalidDecomposition => summary.invalid += 1,
            }
        }
        summary
    }

    /// Writes the `graph_name nodes edges treewidth` table for every graph
    /// of `graphs` that has a record. Non-successful graphs show their status.
    pub fn write_table(&self, graphs: &[Graph]) -> Result<PathBuf, StoreError> {
        let mut rows: Vec<(String, usize, usize, String)> = {
            let index = self.index();
            graphs
                .iter()
                .filter_map(|g| index.get(g.id()))
                .map(|r| {
                    let width = match r.width {
                        Some(w) if r.status == RunStatus::Success => w.to_string(),
                        _ => r.status.to_string(),
                    };
                    (r.graph_id.clone(), r.nodes, r.edges, width)
                })
                .collect()
        };
        rows.sort();

        let mut text = format!(
            "#{:20}\t{:>10}\t{:>10}\t{:>10}\n",
            "graph_name", "nodes", "edges", "treewidth"
        );
        for (name, nodes, edges, width) in rows {
            text.push_str(&format!(
                "{:21}\t{:10}\t{:10}\t{:>10}\n",
                name, nodes, edges, width
            ));
        }
        let path = self.output.join(TABLE_FILE);
        write_atomic(&path, text.as_bytes())?;
        info!("wrote resulting treewidths to {}", path.display());
        Ok(path)
    }
}
