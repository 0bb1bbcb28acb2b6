use crate::error::RunnerInfraError;
use crate::graph::Graph;
use crate::io::write_graph;
use crate::signals::received_ctrl_c;
use crate::timeout::Deadline;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::process::CommandExt;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    /// The process exited on its own; see `exit_code`.
    Finished,
    TimedOut,
    /// Killed because the batch was interrupted.
    Interrupted,
}

/// Everything a single solver invocation produced.
#[derive(Debug, Clone)]
pub struct RawSolverOutput {
    pub status: ProcessStatus,
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl RawSolverOutput {
    pub fn succeeded(&self) -> bool {
        self.status == ProcessStatus::Finished && self.exit_code == Some(0)
    }
}

/// Graph in, raw decomposition text out, bounded by a timeout.
///
/// Non-zero exits and timeouts are data, not errors; only failing to run the
/// solver at all is an `Err`.
pub trait DecompositionSolver: Send + Sync {
    fn solve(&self, graph: &Graph, timeout: Duration) -> Result<RawSolverOutput, RunnerInfraError>;
}

/// Runs an external PACE solver executable reading the graph on stdin.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    executable: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ExternalSolver {
    pub fn new<P: AsRef<Path>>(executable: P) -> Self {
        Self {
            executable: executable.as_ref().to_path_buf(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    pub fn args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Directory the solver is started in. Defaults to the directory holding
    /// the executable.
    pub fn working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn resolve_executable(&self) -> Result<PathBuf, RunnerInfraError> {
        let path = fs::canonicalize(&self.executable).map_err(|source| RunnerInfraError::NotFound {
            path: self.executable.clone(),
            source,
        })?;
        if !path.is_file() {
            return Err(RunnerInfraError::NotAFile(path));
        }
        Ok(path)
    }

    fn wait(
        &self,
        child: &mut Child,
        deadline: &Deadline,
    ) -> Result<(ProcessStatus, Option<i32>), RunnerInfraError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    // helpers the solver left running in its group die with it
                    kill_group(child);
                    return Ok((ProcessStatus::Finished, status.code()));
                }
                Ok(None) if deadline.expired() => {
                    terminate(child);
                    return Ok((ProcessStatus::TimedOut, None));
                }
                Ok(None) if received_ctrl_c() => {
                    terminate(child);
                    return Ok((ProcessStatus::Interrupted, None));
                }
                Ok(None) => deadline.nap(POLL_INTERVAL),
                Err(e) => {
                    terminate(child);
                    return Err(RunnerInfraError::Wait(e));
                }
            }
        }
    }
}

impl DecompositionSolver for ExternalSolver {
    fn solve(&self, graph: &Graph, timeout: Duration) -> Result<RawSolverOutput, RunnerInfraError> {
        let executable = self.resolve_executable()?;
        let scratch = tempfile::Builder::new()
            .prefix("treewidth-")
            .tempdir()
            .map_err(RunnerInfraError::Workspace)?;
        let input_path = scratch.path().join("input.gr");
        let stdout_path = scratch.path().join("stdout.td");
        let stderr_path = scratch.path().join("stderr.log");

        let input = File::create(&input_path).map_err(RunnerInfraError::Workspace)?;
        write_graph(graph, BufWriter::new(input)).map_err(RunnerInfraError::Workspace)?;
        let stdin = File::open(&input_path).map_err(RunnerInfraError::Workspace)?;
        let stdout = File::create(&stdout_path).map_err(RunnerInfraError::Workspace)?;
        let stderr = File::create(&stderr_path).map_err(RunnerInfraError::Workspace)?;

        let working_dir = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => executable
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| scratch.path().to_path_buf()),
        };

        let mut command = Command::new(&executable);
        command
            .args(&self.args)
            .current_dir(&working_dir)
            .stdin(Stdio::from(stdin))
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        command.process_group(0);

        info!(
            "starting {} on graph {} ({} nodes, {} edges)",
            executable.display(),
            graph.id(),
            graph.order(),
            graph.size()
        );
        let deadline = Deadline::start(timeout);
        let mut child = command.spawn().map_err(|source| RunnerInfraError::Launch {
            path: executable.clone(),
            source,
        })?;
        let (status, exit_code) = self.wait(&mut child, &deadline)?;
        let elapsed = deadline.elapsed();

        match status {
            ProcessStatus::Finished => debug!(
                "solver on {} exited with {:?} after {:.3}s",
                graph.id(),
                exit_code,
                elapsed.as_secs_f64()
            ),
            ProcessStatus::TimedOut => warn!(
                "solver on {} timed out after {:.3}s; killed",
                graph.id(),
                elapsed.as_secs_f64()
            ),
            ProcessStatus::Interrupted => warn!("solver on {} interrupted; killed", graph.id()),
        }

        Ok(RawSolverOutput {
            status,
            exit_code,
            stdout: read_lossy(&stdout_path),
            stderr: read_lossy(&stderr_path),
            elapsed,
        })
    }
}

fn read_lossy(path: &Path) -> String {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!("cannot read {}: {}", path.display(), e);
            String::new()
        }
    }
}

/// SIGKILLs every process in the child's group. The child leads its own
/// group (`process_group(0)`), so the group id is its pid.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let pgid = child.id() as libc::pid_t;
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Kills the child's whole process group and reaps the child.
fn terminate(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
    let _ = child.wait();
}
