use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal to the whole run: nothing is attempted once one of these is raised.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("experiment home {0} exists but is not a directory")]
    NotADirectory(PathBuf),
    #[error("experiment home {0} does not exist")]
    MissingRoot(PathBuf),
    #[error("no directory containing both output/ and log/ found from {0} upwards; set EXPERIMENT_HOME")]
    HomeNotFound(PathBuf),
    #[error("SOLVER_EXECUTABLE_PATH is not set but {0} graph(s) need to be computed")]
    MissingSolver(usize),
    #[error("cannot prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// The solver could not be run at all. Fatal to a single graph only.
#[derive(Debug, Error)]
pub enum RunnerInfraError {
    #[error("solver executable {path} not found: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("solver executable {0} is not a file")]
    NotAFile(PathBuf),
    #[error("cannot prepare scratch directory: {0}")]
    Workspace(#[source] io::Error),
    #[error("cannot launch {path}: {source}")]
    Launch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("lost track of solver process: {0}")]
    Wait(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    MissingHeader,
    MalformedHeader,
    DuplicateHeader,
    MalformedBag,
    DuplicateBag,
    BagOutOfRange,
    EmptyBag,
    MalformedVertex,
    MalformedTreeEdge,
    TreeEdgeOutOfRange,
    SelfLoop,
    BagCountMismatch,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::MissingHeader => "missing header",
            Self::MalformedHeader => "malformed header",
            Self::DuplicateHeader => "duplicate header",
            Self::MalformedBag => "malformed bag line",
            Self::DuplicateBag => "duplicate bag id",
            Self::BagOutOfRange => "bag id out of range",
            Self::EmptyBag => "empty bag",
            Self::MalformedVertex => "malformed vertex index",
            Self::MalformedTreeEdge => "malformed tree edge",
            Self::TreeEdgeOutOfRange => "tree edge references unknown bag",
            Self::SelfLoop => "tree edge joins a bag to itself",
            Self::BagCountMismatch => "bag count mismatch",
        };
        f.write_str(s)
    }
}

/// Malformed solver output. `line` is 1-based; 0 means end of input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}: {msg} (`{content}`)")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub line: usize,
    pub content: String,
    pub msg: String,
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind, line: usize, content: &str, msg: &str) -> Self {
        Self {
            kind,
            line,
            content: String::from(content.trim()),
            msg: String::from(msg),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid corpus pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("{path}: {msg}")]
    Format { path: PathBuf, msg: String },
}

/// Result integrity can no longer be guaranteed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot serialize record for {graph_id}: {source}")]
    Serialize {
        graph_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
