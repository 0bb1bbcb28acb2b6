use crate::error::ConfigurationError;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const OUTPUT_DIR: &str = "output";
const LOG_DIR: &str = "log";
const MAX_ANCESTORS: usize = 100;

/// Root directory of an experiment together with its `output/` and `log/`
/// subdirectories. Resolved once at startup and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentHome {
    root: PathBuf,
    output: PathBuf,
    log: PathBuf,
}

impl ExperimentHome {
    fn at(root: PathBuf) -> Self {
        Self {
            output: root.join(OUTPUT_DIR),
            log: root.join(LOG_DIR),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    pub fn log_dir(&self) -> &Path {
        &self.log
    }

    /// Resolves the experiment home, searching upwards from the current
    /// working directory when no explicit path is given.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigurationError> {
        let cwd = std::env::current_dir().map_err(|source| ConfigurationError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Self::resolve_from(explicit, &cwd)
    }

    /// Like [`resolve`](Self::resolve) with an explicit starting directory.
    ///
    /// An explicit root must exist and be a directory; missing `output/` and
    /// `log/` below it are created. The search never creates anything: it
    /// picks the first of `start` and its ancestors holding both
    /// subdirectories.
    pub fn resolve_from(explicit: Option<&Path>, start: &Path) -> Result<Self, ConfigurationError> {
        let home = match explicit {
            Some(root) => {
                info!("setting experiment home according to configuration");
                Self::from_explicit(root)?
            }
            None => {
                info!("experiment home not configured, searching from {}", start.display());
                Self::search(start)?
            }
        };
        info!("experiment home: {}", home.root.display());
        Ok(home)
    }

    fn from_explicit(root: &Path) -> Result<Self, ConfigurationError> {
        if !root.exists() {
            return Err(ConfigurationError::MissingRoot(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ConfigurationError::NotADirectory(root.to_path_buf()));
        }
        let root = fs::canonicalize(root).map_err(|source| ConfigurationError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let home = Self::at(root);
        for dir in &[&home.output, &home.log] {
            if dir.exists() && !dir.is_dir() {
                return Err(ConfigurationError::NotADirectory(dir.to_path_buf()));
            }
            fs::create_dir_all(dir).map_err(|source| ConfigurationError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(home)
    }

    fn search(start: &Path) -> Result<Self, ConfigurationError> {
        for candidate in start.ancestors().take(MAX_ANCESTORS) {
            debug!("looking for {}/ and {}/ in {}", OUTPUT_DIR, LOG_DIR, candidate.display());
            if candidate.join(OUTPUT_DIR).is_dir() && candidate.join(LOG_DIR).is_dir() {
                let root = fs::canonicalize(candidate).map_err(|source| ConfigurationError::Io {
                    path: candidate.to_path_buf(),
                    source,
                })?;
                return Ok(Self::at(root));
            }
        }
        Err(ConfigurationError::HomeNotFound(start.to_path_buf()))
    }
}
