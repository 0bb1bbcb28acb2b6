use crate::error::SourceError;
use crate::graph::gml::read_gml;
use crate::graph::Graph;
use crate::io::PaceReader;
use fxhash::FxHashSet;
use log::{error, info, warn};
use std::convert::TryFrom;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Supplies the corpus of graphs a batch runs over.
pub trait GraphSource {
    fn graphs(&self) -> Result<Vec<Graph>, SourceError>;
}

impl GraphSource for Vec<Graph> {
    fn graphs(&self) -> Result<Vec<Graph>, SourceError> {
        Ok(self.clone())
    }
}

/// A directory of `*.gml` (Topology Zoo) and `*.gr` (PACE) files.
/// The graph id is the file stem.
pub struct GraphDirectory {
    root: PathBuf,
}

impl GraphDirectory {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let mut files = Vec::new();
        for ext in &["gml", "gr"] {
            let pattern = self.root.join(format!("*.{}", ext));
            for entry in glob::glob(&pattern.to_string_lossy())? {
                match entry {
                    Ok(path) => files.push(path),
                    Err(e) => warn!("skipping unreadable corpus entry: {}", e),
                }
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(path: &Path, id: &str) -> Result<Graph, SourceError> {
        let io_err = |source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        };
        let format_err = |msg: String| SourceError::Format {
            path: path.to_path_buf(),
            msg,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("gr") => {
                let file = File::open(path).map_err(io_err)?;
                let mut graph =
                    Graph::try_from(PaceReader(BufReader::new(file))).map_err(|e| format_err(e.to_string()))?;
                graph.rename(id);
                Ok(graph)
            }
            _ => {
                let text = fs::read_to_string(path).map_err(io_err)?;
                read_gml(id, &text).map_err(|e| format_err(e.to_string()))
            }
        }
    }
}

impl GraphSource for GraphDirectory {
    fn graphs(&self) -> Result<Vec<Graph>, SourceError> {
        if !self.root.is_dir() {
            return Err(SourceError::Io {
                path: self.root.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "corpus directory not found"),
            });
        }
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut graphs = Vec::new();
        for path in self.files()? {
            let id = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => String::from(stem),
                None => {
                    warn!("skipping {}: file name is not valid UTF-8", path.display());
                    continue;
                }
            };
            if seen.contains(&id) {
                warn!("skipping {}: graph {} already loaded", path.display(), id);
                continue;
            }
            match Self::read(&path, &id) {
                Ok(graph) => {
                    seen.insert(id);
                    graphs.push(graph);
                }
                Err(e) => error!("reading {} was not successful: {}", path.display(), e),
            }
        }
        info!("loaded {} graphs from {}", graphs.len(), self.root.display());
        Ok(graphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_corpus() {
        let corpus = vec![Graph::new("a"), Graph::new("b")];
        let ids: Vec<String> = corpus
            .graphs()
            .unwrap()
            .iter()
            .map(|g| String::from(g.id()))
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn reads_mixed_directory_and_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("Beta.gml"),
            "graph [ node [ id 0 ] node [ id 1 ] edge [ source 0 target 1 ] ]",
        )
        .unwrap();
        fs::write(dir.path().join("Alpha.gr"), "c tiny\np tw 3 2\n1 2\n2 3\n").unwrap();
        fs::write(dir.path().join("Broken.gml"), "graph [ node [ id 0 ]").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let graphs = GraphDirectory::new(dir.path()).graphs().unwrap();
        let ids: Vec<&str> = graphs.iter().map(|g| g.id()).collect();
        assert_eq!(ids, vec!["Alpha", "Beta"]);
        assert_eq!(graphs[0].order(), 3);
        assert_eq!(graphs[0].size(), 2);
        assert_eq!(graphs[1].size(), 1);
    }

    #[test]
    fn duplicate_stems_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Same.gml"), "graph [ node [ id 0 ] ]").unwrap();
        fs::write(dir.path().join("Same.gr"), "p tw 2 1\n1 2\n").unwrap();
        let graphs = GraphDirectory::new(dir.path()).graphs().unwrap();
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].order(), 1);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = GraphDirectory::new(dir.path().join("nope"));
        assert!(missing.graphs().is_err());
    }
}
