//! # Corpus Writer Module
//!
//! Writes a finished [`Corpus`] into an output directory:
//!
//! - `website_extracts.jsonl`: one JSON object per extract, in id order
//! - `website_graph.json`: adjacency list with typed `out` and `in` edges
//! - `unhandled_tables.json`, `error_tables.json`: table titles per page url
//!
//! A run is expensive to recompute, so a failed write asks a [`RetryPrompt`]
//! whether to try again before giving up.

mod error;

pub use error::WriteError;

use crate::extract::Corpus;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const EXTRACTS_FILE: &str = "website_extracts.jsonl";
pub const GRAPH_FILE: &str = "website_graph.json";
pub const UNHANDLED_TABLES_FILE: &str = "unhandled_tables.json";
pub const ERROR_TABLES_FILE: &str = "error_tables.json";

/// Decides whether a failed write is attempted again
pub trait RetryPrompt {
    fn retry(&mut self, error: &WriteError) -> bool;
}

/// Asks on the terminal, `y` retries
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl RetryPrompt for StdinPrompt {
    fn retry(&mut self, error: &WriteError) -> bool {
        eprintln!("Unable to write to file: {error}");
        eprintln!("Make sure the files to write are not open elsewhere.");
        eprint!("Try saving files again? <y,n> ");
        let _ = std::io::stderr().flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
            Err(_) => false,
        }
    }
}

/// Never retries
#[derive(Debug, Default)]
pub struct NeverRetry;

impl RetryPrompt for NeverRetry {
    fn retry(&mut self, _error: &WriteError) -> bool {
        false
    }
}

/// Writes corpus artifacts into one directory
#[derive(Debug, Clone)]
pub struct CorpusWriter {
    out_dir: PathBuf,
}

impl CorpusWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write every artifact, retrying while `prompt` agrees
    pub fn write(&self, corpus: &Corpus, prompt: &mut dyn RetryPrompt) -> Result<(), WriteError> {
        loop {
            match self.write_all(corpus) {
                Ok(()) => {
                    info!(
                        out_dir = %self.out_dir.display(),
                        extracts = corpus.extracts.len(),
                        "Wrote {} and {}",
                        EXTRACTS_FILE,
                        GRAPH_FILE
                    );
                    return Ok(());
                }
                Err(e) => {
                    error!("{}", e);
                    if !prompt.retry(&e) {
                        error!("Didn't save the extracted documents");
                        return Err(e);
                    }
                }
            }
        }
    }

    fn write_all(&self, corpus: &Corpus) -> Result<(), WriteError> {
        std::fs::create_dir_all(&self.out_dir).map_err(|source| WriteError::Io {
            path: self.out_dir.clone(),
            source,
        })?;

        let path = self.out_dir.join(EXTRACTS_FILE);
        let mut out = create(&path)?;
        for extract in &corpus.extracts {
            serde_json::to_writer(&mut out, extract).map_err(|source| WriteError::Json {
                path: path.clone(),
                source,
            })?;
            out.write_all(b"\n").map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;
        }
        out.flush().map_err(|source| WriteError::Io {
            path: path.clone(),
            source,
        })?;

        self.write_json(GRAPH_FILE, &corpus.graph.to_adjacency())?;
        self.write_json(UNHANDLED_TABLES_FILE, &corpus.tables.unhandled)?;
        self.write_json(ERROR_TABLES_FILE, &corpus.tables.errors)?;
        Ok(())
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), WriteError> {
        let path = self.out_dir.join(name);
        let mut out = create(&path)?;
        serde_json::to_writer_pretty(&mut out, value).map_err(|source| WriteError::Json {
            path: path.clone(),
            source,
        })?;
        out.flush()
            .map_err(|source| WriteError::Io { path, source })
    }
}

fn create(path: &Path) -> Result<BufWriter<File>, WriteError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DocumentExtract;
    use crate::graph::{AdjacencyList, Relation, RelationGraph};
    use crate::index::DocumentIndex;
    use crate::links::ResolveStats;
    use crate::preprocess::TableReport;

    fn corpus() -> Corpus {
        let mut graph = RelationGraph::new();
        graph.add_edge(0, 1, Relation::ParentPage);
        let mut tables = TableReport::new();
        tables.record_unhandled("https://x.org/a", "Fees");
        let mut child = DocumentExtract::site_root(1, "https://x.org/a");
        child.parent = Some(0);
        child.titles = vec![String::new()];
        child.text = "Hello".to_string();
        Corpus {
            extracts: vec![DocumentExtract::site_root(0, "https://x.org"), child],
            graph,
            index: DocumentIndex::new(),
            tables,
            links: ResolveStats::default(),
        }
    }

    struct CountingPrompt {
        asked: usize,
        answer: bool,
    }

    impl RetryPrompt for CountingPrompt {
        fn retry(&mut self, _error: &WriteError) -> bool {
            self.asked += 1;
            let answer = self.answer;
            self.answer = false;
            answer
        }
    }

    #[test]
    fn test_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        CorpusWriter::new(&out)
            .write(&corpus(), &mut NeverRetry)
            .unwrap();

        let lines: Vec<DocumentExtract> = std::fs::read_to_string(out.join(EXTRACTS_FILE))
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].text, "Hello");
        assert_eq!(lines[1].parent, Some(0));

        let graph: AdjacencyList =
            serde_json::from_str(&std::fs::read_to_string(out.join(GRAPH_FILE)).unwrap()).unwrap();
        assert_eq!(RelationGraph::from_adjacency(&graph).parent(1), Some(0));

        let unhandled: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(out.join(UNHANDLED_TABLES_FILE)).unwrap())
                .unwrap();
        assert_eq!(unhandled["https://x.org/a"][0], "Fees");
        assert!(out.join(ERROR_TABLES_FILE).exists());
    }

    #[test]
    fn test_failed_write_asks_until_declined() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "not a directory").unwrap();

        let mut prompt = CountingPrompt {
            asked: 0,
            answer: true,
        };
        let err = CorpusWriter::new(blocker.join("out"))
            .write(&corpus(), &mut prompt)
            .unwrap_err();
        assert_eq!(prompt.asked, 2);
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
