//! # sitedump - Hierarchical Extraction of Crawled Websites
//!
//! This crate turns a locally stored mirror of crawled web pages into a flat
//! corpus of bounded-length document extracts, plus a typed graph relating
//! them. It is the preparation step of a retrieval pipeline: embedding and
//! retrieval happen downstream.
//!
//! ## Features
//!
//! - Per-site configuration of main content, removed tags, rewrites and the
//!   split hierarchy, loaded from JSON and validated up front
//! - Table to nested list conversion with footnote handling
//! - Recursive splitting of page content at configurable tags, with a
//!   sentence and word fallback for oversize extracts
//! - Stable document ids and a relation graph of parent, sibling, split and
//!   link edges
//! - Link resolution across pages, with redirect normalization
//!
//! ## Example
//!
//! ```rust,no_run
//! use sitedump::config::load_config;
//! use sitedump::extract::run;
//! use sitedump::links::RedirectMap;
//! use sitedump::writer::{CorpusWriter, NeverRetry};
//!
//! fn main() -> sitedump::Result<()> {
//!     let config = load_config("sitedump.json".as_ref())?;
//!     let corpus = run(&config.extractor, &config.sites, RedirectMap::new());
//!     CorpusWriter::new("processed").write(&corpus, &mut NeverRetry)?;
//!     Ok(())
//! }
//! ```

mod error;

pub mod config;
pub mod dom;
pub mod extract;
pub mod graph;
pub mod index;
pub mod links;
pub mod preprocess;
pub mod splitter;
pub mod walker;
pub mod writer;

pub use error::{Error, Result};

/// Re-export of common types
pub mod prelude {
    pub use crate::config::{ExtractorConfig, SiteDumpConfig};
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::extract::{Corpus, DocExtractor, DocumentExtract};
    pub use crate::graph::{Relation, RelationGraph};
    pub use crate::index::{DocId, DocumentIndex};
}
