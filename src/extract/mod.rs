//! # Extract Module
//!
//! Drives a run: pages of each site are walked, preprocessed and split, and
//! every resulting extract is registered in the [`DocumentIndex`] and wired
//! into the [`RelationGraph`]. Links are resolved once all sites are done.
//!
//! ## Key Components
//!
//! - **DocExtractor**: owns the index, graph, extract rows and table report
//!   of a run
//! - **DocumentExtract**: one row of the corpus
//! - **Corpus**: everything a finished run hands to the writer
//!
//! ## Emission
//!
//! Split results are turned into rows depth first, so a parent always has a
//! smaller id than its children:
//!
//! - An untitled, childless first child is folded into its parent. Any other
//!   untitled first child is titled `Intro` and the parent keeps no content.
//! - Extracts without text or children are dropped.
//! - Text longer than `max_len` becomes several rows chained with
//!   SIBLING_SPLIT_EXTRACT edges; each keeps the links whose text it contains.
//! - A title path already taken on the same url gets a ` (2)`, ` (3)`, ...
//!   suffix on its last title.

mod document;
mod error;

pub use document::{DocumentExtract, ExtractLink};
pub use error::ExtractError;

use crate::config::{ExtractorConfig, SiteDumpConfig};
use crate::graph::{Relation, RelationGraph};
use crate::index::{DocId, DocumentIndex};
use crate::links::{canonicalize, split_fragment, LinkResolver, RedirectMap, ResolveStats};
use crate::preprocess::{ContentPreprocessor, TableReport};
use crate::splitter::{split_by_sentence, ExtractNode, HierarchicalSplitter};
use crate::dom::Tree;
use crate::walker::{PageTreeWalker, WalkStats};
use chrono::{DateTime, Utc};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const INTRO_TITLE: &str = "Intro";

/// Output of a finished run
#[derive(Debug)]
pub struct Corpus {
    /// Rows in id order
    pub extracts: Vec<DocumentExtract>,
    pub graph: RelationGraph,
    pub index: DocumentIndex,
    pub tables: TableReport,
    pub links: ResolveStats,
}

/// Provenance of the page being emitted
#[derive(Debug, Clone, Default)]
struct PageSource {
    path: Option<PathBuf>,
    last_modified: Option<DateTime<Utc>>,
}

/// Where a list of sibling extracts hangs in the page
struct Scope<'s> {
    url: &'s str,
    parent: DocId,
    titles: &'s [String],
    parent_titles: &'s [String],
    context: Option<String>,
    root_level: bool,
}

/// Turns site dumps into a corpus of extracts
pub struct DocExtractor<'a> {
    config: &'a ExtractorConfig,
    index: DocumentIndex,
    graph: RelationGraph,
    extracts: Vec<DocumentExtract>,
    preprocessor: ContentPreprocessor,
    progress: ProgressBar,
}

impl<'a> DocExtractor<'a> {
    pub fn new(config: &'a ExtractorConfig) -> Self {
        Self {
            config,
            index: DocumentIndex::new(),
            graph: RelationGraph::new(),
            extracts: Vec::new(),
            preprocessor: ContentPreprocessor::new(),
            progress: ProgressBar::hidden(),
        }
    }

    /// Report each parsed page on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.index
    }

    pub fn graph(&self) -> &RelationGraph {
        &self.graph
    }

    pub fn extracts(&self) -> &[DocumentExtract] {
        &self.extracts
    }

    /// Register the site root and extract every page of the site's dump
    #[instrument(skip_all, fields(site = %site.name))]
    pub fn parse_folder(&mut self, site: &SiteDumpConfig) -> WalkStats {
        info!(base_url = %site.base_url, dump = %site.dump_path.display(), "Processing site");
        let root = self.add_site_root(site);

        let walker = PageTreeWalker::new(site);
        let stats = walker.walk(root, |page| {
            let result = self.parse_file(&page.path, &page.url, page.parent, site);
            self.progress.inc(1);
            self.progress.set_message(page.url.clone());
            result
        });
        info!(
            pages = stats.pages,
            failed = stats.failed,
            skipped_dirs = stats.skipped_dirs,
            "Finished site"
        );
        stats
    }

    /// Site root row, registered once per base url
    fn add_site_root(&mut self, site: &SiteDumpConfig) -> DocId {
        let known = self.index.len();
        let root = self
            .index
            .add(&[], &site.base_url, Some(&site.dump_path), &[]);
        if self.index.len() > known {
            self.graph.add_node(root);
            let mut row = DocumentExtract::site_root(root, site.base_url.clone());
            row.source_path = Some(site.dump_path.clone());
            row.metadata = site.metadata_fields.clone();
            self.extracts.push(row);
        }
        root
    }

    /// Extract one page file; returns the id of its first extract
    pub fn parse_file(
        &mut self,
        path: &Path,
        url: &str,
        parent: DocId,
        site: &SiteDumpConfig,
    ) -> Result<DocId, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let html = decode(bytes).ok_or_else(|| ExtractError::Encoding {
            path: path.to_path_buf(),
        })?;
        let last_modified = std::fs::metadata(path)
            .and_then(|meta| meta.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let source = PageSource {
            path: Some(path.to_path_buf()),
            last_modified,
        };
        self.emit_page(&html, url, parent, site, &source)
    }

    /// Extract a page given as a string; returns the id of its first extract
    pub fn parse_page(
        &mut self,
        html: &str,
        url: &str,
        parent: DocId,
        site: &SiteDumpConfig,
    ) -> Result<DocId, ExtractError> {
        self.emit_page(html, url, parent, site, &PageSource::default())
    }

    fn emit_page(
        &mut self,
        html: &str,
        url: &str,
        parent: DocId,
        site: &SiteDumpConfig,
        source: &PageSource,
    ) -> Result<DocId, ExtractError> {
        let url = canonicalize(url);
        let mut page = self.preprocessor.process(html, &url, site);

        let mut parent_titles = self
            .index
            .get(parent)
            .map(|entry| entry.parent_titles.clone())
            .unwrap_or_default();
        if !page.title.is_empty() {
            parent_titles.push(page.title.clone());
        }

        let nodes =
            HierarchicalSplitter::new(site, self.config.max_len).split(&mut page.tree, page.root);
        let scope = Scope {
            url: &url,
            parent,
            titles: &[],
            parent_titles: &parent_titles,
            context: None,
            root_level: true,
        };
        let ids = self.emit(&page.tree, nodes, &scope, site, source);
        debug!(url = %url, extracts = ids.len(), "Parsed page");
        ids.first()
            .copied()
            .ok_or(ExtractError::EmptyPage { url })
    }

    /// Emit sibling extracts depth first; returns every id minted
    fn emit(
        &mut self,
        tree: &Tree,
        nodes: Vec<ExtractNode>,
        scope: &Scope<'_>,
        site: &SiteDumpConfig,
        source: &PageSource,
    ) -> Vec<DocId> {
        let mut minted = Vec::new();
        let mut previous: Option<DocId> = None;

        for mut node in nodes {
            fold_intro(&mut node);

            let url = match &node.anchor {
                Some(anchor) => canonicalize(&format!("{}#{}", split_fragment(scope.url).0, anchor)),
                None => scope.url.to_string(),
            };
            let text = node.text(tree);
            if text.trim().is_empty() && node.children.is_empty() {
                continue;
            }

            let mut titles = scope.titles.to_vec();
            titles.push(node.title.clone());
            self.disambiguate(&url, &mut titles);

            let pieces = if text.chars().count() > self.config.max_len {
                split_by_sentence(&text, self.config.max_len)
            } else {
                vec![text.clone()]
            };
            let relation = if scope.root_level {
                Relation::ParentPage
            } else {
                Relation::ParentExtract
            };

            let mut first = None;
            for (split_idx, piece) in pieces.iter().enumerate() {
                let links = if pieces.len() > 1 {
                    node.links
                        .iter()
                        .filter(|link| piece.contains(&link.text))
                        .cloned()
                        .collect()
                } else {
                    node.links.clone()
                };

                let path = if scope.root_level && minted.is_empty() {
                    source.path.as_deref()
                } else {
                    None
                };
                let id = self
                    .index
                    .add_split(&titles, &url, path, scope.parent_titles, split_idx);
                first.get_or_insert(id);
                minted.push(id);

                self.graph.add_node(id);
                self.graph.add_edge(scope.parent, id, relation);
                if let Some(prev) = previous {
                    let sibling = if split_idx > 0 {
                        Relation::SiblingSplitExtract
                    } else {
                        Relation::SiblingExtract
                    };
                    self.graph.add_edge(prev, id, sibling);
                }
                previous = Some(id);

                let mut metadata =
                    site.metadata_extractor
                        .extract(&url, &titles, scope.parent_titles, piece);
                for (key, value) in &site.metadata_fields {
                    metadata.entry(key.clone()).or_insert_with(|| value.clone());
                }
                let context = metadata
                    .remove("context")
                    .and_then(|value| value.as_str().map(str::to_string))
                    .or_else(|| scope.context.clone());

                self.extracts.push(DocumentExtract {
                    doc_id: id,
                    url: url.clone(),
                    parent: Some(scope.parent),
                    titles: titles.clone(),
                    parent_titles: scope.parent_titles.to_vec(),
                    text: piece.clone(),
                    links,
                    source_path: source.path.clone(),
                    last_modified: source.last_modified,
                    context,
                    split_idx,
                    metadata,
                });
            }

            let Some(first) = first else {
                continue;
            };
            let child_context = site.parent_context_extractor.extract(
                &url,
                scope.titles,
                scope.parent_titles,
                &text,
            );
            let child_scope = Scope {
                url: &url,
                parent: first,
                titles: &titles,
                parent_titles: scope.parent_titles,
                context: child_context,
                root_level: false,
            };
            let children = std::mem::take(&mut node.children);
            minted.extend(self.emit(tree, children, &child_scope, site, source));
        }
        minted
    }

    /// Suffix the last title until (url, titles) is free
    fn disambiguate(&self, url: &str, titles: &mut [String]) {
        if !self.index.contains(url, titles) {
            return;
        }
        let Some(last_idx) = titles.len().checked_sub(1) else {
            return;
        };
        let base = titles[last_idx].clone();
        for n in 2.. {
            titles[last_idx] = format!("{base} ({n})");
            if !self.index.contains(url, titles) {
                break;
            }
        }
    }

    /// Resolve every link and hand over the corpus
    #[instrument(skip_all)]
    pub fn finish(mut self, redirects: RedirectMap) -> Corpus {
        self.progress.finish_and_clear();
        let resolver = LinkResolver::new(self.config.link_ignore_regex.clone(), redirects);
        let links = resolver.resolve_all(&mut self.extracts, &self.index, &mut self.graph);
        self.extracts.sort_by_key(|extract| extract.doc_id);
        info!(
            extracts = self.extracts.len(),
            edges = self.graph.edge_count(),
            "Extraction complete"
        );
        Corpus {
            extracts: self.extracts,
            graph: self.graph,
            index: self.index,
            tables: self.preprocessor.into_report(),
            links,
        }
    }
}

/// Extract every site and resolve links
pub fn run(config: &ExtractorConfig, sites: &[SiteDumpConfig], redirects: RedirectMap) -> Corpus {
    let mut extractor = DocExtractor::new(config);
    for site in sites {
        extractor.parse_folder(site);
    }
    extractor.finish(redirects)
}

/// Merge an untitled leading child into its parent, or title it
fn fold_intro(node: &mut ExtractNode) {
    let Some(first) = node.children.first_mut() else {
        return;
    };
    if first.title.is_empty() && first.children.is_empty() {
        let first = node.children.remove(0);
        node.content = first.content;
        node.links = first.links;
    } else {
        if first.title.is_empty() {
            first.title = INTRO_TITLE.to_string();
        }
        node.content = None;
        node.links.clear();
    }
}

/// UTF-8 text of a page file, without byte order mark
fn decode(bytes: Vec<u8>) -> Option<String> {
    let text = String::from_utf8(bytes).ok()?;
    Some(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}
