//! # Link Resolution Module
//!
//! Turns the raw hyperlinks captured while splitting into document ids. It
//! runs once, after every page of every site has been registered, so links
//! pointing forward in the crawl resolve as well as links pointing back.
//!
//! ## Resolution steps
//!
//! 1. Drop links whose href matches the ignore pattern (`mailto:` and friends)
//! 2. Join the href to the owning extract's url and canonicalize
//! 3. Apply the redirect map to the part before the fragment
//! 4. Look the url up in the index, falling back to the url without fragment
//!
//! A resolved link adds a LINK edge from the owning extract to its target.

mod normalize;

pub use normalize::{canonicalize, make_absolute, split_fragment};

use crate::config::ConfigError;
use crate::extract::DocumentExtract;
use crate::graph::{Relation, RelationGraph};
use crate::index::{DocId, DocumentIndex};
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Map of old urls to the urls they now redirect to
#[derive(Debug, Clone, Default)]
pub struct RedirectMap {
    redirects: HashMap<String, String>,
}

impl RedirectMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON object of `old url -> new url`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: HashMap<String, String> =
            serde_json::from_str(&text).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let map = Self::from_pairs(raw);
        info!(path = %path.display(), redirects = map.len(), "Loaded redirect map");
        Ok(map)
    }

    /// Build from pairs; both sides are canonicalized
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let redirects = pairs
            .into_iter()
            .map(|(old, new)| (canonicalize(old.as_ref()), canonicalize(new.as_ref())))
            .collect();
        Self { redirects }
    }

    /// Where `url` redirects to, or `url` itself
    pub fn apply<'a>(&'a self, url: &'a str) -> &'a str {
        self.redirects.get(url).map(String::as_str).unwrap_or(url)
    }

    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }
}

/// Outcome of resolving one href
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The href matches the ignore pattern
    Ignored,

    /// The href could not be turned into an absolute url
    Invalid,

    /// Canonical target and the document registered under it, if any
    Target { url: String, doc_id: Option<DocId> },
}

/// Counters reported after a resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: usize,
    pub unresolved: usize,
    pub ignored: usize,
}

/// Resolves captured hrefs into document ids
#[derive(Debug, Clone)]
pub struct LinkResolver {
    ignore: Regex,
    redirects: RedirectMap,
}

impl LinkResolver {
    /// `ignore` must already be anchored at the start
    pub fn new(ignore: Regex, redirects: RedirectMap) -> Self {
        Self { ignore, redirects }
    }

    /// Resolve a single href found in the extract at `base_url`
    pub fn resolve(&self, href: &str, base_url: &str, index: &DocumentIndex) -> Resolution {
        if self.ignore.is_match(href) {
            return Resolution::Ignored;
        }
        let absolute = match make_absolute(base_url, href) {
            Ok(url) => canonicalize(&url),
            Err(e) => {
                debug!(href, base_url, "Could not make link absolute: {}", e);
                return Resolution::Invalid;
            }
        };

        let (base, fragment) = split_fragment(&absolute);
        let redirected = self.redirects.apply(base);
        let url = match fragment {
            Some(fragment) => canonicalize(&format!("{redirected}#{fragment}")),
            None => canonicalize(redirected),
        };

        let doc_id = index.find_by_url(&url).or_else(|| {
            let (without_fragment, fragment) = split_fragment(&url);
            fragment.and_then(|_| index.find_by_url(without_fragment))
        });
        Resolution::Target { url, doc_id }
    }

    /// Resolve every link of every extract in place and add LINK edges
    ///
    /// Ignored links are removed from their extract.
    #[instrument(skip_all, fields(extracts = extracts.len()))]
    pub fn resolve_all(
        &self,
        extracts: &mut [DocumentExtract],
        index: &DocumentIndex,
        graph: &mut RelationGraph,
    ) -> ResolveStats {
        let mut stats = ResolveStats::default();
        for extract in extracts.iter_mut() {
            let owner = extract.doc_id;
            let base_url = extract.url.clone();
            extract.links.retain_mut(|link| {
                match self.resolve(&link.href, &base_url, index) {
                    Resolution::Ignored => {
                        stats.ignored += 1;
                        false
                    }
                    Resolution::Invalid => {
                        stats.unresolved += 1;
                        true
                    }
                    Resolution::Target { url, doc_id } => {
                        link.url = Some(url);
                        link.doc_id = doc_id;
                        match doc_id {
                            Some(target) => {
                                graph.add_edge(owner, target, Relation::Link);
                                stats.resolved += 1;
                            }
                            None => stats.unresolved += 1,
                        }
                        true
                    }
                }
            });
        }
        info!(
            resolved = stats.resolved,
            unresolved = stats.unresolved,
            ignored = stats.ignored,
            "Resolved links"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractLink;

    fn resolver(redirects: RedirectMap) -> LinkResolver {
        LinkResolver::new(Regex::new("^(?:(mailto|tel|javascript):)").unwrap(), redirects)
    }

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_relative_and_fragment_links() {
        let mut index = DocumentIndex::new();
        let b = index.add(&titles(&["B"]), "https://x.org/dir/b", None, &[]);
        let section = index.add(&titles(&["B", "Fees"]), "https://x.org/dir/b#fees", None, &[]);
        let resolver = resolver(RedirectMap::new());

        assert_eq!(
            resolver.resolve("b.html", "https://x.org/dir/a", &index),
            Resolution::Target {
                url: "https://x.org/dir/b".to_string(),
                doc_id: Some(b)
            }
        );
        assert_eq!(
            resolver.resolve("b#fees", "https://x.org/dir/a", &index),
            Resolution::Target {
                url: "https://x.org/dir/b#fees".to_string(),
                doc_id: Some(section)
            }
        );
        // Unknown anchors fall back to the page
        assert_eq!(
            resolver.resolve("/dir/b#missing", "https://x.org/dir/a", &index),
            Resolution::Target {
                url: "https://x.org/dir/b#missing".to_string(),
                doc_id: Some(b)
            }
        );
    }

    #[test]
    fn test_ignored_and_unknown_links() {
        let index = DocumentIndex::new();
        let resolver = resolver(RedirectMap::new());
        assert_eq!(
            resolver.resolve("mailto:advising@x.org", "https://x.org/a", &index),
            Resolution::Ignored
        );
        assert_eq!(
            resolver.resolve("https://elsewhere.org/page/", "https://x.org/a", &index),
            Resolution::Target {
                url: "https://elsewhere.org/page".to_string(),
                doc_id: None
            }
        );
    }

    #[test]
    fn test_redirects_apply_before_fragment() {
        let mut index = DocumentIndex::new();
        let new = index.add(&titles(&["New"]), "https://x.org/new", None, &[]);
        let redirects = RedirectMap::from_pairs([("http://x.org/old.html", "https://x.org/new/")]);
        let resolver = resolver(redirects);
        assert_eq!(
            resolver.resolve("/old#part", "https://x.org/a", &index),
            Resolution::Target {
                url: "https://x.org/new#part".to_string(),
                doc_id: Some(new)
            }
        );
    }

    #[test]
    fn test_resolve_all_adds_link_edges() {
        let mut index = DocumentIndex::new();
        let a = index.add(&titles(&["A"]), "https://x.org/a", None, &[]);
        let b = index.add(&titles(&["B"]), "https://x.org/b", None, &[]);
        let mut extract = DocumentExtract::site_root(a, "https://x.org/a");
        extract.links = vec![
            ExtractLink::new("B", "b"),
            ExtractLink::new("mail", "mailto:x@x.org"),
            ExtractLink::new("gone", "c"),
        ];
        let mut extracts = vec![extract];
        let mut graph = RelationGraph::new();

        let stats = resolver(RedirectMap::new()).resolve_all(&mut extracts, &index, &mut graph);
        assert_eq!(
            stats,
            ResolveStats {
                resolved: 1,
                unresolved: 1,
                ignored: 1
            }
        );
        assert_eq!(extracts[0].links.len(), 2);
        assert_eq!(extracts[0].links[0].doc_id, Some(b));
        assert_eq!(extracts[0].links[1].url.as_deref(), Some("https://x.org/c"));
        assert_eq!(graph.links(a), vec![b]);
    }
}
