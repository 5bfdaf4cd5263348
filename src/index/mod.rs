//! Document index
//!
//! Registry handing out document ids. Ids are assigned in registration order
//! starting at zero and an entry never changes once registered, so a run over
//! the same input always produces the same ids.
//!
//! ## Lookups
//!
//! - by id
//! - by (url, titles), the identity of a logical extract
//! - by url alone, which returns the first extract registered under it
//! - by source file path, for the first extract of each page

use crate::links::canonicalize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Identifier of one extract
pub type DocId = usize;

/// What the index knows about a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: DocId,

    /// Canonical url, fragment included
    pub url: String,

    pub titles: Vec<String>,

    /// Source file of the page, set on a page's first extract only
    pub path: Option<PathBuf>,

    pub parent_titles: Vec<String>,

    /// Position among the mechanical splits of one logical extract
    pub split_idx: usize,
}

/// Registry of document ids
#[derive(Debug, Default)]
pub struct DocumentIndex {
    entries: Vec<IndexEntry>,
    by_key: HashMap<(String, Vec<String>), DocId>,
    by_url: HashMap<String, Vec<DocId>>,
    by_path: HashMap<PathBuf, DocId>,
}

impl DocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a logical extract, or return the id it already has
    pub fn add(
        &mut self,
        titles: &[String],
        url: &str,
        path: Option<&Path>,
        parent_titles: &[String],
    ) -> DocId {
        self.add_split(titles, url, path, parent_titles, 0)
    }

    /// Register the `split_idx`-th mechanical split of a logical extract
    ///
    /// The first split is the logical extract itself and dedupes like
    /// [`add`](Self::add). Later splits always get a fresh id and are not
    /// reachable through [`find`](Self::find).
    pub fn add_split(
        &mut self,
        titles: &[String],
        url: &str,
        path: Option<&Path>,
        parent_titles: &[String],
        split_idx: usize,
    ) -> DocId {
        let url = canonicalize(url);
        let key = (url.clone(), titles.to_vec());
        if split_idx == 0 {
            if let Some(&id) = self.by_key.get(&key) {
                return id;
            }
        }

        let id = self.entries.len();
        if split_idx == 0 {
            self.by_key.insert(key, id);
        }
        self.by_url.entry(url.clone()).or_default().push(id);
        if let Some(path) = path {
            self.by_path.entry(path.to_path_buf()).or_insert(id);
        }
        self.entries.push(IndexEntry {
            id,
            url,
            titles: titles.to_vec(),
            path: path.map(Path::to_path_buf),
            parent_titles: parent_titles.to_vec(),
            split_idx,
        });
        id
    }

    pub fn get(&self, id: DocId) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    /// Id of the logical extract with this url and title path
    pub fn find(&self, url: &str, titles: &[String]) -> Option<DocId> {
        self.by_key.get(&(canonicalize(url), titles.to_vec())).copied()
    }

    /// Whether a logical extract with this url and title path exists
    pub fn contains(&self, url: &str, titles: &[String]) -> bool {
        self.find(url, titles).is_some()
    }

    /// First document registered under `url`
    pub fn find_by_url(&self, url: &str) -> Option<DocId> {
        self.by_url
            .get(&canonicalize(url))
            .and_then(|ids| ids.first())
            .copied()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<DocId> {
        self.by_path.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_ids_increase_and_dedupe() {
        let mut index = DocumentIndex::new();
        let a = index.add(&titles(&["A"]), "https://x.org/a", None, &[]);
        let b = index.add(&titles(&["B"]), "https://x.org/a", None, &[]);
        let again = index.add(&titles(&["A"]), "http://x.org/a.html", None, &[]);
        assert_eq!((a, b), (0, 1));
        assert_eq!(again, a);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(b).unwrap().titles, titles(&["B"]));
    }

    #[test]
    fn test_first_registrant_wins_for_url() {
        let mut index = DocumentIndex::new();
        let first = index.add(&titles(&["Intro"]), "https://x.org/page", None, &[]);
        index.add(&titles(&["Details"]), "https://x.org/page", None, &[]);
        assert_eq!(index.find_by_url("https://x.org/page/"), Some(first));
        assert_eq!(index.len(), 2);
        assert_eq!(index.find_by_url("https://x.org/other"), None);
    }

    #[test]
    fn test_splits_get_fresh_ids() {
        let mut index = DocumentIndex::new();
        let t = titles(&["Long"]);
        let first = index.add_split(&t, "https://x.org/p", None, &[], 0);
        let second = index.add_split(&t, "https://x.org/p", None, &[], 1);
        assert_ne!(first, second);
        assert_eq!(index.find("https://x.org/p", &t), Some(first));
        assert_eq!(index.get(second).unwrap().split_idx, 1);
    }

    #[test]
    fn test_find_by_path() {
        let mut index = DocumentIndex::new();
        let path = Path::new("/dump/x.org/page.html");
        let id = index.add(&titles(&["Page"]), "https://x.org/page", Some(path), &[]);
        index.add(&titles(&["Page", "Part"]), "https://x.org/page", Some(path), &[]);
        assert_eq!(index.find_by_path(path), Some(id));
        assert!(index.contains("https://x.org/page", &titles(&["Page"])));
    }
}
