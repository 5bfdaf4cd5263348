//! Traversal of a site's on-disk mirror
//!
//! The crawler stores `https://site/a/b` as `<dump>/a/b.html`, and the pages
//! below it in `<dump>/a/b/`. The walker visits directories breadth first,
//! starting at the dump root, and hands each page to a visitor together with
//! the document id of its parent page. A directory is only entered once the
//! page it belongs to has produced a document.

use crate::config::SiteDumpConfig;
use crate::extract::ExtractError;
use crate::index::DocId;
use crate::links::canonicalize;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};
use walkdir::WalkDir;

/// One page to extract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub path: PathBuf,

    /// Canonical url the page was crawled from
    pub url: String,

    /// First document of the containing page, or the site root
    pub parent: DocId,
}

/// Counters of one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub pages: usize,
    pub failed: usize,
    pub skipped_dirs: usize,
    pub ignored_files: usize,
}

/// Walks the page tree of one site
#[derive(Debug, Clone, Copy)]
pub struct PageTreeWalker<'a> {
    site: &'a SiteDumpConfig,
}

impl<'a> PageTreeWalker<'a> {
    pub fn new(site: &'a SiteDumpConfig) -> Self {
        Self { site }
    }

    /// Url of the page stored at `path`, or `None` outside the dump
    pub fn page_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.site.dump_path).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if segments.is_empty() {
            return None;
        }
        let relative = segments.join("/");
        let relative = relative.strip_suffix(".html").unwrap_or(&relative);
        Some(canonicalize(&format!("{}/{}", self.site.base_url, relative)))
    }

    /// Visit every page below the dump root
    ///
    /// `visit` returns the first document id of the page, which becomes the
    /// parent of the pages in its directory. A failed page is logged and its
    /// directory is not entered.
    pub fn walk<F>(&self, root: DocId, mut visit: F) -> WalkStats
    where
        F: FnMut(&PageEntry) -> Result<DocId, ExtractError>,
    {
        let mut stats = WalkStats::default();
        let mut queue = VecDeque::from([(self.site.dump_path.clone(), root)]);

        while let Some((dir, parent)) = queue.pop_front() {
            let (files, dirs) = match list_dir(&dir) {
                Ok(listing) => listing,
                Err(e) => {
                    error!(path = %dir.display(), "{}", e);
                    continue;
                }
            };

            for path in files {
                if path.extension().is_none_or(|ext| ext != "html") {
                    debug!(path = %path.display(), "Ignoring non-html file");
                    stats.ignored_files += 1;
                    continue;
                }
                let Some(url) = self.page_url(&path) else {
                    warn!(path = %path.display(), "Page is outside the dump directory");
                    stats.ignored_files += 1;
                    continue;
                };

                let child_dir = path.with_extension("");
                let has_children = dirs.contains(&child_dir);
                debug!(url = %url, "Parsing page");

                let entry = PageEntry { path, url, parent };
                match visit(&entry) {
                    Ok(id) => {
                        stats.pages += 1;
                        if has_children {
                            queue.push_back((child_dir, id));
                        }
                    }
                    Err(e) => {
                        stats.failed += 1;
                        error!(path = %entry.path.display(), "Failed to parse page: {}", e);
                        if has_children {
                            stats.skipped_dirs += 1;
                            error!(path = %child_dir.display(), "Also skipping associated directory");
                        }
                    }
                }
            }
        }
        stats
    }
}

/// Files and subdirectories of `dir`, in file-name order
fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, HashSet<PathBuf>), ExtractError> {
    let mut files = Vec::new();
    let mut dirs = HashSet::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| ExtractError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            dirs.insert(entry.into_path());
        } else {
            files.push(entry.into_path());
        }
    }
    Ok((files, dirs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn site(dump: &Path) -> SiteDumpConfig {
        SiteDumpConfig::builder("test", "https://x.org/cal/")
            .dump_path(dump)
            .build(dump)
            .unwrap()
    }

    #[test]
    fn test_page_url() {
        let site = site(Path::new("/dumps/x"));
        let walker = PageTreeWalker::new(&site);
        assert_eq!(
            walker.page_url(Path::new("/dumps/x/faculties/science.html")).as_deref(),
            Some("https://x.org/cal/faculties/science")
        );
        assert_eq!(walker.page_url(Path::new("/elsewhere/a.html")), None);
    }

    #[test]
    fn test_walk_order_and_child_directories() {
        let dump = tempfile::tempdir().unwrap();
        let root = dump.path();
        fs::write(root.join("b.html"), "b").unwrap();
        fs::write(root.join("a.html"), "a").unwrap();
        fs::write(root.join("notes.txt"), "skip").unwrap();
        fs::create_dir(root.join("a")).unwrap();
        fs::write(root.join("a").join("child.html"), "child").unwrap();
        fs::create_dir(root.join("b")).unwrap();
        fs::write(root.join("b").join("lost.html"), "lost").unwrap();

        let site = site(root);
        let mut visited = Vec::new();
        let stats = PageTreeWalker::new(&site).walk(0, |page| {
            visited.push((page.url.clone(), page.parent));
            if page.url.ends_with("/b") {
                return Err(ExtractError::EmptyPage {
                    url: page.url.clone(),
                });
            }
            Ok(visited.len() * 10)
        });

        assert_eq!(
            visited,
            vec![
                ("https://x.org/cal/a".to_string(), 0),
                ("https://x.org/cal/b".to_string(), 0),
                ("https://x.org/cal/a/child".to_string(), 10),
            ]
        );
        assert_eq!(
            stats,
            WalkStats {
                pages: 2,
                failed: 1,
                skipped_dirs: 1,
                ignored_files: 1,
            }
        );
    }
}
