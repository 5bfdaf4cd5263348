//! # Content Preprocessor Module
//!
//! Turns the raw HTML of one page into the content tree handed to the
//! splitter.
//!
//! ## Key Components
//!
//! - **ContentPreprocessor**: parses the page, keeps the main content minus
//!   removed subtrees, and applies the site's rewrite rules
//! - **Table conversion**: the `convert_table` rewrite turning tables into
//!   nested lists, see [`TableShape`]
//! - **TableReport**: tables handled generically or left unconverted, per
//!   page url
//!
//! Rewrites never fail a page. A table that cannot be converted is logged,
//! reported and kept as it was.

mod error;
mod footnotes;
mod report;
mod tables;

pub use error::RewriteError;
pub use report::{TableReport, TablesByUrl};
pub use tables::TableShape;

use crate::config::{Replacement, Rewrite, SiteDumpConfig, TITLE_TAGS};
use crate::dom::{normalize_whitespace, parse_page, NodeId, ParsedPage, SimpleSelector, Tree};
use tracing::{debug, error, info, warn};

/// Prepares page content for splitting and collects the table report
#[derive(Debug, Default)]
pub struct ContentPreprocessor {
    report: TableReport,
}

impl ContentPreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a page, keep its main content and apply the site's rewrites
    pub fn process(&mut self, html: &str, url: &str, site: &SiteDumpConfig) -> ParsedPage {
        let mut page = parse_page(html, &site.main_content, site.title.as_ref(), &site.remove);
        if !page.found_main {
            warn!(url, site = %site.name, "Main content not found, using the whole document");
        }
        for replacement in &site.replacements {
            self.apply(&mut page.tree, page.root, url, replacement);
        }
        page
    }

    /// Rewrite every match of one replacement, in document order
    fn apply(&mut self, tree: &mut Tree, root: NodeId, url: &str, replacement: &Replacement) {
        let selector = &replacement.selector;
        let mut next = tree.find(root, |tree, node| selector.matches(tree, node));
        let mut count = 0;
        while let Some(node) = next {
            let resume = match self.rewrite(tree, node, url, replacement.rewrite) {
                Some(new) => {
                    tree.replace(node, new);
                    tree.next_in_order(new, root)
                }
                None => tree.next_after_subtree(node, root),
            };
            count += 1;
            next = find_from(tree, resume, root, selector);
        }
        if count > 0 {
            debug!(
                url,
                selector = selector.as_str(),
                rewrite = replacement.rewrite.name(),
                count,
                "Applied rewrite"
            );
        }
    }

    fn rewrite(&mut self, tree: &mut Tree, node: NodeId, url: &str, rewrite: Rewrite) -> Option<NodeId> {
        match rewrite {
            Rewrite::ConvertTable => self.convert_table(tree, node, url),
        }
    }

    /// Replacement for `table`, or `None` when it is kept as is
    ///
    /// Empty tables become an empty `div`.
    pub fn convert_table(&mut self, tree: &mut Tree, table: NodeId, url: &str) -> Option<NodeId> {
        let has_elements = tree
            .children(table)
            .into_iter()
            .any(|child| tree.element(child).is_some());
        if !has_elements {
            return Some(tree.new_tag("div"));
        }

        let title = table_title(tree, table);
        let shape = TableShape::detect(tree, table, &title);
        if shape == TableShape::Generic {
            info!(url, title = %title, "Converting table with the generic row handler");
            self.report.record_unhandled(url, &title);
        }

        let copy = tree.deep_clone(table);
        match tables::convert(tree, copy, shape) {
            Ok(converted) => Some(converted),
            Err(e) => {
                error!(url, title = %title, "Failed to convert table: {}", e);
                self.report.record_error(url, &title);
                None
            }
        }
    }

    pub fn report(&self) -> &TableReport {
        &self.report
    }

    pub fn into_report(self) -> TableReport {
        self.report
    }
}

/// First heading inside the table, else the closest one before it
fn table_title(tree: &Tree, table: NodeId) -> String {
    let is_title = |tree: &Tree, node: NodeId| tree.is_tag(node, TITLE_TAGS);
    tree.find(table, is_title)
        .or_else(|| tree.find_previous(table, is_title))
        .map(|heading| normalize_whitespace(&tree.text_content(heading)))
        .unwrap_or_default()
}

/// First match of `selector` at or after `start` in document order
///
/// Replacement output is searched too, so tables moved into a converted
/// table's cells are rewritten as well.
fn find_from(
    tree: &Tree,
    start: Option<NodeId>,
    root: NodeId,
    selector: &SimpleSelector,
) -> Option<NodeId> {
    let mut next = start;
    while let Some(candidate) = next {
        if selector.matches(tree, candidate) {
            return Some(candidate);
        }
        next = tree.next_in_order(candidate, root);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::render_text;
    use std::path::Path;

    fn site() -> SiteDumpConfig {
        SiteDumpConfig::builder("test", "https://x.org")
            .main_content("#main")
            .remove(vec![".sr-only".to_string()])
            .replacement("table", "convert_table")
            .build(Path::new("."))
            .unwrap()
    }

    #[test]
    fn test_process_keeps_main_content_and_title() {
        let mut preprocessor = ContentPreprocessor::new();
        let page = preprocessor.process(
            "<html><body><nav>menu</nav><h1>Admissions</h1>\
             <div id='main'><p>Apply <span class='sr-only'>hidden</span>now.</p></div></body></html>",
            "https://x.org/admissions",
            &site(),
        );
        assert!(page.found_main);
        assert_eq!(page.title, "Admissions");
        assert_eq!(render_text(&page.tree, page.root), "Apply now.");
    }

    #[test]
    fn test_missing_main_content_falls_back_to_document() {
        let mut preprocessor = ContentPreprocessor::new();
        let page = preprocessor.process("<p>Only body</p>", "https://x.org/a", &site());
        assert!(!page.found_main);
        assert_eq!(render_text(&page.tree, page.root), "Only body");
    }

    #[test]
    fn test_tables_are_replaced_and_reported() {
        let mut preprocessor = ContentPreprocessor::new();
        let page = preprocessor.process(
            "<div id='main'><h2>Contacts</h2>\
             <table><tr><th>Name</th><th>Room</th></tr><tr><td>Ann</td><td>101</td></tr></table>\
             <table></table></div>",
            "https://x.org/contacts",
            &site(),
        );
        assert!(page.tree.find(page.root, |t, n| t.is_tag(n, &["table"])).is_none());
        assert_eq!(
            render_text(&page.tree, page.root),
            "Contacts\n\n- Name: Ann; Room: 101;"
        );
        let report = preprocessor.report();
        assert_eq!(report.unhandled["https://x.org/contacts"], vec!["Contacts"]);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_failed_conversion_keeps_original_table() {
        let mut preprocessor = ContentPreprocessor::new();
        let page = preprocessor.process(
            "<div id='main'><table><tr><th>A</th><th>B</th></tr>\
             <tr><td>1</td><td>2</td><td>3</td></tr></table>\
             <table><tr><td>k</td><td>v</td></tr></table></div>",
            "https://x.org/t",
            &site(),
        );
        let tables = page.tree.find_all(page.root, |t, n| t.is_tag(n, &["table"]));
        assert_eq!(tables.len(), 1);
        assert!(page.tree.to_html(tables[0]).contains("<td>3</td>"));
        assert!(render_text(&page.tree, page.root).ends_with("- k: v"));

        let report = preprocessor.into_report();
        assert_eq!(report.errors["https://x.org/t"], vec![""]);
        assert_eq!(report.unhandled["https://x.org/t"], vec!["", ""]);
    }

    #[test]
    fn test_tables_inside_later_cells_are_converted() {
        let mut preprocessor = ContentPreprocessor::new();
        let page = preprocessor.process(
            "<div id='main'><table><tr><td>Outer</td><td>\
             <table><tr><td>k</td><td>v</td></tr></table></td></tr></table></div>",
            "https://x.org/nested",
            &site(),
        );
        assert!(page.tree.find(page.root, |t, n| t.is_tag(n, &["table"])).is_none());
        let text = render_text(&page.tree, page.root);
        assert!(text.contains("Outer"));
        assert!(text.contains("k: v"));
        assert_eq!(preprocessor.report().unhandled["https://x.org/nested"].len(), 2);
    }
}
