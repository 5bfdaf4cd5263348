//! # Hierarchical Splitter Module
//!
//! Cuts a page's content tree into a tree of extracts. The site config lists
//! split matchers from the outermost level (usually `h1`) inwards; each level
//! cuts the extracts of the previous one at its matching nodes.
//!
//! ## Algorithm
//!
//! `split_at(tree, root, level)`:
//!
//! - Past the last level, or past the mandatory levels with text that fits in
//!   `max_len`: one leaf wrapping `root` with every `a[href]` inside it.
//! - No matches at this level (or only empty ones when those are ignored):
//!   the same subtree is split at the next level.
//! - Otherwise the subtree is walked and cut at each split node (see
//!   [`walk`]), and every piece is split again at the next level. A piece
//!   whose split gives fewer than two extracts keeps no children.
//!
//! Text longer than `max_len` left in leaves is split later, at emission,
//! by [`split_by_sentence`].

mod sentences;
mod walk;

pub use sentences::split_by_sentence;

use crate::config::SiteDumpConfig;
use crate::dom::{render_text, NodeId, Tree};
use crate::extract::ExtractLink;
use std::fmt::Write;
use tracing::trace;
use walk::WalkLevel;

/// One node of a page's extract tree
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractNode {
    /// Text of the split node that opened this extract, empty for content
    /// before the first split node
    pub title: String,

    /// Content subtree, none when the children cover all of it
    pub content: Option<NodeId>,

    /// `id`/`name` of the anchor seen just before the split node
    pub anchor: Option<String>,

    /// Links found in this extract's own content
    pub links: Vec<ExtractLink>,

    pub children: Vec<ExtractNode>,
}

impl ExtractNode {
    fn leaf(tree: &Tree, root: NodeId) -> Self {
        let links = tree
            .find_all(root, |tree, node| {
                tree.is_tag(node, &["a"]) && tree.attr(node, "href").is_some()
            })
            .into_iter()
            .filter_map(|node| {
                let href = tree.attr(node, "href")?;
                let text = crate::dom::normalize_whitespace(&tree.text_content(node));
                Some(ExtractLink::new(text, href))
            })
            .collect();
        Self {
            title: String::new(),
            content: Some(root),
            anchor: None,
            links,
            children: Vec::new(),
        }
    }

    /// Plain text of this extract's own content
    pub fn text(&self, tree: &Tree) -> String {
        self.content
            .map(|content| render_text(tree, content))
            .unwrap_or_default()
    }
}

/// Indented outline of titles and anchors, one extract per line
pub fn outline(extracts: &[ExtractNode]) -> String {
    fn write_level(out: &mut String, extracts: &[ExtractNode], depth: usize) {
        for extract in extracts {
            let _ = writeln!(
                out,
                "{}- {} #{}",
                "  ".repeat(depth),
                extract.title,
                extract.anchor.as_deref().unwrap_or("")
            );
            write_level(out, &extract.children, depth + 1);
        }
    }
    let mut out = String::new();
    write_level(&mut out, extracts, 0);
    out
}

/// Splits page content according to one site's split hierarchy
#[derive(Debug, Clone, Copy)]
pub struct HierarchicalSplitter<'a> {
    site: &'a SiteDumpConfig,
    max_len: usize,
}

impl<'a> HierarchicalSplitter<'a> {
    pub fn new(site: &'a SiteDumpConfig, max_len: usize) -> Self {
        Self { site, max_len }
    }

    /// Split the subtree of `root`, starting at the outermost level
    ///
    /// Nodes are moved out of `root` into the returned extracts.
    pub fn split(&self, tree: &mut Tree, root: NodeId) -> Vec<ExtractNode> {
        self.split_at(tree, root, 0)
    }

    pub fn split_at(&self, tree: &mut Tree, root: NodeId, level: usize) -> Vec<ExtractNode> {
        let Some(matcher) = self.site.split_tags.get(level) else {
            return vec![ExtractNode::leaf(tree, root)];
        };
        if level > self.site.mandatory_splits
            && render_text(tree, root).chars().count() <= self.max_len
        {
            return vec![ExtractNode::leaf(tree, root)];
        }

        let walk_level = WalkLevel {
            matcher,
            ignore_empty: self.site.ignore_empty_split_tags,
            numbered_titles: self.site.no_title_splits.contains(&level),
        };
        let splits = walk::split_nodes(tree, root, &walk_level);
        if splits
            .iter()
            .all(|&node| walk::is_empty_split(tree, node, &walk_level))
        {
            return self.split_at(tree, root, level + 1);
        }

        trace!(
            level,
            matcher = matcher.describe(),
            matches = splits.len(),
            "Splitting"
        );
        walk::walk(tree, root, &splits, &walk_level)
            .into_iter()
            .map(|piece| {
                let mut children = self.split_at(tree, piece.content, level + 1);
                if children.len() < 2 {
                    children.clear();
                }
                ExtractNode {
                    title: piece.title,
                    content: Some(piece.content),
                    anchor: piece.anchor,
                    links: piece.links,
                    children,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitTagSpec;
    use crate::dom::parse_page;
    use std::path::Path;

    fn site(split_tags: &[&str], mandatory: usize) -> SiteDumpConfig {
        SiteDumpConfig::builder("test", "https://x.org")
            .main_content("#root")
            .split_tags(
                split_tags
                    .iter()
                    .map(|tag| SplitTagSpec::Selector(tag.to_string()))
                    .collect(),
            )
            .mandatory_splits(mandatory)
            .build(Path::new("."))
            .unwrap()
    }

    fn split(html: &str, site: &SiteDumpConfig, max_len: usize) -> (Tree, Vec<ExtractNode>) {
        let selector = scraper::Selector::parse("#root").unwrap();
        let mut page = parse_page(html, &selector, None, &[]);
        let extracts = HierarchicalSplitter::new(site, max_len).split(&mut page.tree, page.root);
        (page.tree, extracts)
    }

    #[test]
    fn test_no_split_tags_gives_single_leaf() {
        let site = site(&["h1", "h2"], 3);
        let (tree, extracts) = split("<div id='root'><p>Just text.</p></div>", &site, 1000);
        assert_eq!(extracts.len(), 1);
        assert_eq!(extracts[0].title, "");
        assert!(extracts[0].children.is_empty());
        assert_eq!(extracts[0].text(&tree), "Just text.");
    }

    #[test]
    fn test_nested_levels() {
        let site = site(&["h2", "h3"], 3);
        let (tree, extracts) = split(
            "<div id='root'><p>Top</p><h2>A</h2><p>a</p><h3>A1</h3><p>a1</p><h3>A2</h3><p>a2</p>\
             <h2>B</h2><p>b</p></div>",
            &site,
            1000,
        );
        assert_eq!(
            outline(&extracts),
            "-  #\n- A #\n  -  #\n  - A1 #\n  - A2 #\n- B #\n"
        );
        assert_eq!(extracts[1].children[1].text(&tree), "a1");
        assert_eq!(extracts[1].children[0].text(&tree), "a");
        assert_eq!(extracts[2].text(&tree), "b");
    }

    #[test]
    fn test_short_content_stops_after_mandatory_levels() {
        let site = site(&["h2", "h3"], 0);
        let (_, extracts) = split(
            "<div id='root'><h2>A</h2><p>a</p><h3>A1</h3><p>a1</p><h3>A2</h3><p>a2</p></div>",
            &site,
            1000,
        );
        // Level 1 (h3) is optional and the text fits, so A stays whole
        assert_eq!(extracts.len(), 2);
        assert!(extracts[1].children.is_empty());
    }

    #[test]
    fn test_long_content_keeps_splitting() {
        let site = site(&["h2", "h3"], 0);
        let long = "word ".repeat(40);
        let html = format!(
            "<div id='root'><h2>A</h2><p>a</p><h3>A1</h3><p>{long}</p><h3>A2</h3><p>{long}</p></div>"
        );
        let (_, extracts) = split(&html, &site, 100);
        assert_eq!(extracts[1].children.len(), 3);
        assert_eq!(extracts[1].children[1].title, "A1");
    }
}
