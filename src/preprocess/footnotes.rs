//! Table footnotes
//!
//! A footnote is a `td` or `p` whose first non-blank child is a `<sup>`
//! marker (or which carries the `footnote` class). Cells refer to notes with
//! their own `<sup>`, possibly listing several markers separated by commas.

use crate::dom::{NodeId, Tree};

/// Footnotes of one table keyed by marker, in document order
#[derive(Debug, Default)]
pub(crate) struct Footnotes {
    notes: Vec<(String, NodeId)>,
}

impl Footnotes {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, NodeId)> {
        self.notes.iter()
    }

    fn get(&self, marker: &str) -> Option<NodeId> {
        self.notes
            .iter()
            .find(|(key, _)| key == marker)
            .map(|&(_, note)| note)
    }

    /// Copies of the notes a cell refers to, `None` when the cell has no marker
    ///
    /// With `remove_marker` the cell's `<sup>` is dropped.
    pub fn for_cell(&self, tree: &mut Tree, cell: NodeId, remove_marker: bool) -> Option<Vec<Vec<NodeId>>> {
        let sup = tree.find(cell, |tree, node| tree.is_tag(node, &["sup"]))?;
        let markers = tree.text_content(sup);
        let mut notes = Vec::new();
        for marker in markers.split(',').map(str::trim) {
            if let Some(note) = self.get(marker) {
                notes.push(copy_contents(tree, note));
            }
        }
        if remove_marker {
            tree.detach(sup);
        }
        Some(notes)
    }

    /// All notes of a cell combined into one inline `span`, or `None` when
    /// there are none
    pub fn combined(&self, tree: &mut Tree, cell: NodeId, remove_marker: bool) -> Option<NodeId> {
        let notes = self.for_cell(tree, cell, remove_marker)?;
        if notes.is_empty() {
            return None;
        }
        let span = tree.new_tag("span");
        for (i, note) in notes.into_iter().enumerate() {
            if i > 0 {
                tree.append_text(span, " ");
            }
            for node in note {
                tree.append(span, node);
            }
        }
        Some(span)
    }
}

/// Whether `node` is a footnote cell
pub(crate) fn is_footnote_cell(tree: &Tree, node: NodeId) -> bool {
    if !tree.is_tag(node, &["td", "p"]) {
        return false;
    }
    if tree.element(node).is_some_and(|e| e.has_class("footnote")) {
        return true;
    }
    for child in tree.children(node) {
        if tree.is_tag(child, &["sup"]) {
            return true;
        }
        if !tree.text_content(child).trim().is_empty() {
            return false;
        }
    }
    false
}

/// Detach every footnote cell of `table`, and the rows holding them
pub(crate) fn collect(tree: &mut Tree, table: NodeId) -> Footnotes {
    let mut footnotes = Footnotes::default();
    let mut rows = Vec::new();
    for cell in tree.find_all(table, is_footnote_cell) {
        let Some(sup) = tree.find(cell, |tree, node| tree.is_tag(node, &["sup"])) else {
            continue;
        };
        let marker = tree.text_content(sup).trim().to_string();
        tree.detach(sup);

        let row = tree
            .ancestors(cell)
            .take_while(|&node| node != table)
            .find(|&node| tree.is_tag(node, &["tr"]))
            .or_else(|| tree.find_previous(cell, |tree, node| tree.is_tag(node, &["tr"])))
            .filter(|&row| tree.is_ancestor(table, row));
        if let Some(row) = row {
            if !rows.contains(&row) {
                rows.push(row);
            }
        }
        tree.detach(cell);
        footnotes.notes.push((marker, cell));
    }
    for row in rows {
        tree.detach(row);
    }
    footnotes
}

/// Deep copies of the children of `note`, without leading or trailing newlines
fn copy_contents(tree: &mut Tree, note: NodeId) -> Vec<NodeId> {
    let mut children = tree.children(note);
    let is_newline = |tree: &Tree, node: NodeId| tree.text(node) == Some("\n");
    if children.first().is_some_and(|&first| is_newline(tree, first)) {
        children.remove(0);
    }
    if children.last().is_some_and(|&last| is_newline(tree, last)) {
        children.pop();
    }
    children
        .into_iter()
        .map(|child| tree.deep_clone(child))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_page, render_text};

    fn table(html: &str) -> (Tree, NodeId) {
        let selector = scraper::Selector::parse("table").unwrap();
        let page = parse_page(html, &selector, None, &[]);
        (page.tree, page.root)
    }

    #[test]
    fn test_collect_removes_footnote_rows() {
        let (mut tree, table) = table(
            "<table><tr><td>Course<sup>1</sup></td><td>3</td></tr>\
             <tr><td><sup>1</sup> Lab required.</td></tr></table>",
        );
        let footnotes = collect(&mut tree, table);
        assert_eq!(footnotes.iter().count(), 1);
        assert_eq!(tree.find_all(table, |t, n| t.is_tag(n, &["tr"])).len(), 1);

        let (marker, note) = footnotes.iter().next().unwrap();
        assert_eq!(marker, "1");
        assert_eq!(render_text(&tree, *note), "Lab required.");
    }

    #[test]
    fn test_cell_notes_and_marker_removal() {
        let (mut tree, table) = table(
            "<table><tr><td>A<sup>1,2</sup></td></tr>\
             <tr><td><sup>1</sup>First</td></tr><tr><td><sup>2</sup>Second</td></tr></table>",
        );
        let footnotes = collect(&mut tree, table);
        let cell = tree.find(table, |t, n| t.is_tag(n, &["td"])).unwrap();

        let combined = footnotes.combined(&mut tree, cell, true).unwrap();
        assert_eq!(render_text(&tree, combined), "First Second");
        assert_eq!(render_text(&tree, cell), "A");
        assert!(footnotes.for_cell(&mut tree, cell, false).is_none());
    }

    #[test]
    fn test_footnote_cell_detection() {
        let (tree, table) = table(
            "<table><tr><td> <sup>3</sup>note</td><td>Text <sup>3</sup></td>\
             <td class='footnote'>x</td></tr></table>",
        );
        let cells = tree.find_all(table, |t, n| t.is_tag(n, &["td"]));
        assert!(is_footnote_cell(&tree, cells[0]));
        assert!(!is_footnote_cell(&tree, cells[1]));
        assert!(is_footnote_cell(&tree, cells[2]));
    }
}
