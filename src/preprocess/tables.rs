//! Table to nested list conversion
//!
//! Tables read poorly once flattened to text, so they are rewritten into
//! bulleted lists before splitting. Rows holding a heading, or a single `th`,
//! become split-class titles so the splitter can cut long tables apart.

use super::error::RewriteError;
use super::footnotes::{self, Footnotes};
use crate::config::{SPLIT_CLASS, TITLE_TAGS};
use crate::dom::{normalize_whitespace, NodeId, Tree};

const DEGREE_HEADERS: &[&str] = &[
    "First Year",
    "Lower-level Requirements",
    "Lower-Level Prerequisites",
    "Term 1",
    "Year One",
];

const DEGREE_TOTALS: &[&str] = &["total credits", "program total"];

const CONTINUATION_HEADER: &str = "Sessional Average & Course Success";

/// Standings heading the columns after the first in continuation tables
const STANDINGS: &[&str] = &[
    "Good standing",
    "Academic Probation (ACPR)",
    "Failed standing, permitted to continue",
];

const PROMOTION_TITLE: &str = "Specialization-Specific Courses Required for Promotion";

/// Layout of a table, deciding how data rows are converted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    /// Course lists with a credit column
    DegreeRequirements,

    /// Standing reached for each sessional average, per entering standing
    ContinuationRequirements,

    /// Courses grouped under single-cell rows naming the specialization
    PromotionCourses,

    /// Row and column headers, with an empty top-left header cell
    DoubleIndexed,

    Generic,
}

impl TableShape {
    /// Shape of `table`, whose closest heading reads `title`
    ///
    /// Only tables with a header cell can hold degree requirements.
    pub fn detect(tree: &Tree, table: NodeId, title: &str) -> Self {
        let first_header = tree
            .find(table, |tree, node| tree.is_tag(node, &["th"]))
            .map(|th| tree.text_content(th).trim().to_string());

        let degree = first_header.as_deref().is_some_and(|header| {
            DEGREE_HEADERS.contains(&header) || has_degree_total(tree, table)
        });
        if degree {
            return Self::DegreeRequirements;
        }
        if first_header
            .as_deref()
            .is_some_and(|header| header.contains(CONTINUATION_HEADER))
        {
            return Self::ContinuationRequirements;
        }
        if title.contains(PROMOTION_TITLE) {
            return Self::PromotionCourses;
        }
        if first_header.is_some_and(|text| text.is_empty()) {
            return Self::DoubleIndexed;
        }
        Self::Generic
    }
}

fn has_degree_total(tree: &Tree, table: NodeId) -> bool {
    tree.descendants(table).into_iter().any(|node| {
        tree.text(node)
            .is_some_and(|text| DEGREE_TOTALS.contains(&text.trim().to_lowercase().as_str()))
    })
}

struct Header {
    text: String,
    note: Option<NodeId>,
}

/// Convert `table` into a `div` of lists
///
/// `table` is consumed: its cells are moved into the output. Callers that
/// need the original on failure convert a copy.
pub fn convert(tree: &mut Tree, table: NodeId, shape: TableShape) -> Result<NodeId, RewriteError> {
    let footnotes = footnotes::collect(tree, table);
    let has_cells = tree
        .find(table, |tree, node| tree.is_tag(node, &["td", "th"]))
        .is_some();
    if !footnotes.is_empty() && !has_cells {
        return Ok(footnote_list(tree, &footnotes));
    }

    let output = tree.new_tag("div");
    let mut list = tree.new_tag("ul");
    tree.append(output, list);
    let mut headers: Option<Vec<Header>> = None;
    let mut group: Option<String> = None;

    for (row_number, row) in own_rows(tree, table).into_iter().enumerate() {
        if let Some(heading) = tree.find(row, |tree, node| tree.is_tag(node, TITLE_TAGS)) {
            let title = normalize_whitespace(&tree.text_content(heading));
            let paragraph = tree.new_tag_with_class("p", SPLIT_CLASS);
            tree.append_text(paragraph, title);
            tree.append(output, paragraph);
            list = new_list(tree, output);
            continue;
        }

        let cells = row_cells(tree, row);
        let Some(&first) = cells.first() else {
            continue;
        };

        if cells.len() == 1 && tree.is_tag(first, &["th"]) {
            let note = footnotes.combined(tree, first, true);
            let title = tree.text_content(first).trim().to_string();
            let paragraph = tree.new_tag("p");
            let div = tree.new_tag_with_class("div", SPLIT_CLASS);
            tree.append_text(div, title);
            append_note(tree, div, note);
            tree.append(paragraph, div);
            tree.append(output, paragraph);
            list = new_list(tree, output);
            continue;
        }

        if let Some(subtable) = tree.find(first, |tree, node| tree.is_tag(node, &["table"])) {
            let converted = convert(tree, subtable, shape)?;
            tree.append(output, converted);
            tree.detach(subtable);
            continue;
        }

        if tree.is_tag(first, &["th"]) {
            let mut row_headers = Vec::with_capacity(cells.len());
            for &cell in &cells {
                let note = footnotes.combined(tree, cell, true);
                let text = tree.text_content(cell).trim().to_string();
                row_headers.push(Header { text, note });
            }
            headers = Some(row_headers);
            continue;
        }

        let rows = RowContext {
            footnotes: &footnotes,
            headers: headers.as_deref(),
            row_number,
        };
        let item = match shape {
            TableShape::Generic => Some(rows.generic(tree, &cells)?),
            TableShape::DoubleIndexed => Some(rows.double_indexed(tree, &cells)?),
            TableShape::DegreeRequirements => Some(rows.degree_requirement(tree, &cells)),
            TableShape::ContinuationRequirements => rows.continuation(tree, &cells),
            TableShape::PromotionCourses => rows.promotion(tree, &cells, &mut group)?,
        };
        if let Some(item) = item {
            tree.append(list, item);
        }
    }
    Ok(output)
}

/// Rows of `table` itself, leaving out those of nested tables
fn own_rows(tree: &Tree, table: NodeId) -> Vec<NodeId> {
    tree.find_all(table, |tree, node| {
        tree.is_tag(node, &["tr"])
            && tree
                .ancestors(node)
                .find(|&ancestor| tree.is_tag(ancestor, &["table"]))
                == Some(table)
    })
}

/// `td`/`th` children of a row, without trailing blank cells
fn row_cells(tree: &Tree, row: NodeId) -> Vec<NodeId> {
    let mut cells: Vec<NodeId> = tree
        .children(row)
        .into_iter()
        .filter(|&child| tree.is_tag(child, &["td", "th"]))
        .collect();
    while cells
        .last()
        .is_some_and(|&cell| tree.text_content(cell).trim().is_empty())
    {
        cells.pop();
    }
    cells
}

fn new_list(tree: &mut Tree, output: NodeId) -> NodeId {
    let list = tree.new_tag("ul");
    tree.append(output, list);
    list
}

fn append_note(tree: &mut Tree, into: NodeId, note: Option<NodeId>) {
    if let Some(note) = note {
        tree.append_text(into, " (");
        tree.append(into, note);
        tree.append_text(into, ")");
    }
}

/// `[n] note` items for a table holding nothing but footnotes
fn footnote_list(tree: &mut Tree, footnotes: &Footnotes) -> NodeId {
    let list = tree.new_tag("ul");
    for (marker, note) in footnotes.iter() {
        let item = tree.new_tag("li");
        tree.append_text(item, format!("[{marker}] "));
        tree.append_children_of(item, *note);
        tree.append(list, item);
    }
    list
}

struct RowContext<'a> {
    footnotes: &'a Footnotes,
    headers: Option<&'a [Header]>,
    row_number: usize,
}

impl RowContext<'_> {
    fn header(&self, index: usize, cells: usize) -> Result<&Header, RewriteError> {
        let headers = self.headers.ok_or(RewriteError::MissingHeaders {
            row: self.row_number,
        })?;
        headers.get(index).ok_or(RewriteError::HeaderMismatch {
            row: self.row_number,
            cells,
            headers: headers.len(),
        })
    }

    /// Cell contents followed by the notes its marker refers to
    fn cell(&self, tree: &mut Tree, into: NodeId, cell: NodeId) {
        let note = self.footnotes.combined(tree, cell, true);
        tree.append_children_of(into, cell);
        append_note(tree, into, note);
    }

    /// `header: cell`, with the notes of both
    fn cell_with_header(&self, tree: &mut Tree, into: NodeId, cell: NodeId, header: &Header) {
        tree.append_text(into, format!("{}: ", header.text));
        self.cell(tree, into, cell);
        let header_note = header.note.map(|note| tree.deep_clone(note));
        append_note(tree, into, header_note);
    }

    /// First cell as a sub-title with the other cells nested under it
    fn indexed(
        &self,
        tree: &mut Tree,
        cells: &[NodeId],
        prefix: Option<&str>,
    ) -> Result<NodeId, RewriteError> {
        let item = tree.new_tag("li");
        let title = tree.new_tag("strong");
        if let Some(prefix) = prefix {
            tree.append_text(title, format!("{prefix}: "));
        }
        tree.append_children_of(title, cells[0]);
        tree.append(item, title);
        let nested = tree.new_tag("ul");
        tree.append(item, nested);
        for (index, &cell) in cells.iter().enumerate().skip(1) {
            let header = self.header(index, cells.len())?;
            let nested_item = tree.new_tag("li");
            self.cell_with_header(tree, nested_item, cell, header);
            tree.append(nested, nested_item);
        }
        Ok(item)
    }

    fn generic(&self, tree: &mut Tree, cells: &[NodeId]) -> Result<NodeId, RewriteError> {
        match self.headers {
            None if cells.len() == 2 => {
                let item = tree.new_tag("li");
                self.cell(tree, item, cells[0]);
                tree.append_text(item, ": ");
                self.cell(tree, item, cells[1]);
                Ok(item)
            }
            _ if cells.len() == 1 => {
                let item = tree.new_tag("li");
                self.cell(tree, item, cells[0]);
                Ok(item)
            }
            None => {
                let item = tree.new_tag("li");
                for &cell in cells {
                    tree.append_children_of(item, cell);
                    tree.append_text(item, "; ");
                }
                Ok(item)
            }
            Some(headers) if headers.first().is_some_and(|h| h.text.is_empty()) => {
                self.indexed(tree, cells, None)
            }
            Some(_) => {
                let item = tree.new_tag("li");
                for (index, &cell) in cells.iter().enumerate() {
                    let header = self.header(index, cells.len())?;
                    self.cell_with_header(tree, item, cell, header);
                    tree.append_text(item, "; ");
                }
                Ok(item)
            }
        }
    }

    fn double_indexed(&self, tree: &mut Tree, cells: &[NodeId]) -> Result<NodeId, RewriteError> {
        if self.headers.is_none() {
            return Err(RewriteError::MissingHeaders {
                row: self.row_number,
            });
        }
        self.indexed(tree, cells, None)
    }

    /// Sessional average with the new standing for each entering standing
    ///
    /// Rows with a blank first cell carry nothing and are dropped.
    fn continuation(&self, tree: &mut Tree, cells: &[NodeId]) -> Option<NodeId> {
        let average = normalize_whitespace(&tree.text_content(cells[0]));
        if average.is_empty() {
            return None;
        }
        let item = tree.new_tag("li");
        let title = tree.new_tag("strong");
        tree.append_text(title, format!("Sessional average & course success: {average}"));
        tree.append(item, title);
        let nested = tree.new_tag("ul");
        tree.append(item, nested);
        for (standing, &cell) in STANDINGS.iter().zip(&cells[1..]) {
            let nested_item = tree.new_tag("li");
            tree.append_text(
                nested_item,
                format!("Standing Upon Entering Session: {standing}; New Standing: "),
            );
            self.cell(tree, nested_item, cell);
            tree.append(nested, nested_item);
        }
        Some(item)
    }

    /// Course rows under the specialization named by the last single-cell row
    fn promotion(
        &self,
        tree: &mut Tree,
        cells: &[NodeId],
        group: &mut Option<String>,
    ) -> Result<Option<NodeId>, RewriteError> {
        if cells.len() == 1 {
            *group = Some(normalize_whitespace(&tree.text_content(cells[0])));
            return Ok(None);
        }
        self.indexed(tree, cells, group.as_deref()).map(Some)
    }

    fn degree_requirement(&self, tree: &mut Tree, cells: &[NodeId]) -> NodeId {
        let notes = self
            .footnotes
            .for_cell(tree, cells[0], true)
            .unwrap_or_default();
        let item = tree.new_tag("li");
        if cells.len() != 2 {
            tree.append_children_of(item, cells[0]);
            return item;
        }

        let course = normalize_whitespace(&tree.text_content(cells[0]));
        let credits = normalize_whitespace(&tree.text_content(cells[1]));
        tree.append_text(item, format!("{credits} credits of {course}"));
        if !notes.is_empty() {
            let nested = tree.new_tag("ul");
            for note in notes {
                let note_item = tree.new_tag("li");
                for node in note {
                    tree.append(note_item, node);
                }
                tree.append(nested, note_item);
            }
            tree.append(item, nested);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_page, render_text};

    fn convert_html(html: &str) -> Result<String, RewriteError> {
        let selector = scraper::Selector::parse("table").unwrap();
        let mut page = parse_page(html, &selector, None, &[]);
        let shape = TableShape::detect(&page.tree, page.root, "");
        let output = convert(&mut page.tree, page.root, shape)?;
        Ok(render_text(&page.tree, output))
    }

    fn shape(html: &str) -> TableShape {
        shape_under(html, "")
    }

    fn shape_under(html: &str, title: &str) -> TableShape {
        let selector = scraper::Selector::parse("table").unwrap();
        let page = parse_page(html, &selector, None, &[]);
        TableShape::detect(&page.tree, page.root, title)
    }

    /// Non-blank lines with trailing whitespace removed
    fn lines(text: &str) -> Vec<&str> {
        text.lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect()
    }

    #[test]
    fn test_shape_detection() {
        assert_eq!(
            shape("<table><tr><th>First Year</th><th>Credits</th></tr></table>"),
            TableShape::DegreeRequirements
        );
        assert_eq!(
            shape("<table><tr><th>Course</th><th>Credits</th></tr><tr><td>Total Credits</td><td>3</td></tr></table>"),
            TableShape::DegreeRequirements
        );
        assert_eq!(
            shape("<table><tr><td>Math</td><td>3</td></tr><tr><td>Total Credits</td><td>3</td></tr></table>"),
            TableShape::Generic
        );
        assert_eq!(
            shape("<table><tr><th>Sessional Average &amp; Course Success</th><th>Good</th></tr></table>"),
            TableShape::ContinuationRequirements
        );
        assert_eq!(
            shape_under(
                "<table><tr><th>Course</th><th>Credits</th></tr></table>",
                "B.Sc. Specialization-Specific Courses Required for Promotion"
            ),
            TableShape::PromotionCourses
        );
        assert_eq!(
            shape("<table><tr><th></th><th>Fall</th></tr></table>"),
            TableShape::DoubleIndexed
        );
        assert_eq!(
            shape("<table><tr><th>Name</th><th>Room</th></tr></table>"),
            TableShape::Generic
        );
    }

    #[test]
    fn test_generic_rows_with_headers_and_footnotes() {
        let text = convert_html(
            "<table><tr><th>Course</th><th>Credits</th></tr>\
             <tr><td>Math<sup>1</sup></td><td>3</td></tr>\
             <tr><td><sup>1</sup>Calculus only</td></tr></table>",
        )
        .unwrap();
        assert_eq!(text, "- Course: Math (Calculus only); Credits: 3;");
    }

    #[test]
    fn test_generic_rows_without_headers() {
        let text = convert_html(
            "<table><tr><td>Phone</td><td>555</td></tr><tr><td>a</td><td>b</td><td>c</td></tr>\
             <tr><td>alone</td></tr></table>",
        )
        .unwrap();
        assert_eq!(lines(&text), vec!["- Phone: 555", "- a; b; c;", "- alone"]);
    }

    #[test]
    fn test_title_rows_become_split_paragraphs() {
        let selector = scraper::Selector::parse("table").unwrap();
        let mut page = parse_page(
            "<table><tr><td><h3>Fees</h3></td></tr><tr><td>Tuition</td><td>$10</td></tr>\
             <tr><th>Housing</th></tr><tr><td>Dorm</td><td>$5</td></tr></table>",
            &selector,
            None,
            &[],
        );
        let output = convert(&mut page.tree, page.root, TableShape::Generic).unwrap();
        let titles = page
            .tree
            .find_all(output, |tree, node| {
                tree.element(node).is_some_and(|e| e.has_class(SPLIT_CLASS))
            })
            .into_iter()
            .map(|node| render_text(&page.tree, node))
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Fees", "Housing"]);
        assert_eq!(
            render_text(&page.tree, output),
            "Fees\n\n- Tuition: $10\n\nHousing\n\n- Dorm: $5"
        );
    }

    #[test]
    fn test_double_indexed_rows() {
        let text = convert_html(
            "<table><tr><th></th><th>Fall</th><th>Winter</th></tr>\
             <tr><td>MATH 100</td><td>Yes</td><td>No</td></tr></table>",
        )
        .unwrap();
        let lines = lines(&text);
        assert_eq!(lines[0], "- MATH 100");
        let nested: Vec<&str> = lines[1..].iter().map(|line| line.trim_start()).collect();
        assert_eq!(nested, vec!["- Fall: Yes", "- Winter: No"]);
        assert!(lines[1].starts_with(' '));
    }

    #[test]
    fn test_degree_requirement_rows() {
        let text = convert_html(
            "<table><tr><th>First Year</th><th>Credits</th></tr>\
             <tr><td>MATH 100<sup>2</sup></td><td>3</td></tr>\
             <tr><td>Electives</td></tr>\
             <tr><td><sup>2</sup>Or MATH 110.</td></tr></table>",
        )
        .unwrap();
        assert!(text.starts_with("- 3 credits of MATH 100"));
        assert!(lines(&text)
            .iter()
            .any(|line| line.starts_with(' ') && line.trim_start() == "- Or MATH 110."));
        assert!(text.ends_with("- Electives"));
    }

    #[test]
    fn test_footnote_only_table() {
        let text = convert_html(
            "<table><tr><td><sup>1</sup>First note</td></tr><tr><td><sup>2</sup>Second</td></tr></table>",
        )
        .unwrap();
        assert_eq!(lines(&text), vec!["- [1] First note", "- [2] Second"]);
    }

    #[test]
    fn test_nested_tables_are_converted() {
        let text = convert_html(
            "<table><tr><td><table><tr><td>inner</td><td>1</td></tr></table></td></tr>\
             <tr><td>outer</td><td>2</td></tr></table>",
        )
        .unwrap();
        assert!(text.contains("- inner: 1"));
        assert!(text.contains("- outer: 2"));
        assert!(!text.contains('|'));
    }

    #[test]
    fn test_continuation_rows() {
        let text = convert_html(
            "<table><tr><th>Sessional Average &amp; Course Success</th><th>Good</th>\
             <th>Probation</th><th>Failed</th></tr>\
             <tr><td></td><td>note</td></tr>\
             <tr><td>65% or higher</td><td>Good standing</td><td>Good standing</td>\
             <td>Academic Probation</td></tr></table>",
        )
        .unwrap();
        let lines = lines(&text);
        assert_eq!(lines[0], "- Sessional average & course success: 65% or higher");
        let nested: Vec<&str> = lines[1..].iter().map(|line| line.trim_start()).collect();
        assert_eq!(
            nested,
            vec![
                "- Standing Upon Entering Session: Good standing; New Standing: Good standing",
                "- Standing Upon Entering Session: Academic Probation (ACPR); New Standing: Good standing",
                "- Standing Upon Entering Session: Failed standing, permitted to continue; \
                 New Standing: Academic Probation",
            ]
        );
    }

    #[test]
    fn test_promotion_rows_are_grouped() {
        let selector = scraper::Selector::parse("table").unwrap();
        let mut page = parse_page(
            "<table><tr><th>Course</th><th>Grade</th><th>Credits</th></tr>\
             <tr><td>Physics</td></tr>\
             <tr><td>PHYS 200</td><td>C</td><td>3</td></tr></table>",
            &selector,
            None,
            &[],
        );
        let output = convert(&mut page.tree, page.root, TableShape::PromotionCourses).unwrap();
        let text = render_text(&page.tree, output);
        let lines = lines(&text);
        assert_eq!(lines[0], "- Physics: PHYS 200");
        let nested: Vec<&str> = lines[1..].iter().map(|line| line.trim_start()).collect();
        assert_eq!(nested, vec!["- Grade: C", "- Credits: 3"]);
    }

    #[test]
    fn test_more_cells_than_headers_fails() {
        let err = convert_html(
            "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td><td>3</td></tr></table>",
        )
        .unwrap_err();
        assert!(matches!(err, RewriteError::HeaderMismatch { cells: 3, headers: 2, .. }));
    }

    #[test]
    fn test_double_indexed_without_headers_fails() {
        let selector = scraper::Selector::parse("table").unwrap();
        let mut page = parse_page(
            "<table><tr><td>x</td><td>y</td></tr></table>",
            &selector,
            None,
            &[],
        );
        let err = convert(&mut page.tree, page.root, TableShape::DoubleIndexed).unwrap_err();
        assert!(matches!(err, RewriteError::MissingHeaders { row: 0 }));
    }
}
