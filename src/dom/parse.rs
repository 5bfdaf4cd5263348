//! Copy a parsed `scraper` document into the arena

use super::{Element, NodeId, Tree};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Main content of one page, ready for rewriting and splitting
#[derive(Debug)]
pub struct ParsedPage {
    pub tree: Tree,

    /// Copy of the main-content element
    pub root: NodeId,

    /// Whitespace-normalized text of the first title match, empty if none
    pub title: String,

    /// False when the main-content selector matched nothing and the whole
    /// document was used instead
    pub found_main: bool,
}

/// Parse `html` and copy its main content into a fresh [`Tree`]
///
/// Subtrees matching any of `remove` are left out, as are comments, doctypes
/// and processing instructions.
pub fn parse_page(
    html: &str,
    main_content: &Selector,
    title: Option<&Selector>,
    remove: &[Selector],
) -> ParsedPage {
    let document = Html::parse_document(html);

    let title = title
        .and_then(|selector| document.select(selector).next())
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default();

    let main = document.select(main_content).next();
    let found_main = main.is_some();
    let source = main.unwrap_or_else(|| document.root_element());

    let skip: HashSet<_> = remove
        .iter()
        .flat_map(|selector| document.select(selector))
        .map(|el| el.id())
        .collect();

    let mut tree = Tree::new();
    let root = tree.new_element(copy_element(source));
    let mut stack = vec![(source, root)];
    while let Some((element, parent)) = stack.pop() {
        for child in element.children() {
            match child.value() {
                scraper::Node::Text(text) => {
                    let text: &str = &text.text;
                    tree.append_text(parent, text);
                }
                scraper::Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if skip.contains(&child.id()) {
                        continue;
                    }
                    let id = tree.new_element(copy_element(child));
                    tree.append(parent, id);
                    stack.push((child, id));
                }
                _ => {}
            }
        }
    }

    ParsedPage {
        tree,
        root,
        title,
        found_main,
    }
}

fn copy_element(element: ElementRef<'_>) -> Element {
    let value = element.value();
    Element {
        name: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect(),
    }
}

/// Collapse every whitespace run to a single space and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
