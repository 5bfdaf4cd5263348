//! Plain-text rendering of content subtrees
//!
//! The rendered text is what extract lengths are measured against and what
//! ends up in the corpus. A subtree is serialized to HTML and converted with
//! `html2md`; inline markup is unwrapped beforehand so the markdown only
//! carries block structure. That structure is then flattened:
//!
//! - list items are marked with `- ` or their ordinal
//! - table rows become cells joined with ` | `
//! - numeric superscripts become `[n]` footnote markers
//! - lines broken inside a sentence are joined again

use super::{Emit, NodeId, Tree};
use regex::Regex;
use std::sync::OnceLock;

const SKIPPED: &[&str] = &[
    "script", "style", "head", "title", "noscript", "template", "img", "svg", "iframe", "button",
    "select", "input",
];

/// Rendered as paragraphs so no heading markers reach the text
const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6", "hr"];

/// Blocks `html2md` would otherwise run into their neighbours
const BLOCK: &[&str] = &[
    "main", "article", "nav", "aside", "blockquote", "dl", "dt", "dd", "figure", "figcaption",
    "form", "fieldset", "address", "details", "summary",
];

const INLINE: &[&str] = &[
    "a", "b", "strong", "i", "em", "u", "ins", "s", "del", "strike", "code", "sub", "sup", "q",
    "cite", "abbr", "small", "mark", "span", "font",
];

/// Render the subtree rooted at `root` to plain text
pub fn render_text(tree: &Tree, root: NodeId) -> String {
    let html = tree.to_html_with(root, &plain_markup);
    finish(&html2md::parse_html(&html))
}

fn plain_markup(tree: &Tree, id: NodeId) -> Emit {
    let Some(name) = tree.name(id) else {
        return Emit::Keep;
    };
    if SKIPPED.contains(&name) {
        return Emit::Skip;
    }
    if name == "sup" {
        let text = tree.text_content(id);
        let marker = text.trim();
        if !marker.is_empty() && marker.chars().all(|c| c.is_ascii_digit()) {
            return Emit::Text(format!("[{marker}]"));
        }
    }
    if HEADINGS.contains(&name) {
        Emit::Rename("p")
    } else if BLOCK.contains(&name) {
        Emit::Rename("div")
    } else if INLINE.contains(&name) {
        Emit::Unwrap
    } else {
        Emit::Keep
    }
}

fn list_item_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\s*)(?:([*+-])|(\d+\.))\s+(.*)$").unwrap_or_else(|_| unreachable!())
    })
}

fn escape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\\([[:punct:]])").unwrap_or_else(|_| unreachable!()))
}

/// One markdown line, classified
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Blank,
    Item(String),
    Text(String),
}

fn classify(line: &str) -> Option<Line> {
    let trimmed = line.trim();
    if trimmed.is_empty() || matches!(trimmed, "*" | "-" | "+") {
        return Some(Line::Blank);
    }
    if trimmed.starts_with("```") {
        return Some(Line::Blank);
    }
    if trimmed.len() > 1 && trimmed.starts_with('|') && trimmed.ends_with('|') {
        if trimmed.chars().all(|c| matches!(c, '|' | '-' | ':' | ' ')) {
            return None;
        }
        let cells: Vec<String> = trimmed[1..trimmed.len() - 1]
            .split('|')
            .map(|cell| unescape(cell.replace("<br>", " ").replace("<br/>", " ").trim()))
            .filter(|cell| !cell.is_empty())
            .collect();
        return Some(Line::Text(cells.join(" | ")));
    }
    if let Some(captures) = list_item_pattern().captures(line.trim_end()) {
        let indent = captures.get(1).map_or("", |m| m.as_str());
        let content = unescape(captures.get(4).map_or("", |m| m.as_str()));
        if content.is_empty() {
            return Some(Line::Blank);
        }
        let marker = match captures.get(3) {
            Some(ordinal) => ordinal.as_str(),
            None => "-",
        };
        return Some(Line::Item(format!("{indent}{marker} {content}")));
    }
    Some(Line::Text(unescape(trimmed)))
}

fn unescape(text: &str) -> String {
    escape_pattern().replace_all(text, "$1").into_owned()
}

/// Flatten markdown into plain text
///
/// Blank runs are capped at one. Lists are set off from surrounding text by
/// a blank line, and text lines broken between two words are joined.
fn finish(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut previous: Option<Line> = None;
    let mut blank = false;

    for line in markdown.lines().filter_map(classify) {
        let line = match line {
            Line::Blank => {
                blank = previous.is_some();
                continue;
            }
            line => line,
        };

        let separator = match (&previous, &line) {
            (None, _) => "",
            (Some(Line::Text(_)), Line::Item(_)) | (Some(Line::Item(_)), Line::Text(_)) => "\n\n",
            _ if blank => "\n\n",
            (Some(Line::Text(prev)), Line::Text(next))
                if prev.ends_with(is_word) && next.starts_with(is_word) =>
            {
                " "
            }
            _ => "\n",
        };
        out.push_str(separator);
        match &line {
            Line::Item(text) | Line::Text(text) => out.push_str(text),
            Line::Blank => {}
        }
        previous = Some(line);
        blank = false;
    }
    out
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
