//! Compound selectors evaluated against the arena

use super::{NodeId, Tree};
use thiserror::Error;

/// Error raised when a selector string cannot be parsed
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid selector '{selector}': {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrTest {
    Exists(String),
    Equals(String, String),
}

/// A single compound selector: `tag#id.class[attr][attr=value]`
///
/// Every part is optional but at least one must be present. `*` matches any
/// tag. Combinators are not supported; the full CSS engine is only used on
/// the raw document before it is copied into the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleSelector {
    source: String,
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl SimpleSelector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let source = selector.trim();
        let fail = |reason: &str| SelectorError {
            selector: selector.to_string(),
            reason: reason.to_string(),
        };
        if source.is_empty() {
            return Err(fail("empty selector"));
        }

        let mut parsed = Self {
            source: source.to_string(),
            tag: None,
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
        };

        let chars: Vec<char> = source.chars().collect();
        let mut pos = 0;
        let read_ident = |pos: &mut usize| -> String {
            let start = *pos;
            while *pos < chars.len() && (chars[*pos].is_alphanumeric() || matches!(chars[*pos], '-' | '_')) {
                *pos += 1;
            }
            chars[start..*pos].iter().collect()
        };

        if chars[0] == '*' {
            pos = 1;
        } else if chars[0].is_alphabetic() {
            parsed.tag = Some(read_ident(&mut pos).to_ascii_lowercase());
        }

        while pos < chars.len() {
            match chars[pos] {
                '#' => {
                    pos += 1;
                    let id = read_ident(&mut pos);
                    if id.is_empty() {
                        return Err(fail("expected an id after '#'"));
                    }
                    parsed.id = Some(id);
                }
                '.' => {
                    pos += 1;
                    let class = read_ident(&mut pos);
                    if class.is_empty() {
                        return Err(fail("expected a class after '.'"));
                    }
                    parsed.classes.push(class);
                }
                '[' => {
                    let close = chars[pos..]
                        .iter()
                        .position(|&c| c == ']')
                        .ok_or_else(|| fail("unterminated attribute test"))?;
                    let body: String = chars[pos + 1..pos + close].iter().collect();
                    pos += close + 1;
                    parsed.attrs.push(parse_attr(&body).ok_or_else(|| fail("malformed attribute test"))?);
                }
                c if c.is_whitespace() || matches!(c, '>' | '+' | '~' | ',') => {
                    return Err(fail("combinators are not supported"));
                }
                _ => return Err(fail("unexpected character")),
            }
        }

        Ok(parsed)
    }

    /// The selector as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the node is an element satisfying every part of the selector
    pub fn matches(&self, tree: &Tree, id: NodeId) -> bool {
        let Some(element) = tree.element(id) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|tag| tag != element.name) {
            return false;
        }
        if self.id.as_deref().is_some_and(|want| element.attr("id") != Some(want)) {
            return false;
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|test| match test {
            AttrTest::Exists(name) => element.attr(name).is_some(),
            AttrTest::Equals(name, value) => element.attr(name) == Some(value.as_str()),
        })
    }

    /// Every match below `root`, in document order
    pub fn select(&self, tree: &Tree, root: NodeId) -> Vec<NodeId> {
        tree.find_all(root, |tree, node| self.matches(tree, node))
    }
}

fn parse_attr(body: &str) -> Option<AttrTest> {
    match body.split_once('=') {
        None => {
            let name = body.trim();
            (!name.is_empty()).then(|| AttrTest::Exists(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
            (!name.is_empty()).then(|| AttrTest::Equals(name.to_string(), value.to_string()))
        }
    }
}
