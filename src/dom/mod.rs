//! # Content Tree Module
//!
//! An arena of HTML nodes addressed by [`NodeId`]. Every node stores explicit
//! parent, child and sibling links, so moving a subtree from one place to
//! another is a detach followed by an append: a node is never reachable from
//! two parents at once.
//!
//! Pages are parsed with `scraper` (see [`parse`]) and copied into the arena,
//! which is then rewritten by the preprocessor and cut up by the splitter.
//! Detached nodes simply stay in the arena until the tree is dropped.
//!
//! ## Key Components
//!
//! - `Tree`: the arena with navigation and mutation primitives
//! - `Element` / `NodeData`: node payloads
//! - `SimpleSelector`: `tag#id.class[attr=value]` matcher used by site configs
//! - `render_text`: plain-text rendering through `html2md`, used for lengths and extract text

mod parse;
mod select;
mod text;

pub use parse::{normalize_whitespace, parse_page, ParsedPage};
pub use select::{SelectorError, SimpleSelector};
pub use text::render_text;

/// Index of a node in a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub name: String,

    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Value of the attribute `name`, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the whitespace-separated `class` attribute contains `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
        }
    }
}

/// Arena holding every node of a page
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element
    pub fn new_element(&mut self, element: Element) -> NodeId {
        self.push(NodeData::Element(element))
    }

    /// Create a detached element with the given tag name and no attributes
    pub fn new_tag(&mut self, name: &str) -> NodeId {
        self.new_element(Element::new(name))
    }

    /// Create a detached element with a single `class` attribute
    pub fn new_tag_with_class(&mut self, name: &str, class: &str) -> NodeId {
        self.new_element(Element {
            name: name.to_string(),
            attrs: vec![("class".to_string(), class.to_string())],
        })
    }

    /// Create a detached text node
    pub fn new_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    /// Tag name of an element node
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Whether `id` is an element with one of the given tag names
    pub fn is_tag(&self, id: NodeId, names: &[&str]) -> bool {
        self.name(id).is_some_and(|name| names.contains(&name))
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Direct children of `id`, in order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut next = self.first_child(id);
        while let Some(child) = next {
            children.push(child);
            next = self.next_sibling(child);
        }
        children
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&node| self.parent(node))
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|node| node == ancestor)
    }

    /// Next node in document order below `root`, descending into children
    pub fn next_in_order(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(id) {
            return Some(child);
        }
        self.next_after_subtree(id, root)
    }

    /// Next node in document order below `root` that is not a descendant of `id`
    pub fn next_after_subtree(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            if current == root {
                return None;
            }
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = self.parent(current)?;
        }
    }

    /// Previous node in document order, including ancestors
    pub fn prev_in_order(&self, id: NodeId) -> Option<NodeId> {
        match self.prev_sibling(id) {
            Some(mut node) => {
                while let Some(last) = self.last_child(node) {
                    node = last;
                }
                Some(node)
            }
            None => self.parent(id),
        }
    }

    /// All descendants of `root` in document order, excluding `root`
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.first_child(root);
        while let Some(node) = next {
            out.push(node);
            next = self.next_in_order(node, root);
        }
        out
    }

    /// First descendant of `root` in document order satisfying `pred`
    pub fn find(&self, root: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        let mut next = self.first_child(root);
        while let Some(node) = next {
            if pred(self, node) {
                return Some(node);
            }
            next = self.next_in_order(node, root);
        }
        None
    }

    /// Every descendant of `root` in document order satisfying `pred`
    pub fn find_all(&self, root: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&node| pred(self, node))
            .collect()
    }

    /// Nearest node before `id` in document order satisfying `pred`
    pub fn find_previous(&self, id: NodeId, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<NodeId> {
        let mut prev = self.prev_in_order(id);
        while let Some(node) = prev {
            if pred(self, node) {
                return Some(node);
            }
            prev = self.prev_in_order(node);
        }
        None
    }

    /// Concatenated text of `id` and all its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.text(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Unlink `id` from its parent and siblings; its own subtree stays attached to it
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.node(id);
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if let Some(prev) = prev {
            self.node_mut(prev).next_sibling = next;
        } else if let Some(parent) = parent {
            self.node_mut(parent).first_child = next;
        }
        if let Some(next) = next {
            self.node_mut(next).prev_sibling = prev;
        } else if let Some(parent) = parent {
            self.node_mut(parent).last_child = prev;
        }
        let node = self.node_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.node(parent).last_child;
        {
            let node = self.node_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = last;
        }
        match last {
            Some(last) => self.node_mut(last).next_sibling = Some(child),
            None => self.node_mut(parent).first_child = Some(child),
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Append a new text node to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: impl Into<String>) -> NodeId {
        let id = self.new_text(text);
        self.append(parent, id);
        id
    }

    /// Move every child of `from` to the end of `to`
    pub fn append_children_of(&mut self, to: NodeId, from: NodeId) {
        for child in self.children(from) {
            self.append(to, child);
        }
    }

    /// Move `new` to the position of `sibling`, just before it
    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        self.detach(new);
        let (parent, prev) = {
            let node = self.node(sibling);
            (node.parent, node.prev_sibling)
        };
        {
            let node = self.node_mut(new);
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = Some(sibling);
        }
        self.node_mut(sibling).prev_sibling = Some(new);
        match prev {
            Some(prev) => self.node_mut(prev).next_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.node_mut(parent).first_child = Some(new);
                }
            }
        }
    }

    /// Put `new` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        for child in self.children(id) {
            self.detach(child);
        }
    }

    /// Copy of the node without its children
    pub fn shallow_clone(&mut self, id: NodeId) -> NodeId {
        let data = self.node(id).data.clone();
        self.push(data)
    }

    /// Copy of the node and its whole subtree
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let copy = self.shallow_clone(id);
        for child in self.children(id) {
            let child_copy = self.deep_clone(child);
            self.append(copy, child_copy);
        }
        copy
    }

    /// Serialize the subtree of `id` back to HTML
    pub fn to_html(&self, id: NodeId) -> String {
        self.to_html_with(id, &|_, _| Emit::Keep)
    }

    /// Serialize the subtree of `id`, letting `emit` decide per element
    pub fn to_html_with(&self, id: NodeId, emit: &dyn Fn(&Tree, NodeId) -> Emit) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out, emit);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String, emit: &dyn Fn(&Tree, NodeId) -> Emit) {
        let element = match self.data(id) {
            NodeData::Text(text) => {
                out.push_str(&escape(text, false));
                return;
            }
            NodeData::Element(element) => element,
        };
        let (name, attrs) = match emit(self, id) {
            Emit::Keep => (element.name.as_str(), element.attrs.as_slice()),
            Emit::Rename(name) => (name, &[][..]),
            Emit::Unwrap => {
                for child in self.children(id) {
                    self.write_html(child, out, emit);
                }
                return;
            }
            Emit::Text(text) => {
                out.push_str(&escape(&text, false));
                return;
            }
            Emit::Skip => return,
        };

        out.push('<');
        out.push_str(name);
        for (key, value) in attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value, true));
            out.push('"');
        }
        out.push('>');
        if is_void(name) {
            return;
        }
        for child in self.children(id) {
            self.write_html(child, out, emit);
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

/// How [`Tree::to_html_with`] writes one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emit {
    /// Tag, attributes and children
    Keep,
    /// Children under another tag, without attributes
    Rename(&'static str),
    /// Children only
    Unwrap,
    /// Text in place of the whole element
    Text(String),
    Skip,
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "source" | "track" | "wbr"
    )
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.new_tag("div");
        let a = tree.new_tag("p");
        let b = tree.new_tag("p");
        tree.append(root, a);
        tree.append(root, b);
        let t = tree.append_text(a, "hello");
        (tree, root, a, b, t)
    }

    #[test]
    fn test_append_and_children() {
        let (tree, root, a, b, t) = sample();
        assert_eq!(tree.children(root), vec![a, b]);
        assert_eq!(tree.parent(t), Some(a));
        assert_eq!(tree.next_sibling(a), Some(b));
        assert_eq!(tree.prev_sibling(b), Some(a));
        assert_eq!(tree.text_content(root), "hello");
    }

    #[test]
    fn test_moving_a_node_detaches_it() {
        let (mut tree, root, a, b, t) = sample();
        tree.append(b, t);
        assert!(tree.children(a).is_empty());
        assert_eq!(tree.children(b), vec![t]);
        assert_eq!(tree.descendants(root), vec![a, b, t]);
    }

    #[test]
    fn test_replace_and_insert_before() {
        let (mut tree, root, a, b, _) = sample();
        let c = tree.new_tag("ul");
        tree.replace(a, c);
        assert_eq!(tree.children(root), vec![c, b]);
        assert_eq!(tree.parent(a), None);

        let d = tree.new_tag("hr");
        tree.insert_before(c, d);
        assert_eq!(tree.children(root), vec![d, c, b]);
    }

    #[test]
    fn test_document_order_navigation() {
        let (mut tree, root, a, b, t) = sample();
        let u = tree.append_text(b, "world");
        assert_eq!(tree.next_in_order(t, root), Some(b));
        assert_eq!(tree.next_after_subtree(a, root), Some(b));
        assert_eq!(tree.next_in_order(u, root), None);
        assert_eq!(tree.prev_in_order(b), Some(t));
        assert_eq!(tree.prev_in_order(t), Some(a));
        assert_eq!(
            tree.find_previous(u, |tree, n| tree.is_tag(n, &["p"])),
            Some(b)
        );
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let (mut tree, root, _, _, _) = sample();
        let copy = tree.deep_clone(root);
        assert_eq!(tree.to_html(copy), tree.to_html(root));
        let first = tree.first_child(copy).unwrap();
        tree.detach(first);
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.to_html(root), "<div><p>hello</p><p></p></div>");
    }

    #[test]
    fn test_to_html_with_rewrites_elements() {
        let (mut tree, root, a, b, _) = sample();
        let link = tree.new_element(Element {
            name: "a".to_string(),
            attrs: vec![("href".to_string(), "x.html".to_string())],
        });
        tree.append(b, link);
        tree.append_text(link, "1 < 2");
        let html = tree.to_html_with(root, &|tree, node| {
            if node == a {
                Emit::Rename("section")
            } else if tree.is_tag(node, &["a"]) {
                Emit::Unwrap
            } else {
                Emit::Keep
            }
        });
        assert_eq!(html, "<div><section>hello</section><p>1 &lt; 2</p></div>");

        let html = tree.to_html_with(root, &|_, node| match node {
            n if n == a => Emit::Skip,
            n if n == b => Emit::Text("[1]".to_string()),
            _ => Emit::Keep,
        });
        assert_eq!(html, "<div>[1]</div>");
    }

    #[test]
    fn test_element_classes() {
        let element = Element {
            name: "div".to_string(),
            attrs: vec![("class".to_string(), "a extractor-split".to_string())],
        };
        assert!(element.has_class("extractor-split"));
        assert!(!element.has_class("extractor"));
        assert_eq!(element.attr("id"), None);
    }
}
