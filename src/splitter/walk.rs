//! Document-order walk that cuts a subtree at split nodes
//!
//! Two cursors move in lockstep: `cur` over the source subtree and `dst` over
//! the accumulator being filled. Leaves are moved from source to
//! accumulator; an element with children is recreated as an empty copy in
//! the accumulator and walked into. At a split node the accumulator is
//! flushed and a new one is started from a skeleton of the ancestor chain
//! above `dst`, so the content that follows keeps its nesting.

use crate::config::SplitMatcher;
use crate::dom::{normalize_whitespace, NodeId, Tree};
use crate::extract::ExtractLink;
use std::collections::HashSet;

/// Accumulated content between two split nodes
#[derive(Debug)]
pub(crate) struct Flushed {
    pub title: String,
    pub content: NodeId,
    pub anchor: Option<String>,
    pub links: Vec<ExtractLink>,
}

/// Options of one walk
pub(crate) struct WalkLevel<'a> {
    pub matcher: &'a SplitMatcher,
    pub ignore_empty: bool,
    pub numbered_titles: bool,
}

/// Nodes below `root` matching the level's matcher
pub(crate) fn split_nodes(tree: &Tree, root: NodeId, level: &WalkLevel<'_>) -> Vec<NodeId> {
    tree.find_all(root, |tree, node| level.matcher.matches(tree, node))
}

/// Whether a split node would be skipped for having no text
pub(crate) fn is_empty_split(tree: &Tree, node: NodeId, level: &WalkLevel<'_>) -> bool {
    level.ignore_empty && tree.text_content(node).trim().is_empty()
}

/// Cut the subtree of `root` at every non-empty match of `splits`
///
/// The returned pieces own every node that was under `root`; `root` is left
/// with empty shells only. The first piece holds the content before the first
/// split node and is untitled.
pub(crate) fn walk(tree: &mut Tree, root: NodeId, splits: &[NodeId], level: &WalkLevel<'_>) -> Vec<Flushed> {
    let splits: HashSet<NodeId> = splits.iter().copied().collect();
    let mut flushed = Vec::new();

    let mut acc = tree.shallow_clone(root);
    let mut dst = acc;
    let mut title = String::new();
    let mut anchor = None;
    let mut next_anchor = None;
    let mut links = Vec::new();
    let mut running_index = 1;

    let Some(mut cur) = tree.first_child(root) else {
        return vec![Flushed {
            title,
            content: acc,
            anchor,
            links,
        }];
    };

    loop {
        if splits.contains(&cur) && !is_empty_split(tree, cur, level) {
            let (new_acc, new_dst) = skeleton(tree, acc, dst);
            flushed.push(Flushed {
                title: std::mem::take(&mut title),
                content: acc,
                anchor: anchor.take(),
                links: std::mem::take(&mut links),
            });
            acc = new_acc;
            dst = new_dst;

            title = if level.numbered_titles {
                let numbered = running_index.to_string();
                running_index += 1;
                numbered
            } else {
                normalize_whitespace(&tree.text_content(cur))
            };
            anchor = next_anchor.take();
            tree.clear_children(cur);
        }

        if tree.is_tag(cur, &["a"]) {
            if let Some(href) = tree.attr(cur, "href") {
                let text = normalize_whitespace(&tree.text_content(cur));
                links.push(ExtractLink::new(text, href));
            } else if let Some(name) = tree.attr(cur, "id").or_else(|| tree.attr(cur, "name")) {
                next_anchor = Some(name.to_string());
            }
        }

        if let Some(child) = tree.first_child(cur) {
            let copy = tree.shallow_clone(cur);
            tree.append(dst, copy);
            dst = copy;
            cur = child;
            continue;
        }

        if let Some(sibling) = tree.next_sibling(cur) {
            tree.append(dst, cur);
            cur = sibling;
            continue;
        }

        // Last child: move it, then climb until an ancestor has a sibling
        let Some(mut parent) = tree.parent(cur) else {
            break;
        };
        tree.append(dst, cur);
        let mut done = false;
        loop {
            if parent == root {
                done = true;
                break;
            }
            if tree.next_sibling(parent).is_some() {
                break;
            }
            let Some(grandparent) = tree.parent(parent) else {
                done = true;
                break;
            };
            tree.detach(parent);
            parent = grandparent;
            dst = tree.parent(dst).unwrap_or(acc);
        }
        if done {
            break;
        }
        let Some(sibling) = tree.next_sibling(parent) else {
            break;
        };
        cur = sibling;
        dst = tree.parent(dst).unwrap_or(acc);
    }

    flushed.push(Flushed {
        title,
        content: acc,
        anchor,
        links,
    });
    flushed
}

/// Empty copy of the chain from `acc` down to `dst`
fn skeleton(tree: &mut Tree, acc: NodeId, dst: NodeId) -> (NodeId, NodeId) {
    let mut chain = vec![dst];
    chain.extend(tree.ancestors(dst).take_while(|&node| node != acc));
    if dst != acc {
        chain.push(acc);
    }
    chain.reverse();

    let new_acc = tree.shallow_clone(chain[0]);
    let mut new_dst = new_acc;
    for &node in &chain[1..] {
        let copy = tree.shallow_clone(node);
        tree.append(new_dst, copy);
        new_dst = copy;
    }
    (new_acc, new_dst)
}
