//! # Relation Graph Module
//!
//! Typed directed multigraph over document ids, built while pages are split
//! and links resolved. Edges are only ever added, and an identical
//! (from, to, relation) triple is stored once.
//!
//! ## Key Components
//!
//! - `Relation`: the five edge types with their stable numeric codes
//! - `RelationGraph`: the graph plus the lookups the retrieval side needs
//! - `AdjacencyList`: serialized form written as `website_graph.json`
//!
//! PARENT_* edges form a forest rooted at the site roots. LINK edges may form
//! cycles.

use crate::error::Result;
use crate::index::DocId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// Type of an edge between two documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relation {
    /// Crawled page (or site root) to the top-level extracts of a child page
    ParentPage,
    /// Split node to each of its pieces
    ParentExtract,
    /// Resolved hyperlink
    Link,
    /// Consecutive extracts of one split level
    SiblingExtract,
    /// Consecutive mechanical splits of one logical extract
    SiblingSplitExtract,
}

impl Relation {
    pub fn code(&self) -> u8 {
        match self {
            Self::ParentPage => 1,
            Self::ParentExtract => 2,
            Self::Link => 3,
            Self::SiblingExtract => 4,
            Self::SiblingSplitExtract => 5,
        }
    }

    pub fn is_parent(&self) -> bool {
        matches!(self, Self::ParentPage | Self::ParentExtract)
    }
}

/// Which edges of a node a query follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
    Both,
}

/// One directed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: DocId,
    pub to: DocId,
    pub relation: Relation,
}

/// Directed multigraph of typed relations between documents
#[derive(Debug, Default, Clone)]
pub struct RelationGraph {
    nodes: BTreeSet<DocId>,
    edges: Vec<Edge>,
    seen: HashSet<Edge>,
    outgoing: HashMap<DocId, Vec<usize>>,
    incoming: HashMap<DocId, Vec<usize>>,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `id` appears in the graph even without edges
    pub fn add_node(&mut self, id: DocId) {
        self.nodes.insert(id);
    }

    /// Add an edge; returns false when the same edge already exists
    pub fn add_edge(&mut self, from: DocId, to: DocId, relation: Relation) -> bool {
        let edge = Edge { from, to, relation };
        if !self.seen.insert(edge) {
            return false;
        }
        self.nodes.insert(from);
        self.nodes.insert(to);
        let position = self.edges.len();
        self.edges.push(edge);
        self.outgoing.entry(from).or_default().push(position);
        self.incoming.entry(to).or_default().push(position);
        true
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = DocId> + '_ {
        self.nodes.iter().copied()
    }

    /// Every edge in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn outgoing(&self, id: DocId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_at(&self.outgoing, id)
    }

    pub fn incoming(&self, id: DocId) -> impl Iterator<Item = &Edge> + '_ {
        self.edges_at(&self.incoming, id)
    }

    fn edges_at<'a>(
        &'a self,
        table: &'a HashMap<DocId, Vec<usize>>,
        id: DocId,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        table
            .get(&id)
            .into_iter()
            .flatten()
            .map(move |&position| &self.edges[position])
    }

    /// Ids related to `id` by `relation`, incoming sources first
    pub fn related(&self, id: DocId, relation: Relation, direction: Direction) -> Vec<DocId> {
        let mut ids = Vec::new();
        if direction != Direction::Outgoing {
            ids.extend(
                self.incoming(id)
                    .filter(|edge| edge.relation == relation)
                    .map(|edge| edge.from),
            );
        }
        if direction != Direction::Incoming {
            ids.extend(
                self.outgoing(id)
                    .filter(|edge| edge.relation == relation)
                    .map(|edge| edge.to),
            );
        }
        ids
    }

    /// Structural parent, if any
    pub fn parent(&self, id: DocId) -> Option<DocId> {
        self.incoming(id)
            .find(|edge| edge.relation.is_parent())
            .map(|edge| edge.from)
    }

    /// Structural children, in insertion order
    pub fn children(&self, id: DocId) -> Vec<DocId> {
        self.outgoing(id)
            .filter(|edge| edge.relation.is_parent())
            .map(|edge| edge.to)
            .collect()
    }

    /// Previous and next extract at the same split level
    pub fn siblings(&self, id: DocId) -> Vec<DocId> {
        self.related(id, Relation::SiblingExtract, Direction::Both)
    }

    /// Targets of resolved links
    pub fn links(&self, id: DocId) -> Vec<DocId> {
        self.related(id, Relation::Link, Direction::Outgoing)
    }

    /// The whole chain of mechanical splits `id` belongs to, in order
    pub fn split_chain(&self, id: DocId) -> Vec<DocId> {
        let step = |current: DocId, direction: Direction| {
            match self.related(current, Relation::SiblingSplitExtract, direction).as_slice() {
                [only] => Some(*only),
                _ => None,
            }
        };

        let mut visited = HashSet::from([id]);
        let mut before = Vec::new();
        let mut current = id;
        while let Some(prev) = step(current, Direction::Incoming) {
            if !visited.insert(prev) {
                break;
            }
            before.push(prev);
            current = prev;
        }
        before.reverse();
        before.push(id);

        current = id;
        while let Some(next) = step(current, Direction::Outgoing) {
            if !visited.insert(next) {
                break;
            }
            before.push(next);
            current = next;
        }
        before
    }

    /// Serializable adjacency form, one entry per node in id order
    pub fn to_adjacency(&self) -> AdjacencyList {
        let nodes = self
            .nodes
            .iter()
            .map(|&id| AdjacencyNode {
                id,
                out: self
                    .outgoing(id)
                    .map(|edge| AdjacentEdge {
                        id: edge.to,
                        relation: edge.relation,
                    })
                    .collect(),
                incoming: self
                    .incoming(id)
                    .map(|edge| AdjacentEdge {
                        id: edge.from,
                        relation: edge.relation,
                    })
                    .collect(),
            })
            .collect();
        AdjacencyList { nodes }
    }

    /// Rebuild a graph from its adjacency form
    ///
    /// Only outgoing lists are read; incoming lists are derived data.
    pub fn from_adjacency(adjacency: &AdjacencyList) -> Self {
        let mut graph = Self::new();
        for node in &adjacency.nodes {
            graph.add_node(node.id);
        }
        for node in &adjacency.nodes {
            for edge in &node.out {
                graph.add_edge(node.id, edge.id, edge.relation);
            }
        }
        graph
    }

    /// Read a graph written as `website_graph.json`
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let adjacency: AdjacencyList = serde_json::from_str(&text)?;
        Ok(Self::from_adjacency(&adjacency))
    }
}

/// Serialized graph: each document with its typed outgoing and incoming edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyList {
    pub nodes: Vec<AdjacencyNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacencyNode {
    pub id: DocId,
    pub out: Vec<AdjacentEdge>,
    #[serde(rename = "in")]
    pub incoming: Vec<AdjacentEdge>,
}

/// The other end of an edge and its type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjacentEdge {
    pub id: DocId,
    #[serde(rename = "type")]
    pub relation: Relation,
}
