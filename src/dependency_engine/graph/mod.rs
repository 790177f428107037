use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

const UNKNOWN_ENGINE: &str = "Unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Table,
    View,
    MaterializedView,
    Distributed,
    Dictionary,
}

impl NodeType {
    /// Classify by the leading engine token, so `Distributed(...)` counts as
    /// distributed and `ReplicatedMergeTree` as a plain table.
    pub fn from_engine(engine: &str) -> Self {
        let leading = engine
            .trim()
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match leading {
            "MaterializedView" => NodeType::MaterializedView,
            "View" => NodeType::View,
            "Distributed" => NodeType::Distributed,
            "Dictionary" => NodeType::Dictionary,
            _ => NodeType::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Source,       // Object reads from dependency (catalog metadata)
    Target,       // Materialized view writes into table
    Join,         // Object joins against table
    Distributed,  // Distributed table fronts a local table
    Dictionary,   // Object reads through a dictionary
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Source => "source",
            EdgeType::Target => "target",
            EdgeType::Join => "join",
            EdgeType::Distributed => "distributed",
            EdgeType::Dictionary => "dictionary",
        }
    }

    pub fn label(&self) -> Option<&'static str> {
        match self {
            EdgeType::Source => None,
            EdgeType::Target => Some("TO"),
            EdgeType::Join => Some("JOIN"),
            EdgeType::Distributed => Some("Distributed"),
            EdgeType::Dictionary => Some("dictGet"),
        }
    }

    /// Data flows from the referenced object into the dependent one.
    /// `Target` and `Distributed` point the other way: the dependent object
    /// writes to, or stands in for, the referenced one.
    pub fn flows_into_dependent(&self) -> bool {
        matches!(
            self,
            EdgeType::Source | EdgeType::Join | EdgeType::Dictionary
        )
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub database: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(database: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
        }
    }

    pub fn id(&self) -> String {
        format!("{}.{}", self.database, self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String, // "database.name"
    pub database: String,
    pub name: String,
    pub engine: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub total_rows: Option<u64>,
    pub total_bytes: Option<u64>,
}

impl GraphNode {
    pub fn new(database: &str, name: &str, engine: &str) -> Self {
        let engine = if engine.trim().is_empty() {
            UNKNOWN_ENGINE.to_string()
        } else {
            engine.to_string()
        };

        Self {
            id: QualifiedName::new(database, name).id(),
            database: database.to_string(),
            name: name.to_string(),
            node_type: NodeType::from_engine(&engine),
            engine,
            total_rows: None,
            total_bytes: None,
        }
    }

    pub fn with_counts(mut self, total_rows: Option<u64>, total_bytes: Option<u64>) -> Self {
        self.total_rows = total_rows;
        self.total_bytes = total_bytes;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyGraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<DependencyLink>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DependencyLink {
    pub id: String, // "source->target:type"
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

#[derive(Default)]
pub struct DependencyGraph {
    pub graph: DiGraph<GraphNode, GraphEdge>,
    node_indices: HashMap<String, NodeIndex>,
    edge_keys: HashSet<(NodeIndex, NodeIndex, EdgeType)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same id exists. Returns the id.
    pub fn add_node(&mut self, node: GraphNode) -> String {
        if self.node_indices.contains_key(&node.id) {
            return node.id;
        }

        let id = node.id.clone();
        let index = self.graph.add_node(node);
        self.node_indices.insert(id.clone(), index);
        id
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_indices.contains_key(id)
    }

    /// Insert an edge between two known nodes. Unknown endpoints and repeats of
    /// the same (source, target, type) are ignored; returns whether it was added.
    pub fn add_edge(&mut self, source_id: &str, target_id: &str, edge_type: EdgeType) -> bool {
        let (Some(&source_idx), Some(&target_idx)) = (
            self.node_indices.get(source_id),
            self.node_indices.get(target_id),
        ) else {
            return false;
        };

        if !self.edge_keys.insert((source_idx, target_idx, edge_type)) {
            return false;
        }

        self.graph
            .add_edge(source_idx, target_idx, GraphEdge { edge_type });
        true
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn to_data(&self) -> DependencyGraphData {
        let nodes = self
            .graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx).cloned())
            .collect();

        let mut edges = Vec::with_capacity(self.graph.edge_count());
        for edge in self.graph.edge_references() {
            let (Some(source_node), Some(target_node)) = (
                self.graph.node_weight(edge.source()),
                self.graph.node_weight(edge.target()),
            ) else {
                continue;
            };

            let edge_type = edge.weight().edge_type;
            edges.push(DependencyLink {
                id: format!("{}->{}:{}", source_node.id, target_node.id, edge_type),
                source: source_node.id.clone(),
                target: target_node.id.clone(),
                edge_type,
                label: edge_type.label().map(str::to_string),
            });
        }

        DependencyGraphData { nodes, edges }
    }

    fn resolve_center_index(
        &self,
        center_id: &str,
        preferred_database: Option<&str>,
    ) -> Option<NodeIndex> {
        let normalized = center_id.trim();
        if normalized.is_empty() {
            return None;
        }

        if let Some(idx) = self.node_indices.get(normalized) {
            return Some(*idx);
        }

        // Case-insensitive full-id match, earliest node first.
        if let Some(idx) = self.graph.node_indices().find(|idx| {
            self.graph
                .node_weight(*idx)
                .is_some_and(|node| node.id.eq_ignore_ascii_case(normalized))
        }) {
            return Some(idx);
        }

        let mut database_hint = preferred_database
            .map(str::trim)
            .filter(|database| !database.is_empty());
        let mut name_hint = normalized;

        if let Some((database, name)) = normalized.split_once('.') {
            if !name.trim().is_empty() {
                database_hint = Some(database.trim());
                name_hint = name.trim();
            }
        }

        if let Some(database) = database_hint {
            let found = self.graph.node_indices().find(|idx| {
                self.graph.node_weight(*idx).is_some_and(|node| {
                    node.name.eq_ignore_ascii_case(name_hint)
                        && node.database.eq_ignore_ascii_case(database)
                })
            });
            if found.is_some() {
                return found;
            }
        }

        // Fallback to unique name match when the database is missing or wrong.
        let mut matches = self.graph.node_indices().filter(|idx| {
            self.graph
                .node_weight(*idx)
                .is_some_and(|node| node.name.eq_ignore_ascii_case(name_hint))
        });

        match (matches.next(), matches.next()) {
            (Some(idx), None) => Some(idx),
            _ => None,
        }
    }

    /// Keep only nodes within `max_hops` edges (either direction) of the
    /// center node. Leaves the graph untouched if the center cannot be resolved.
    pub fn filter_neighborhood(
        &mut self,
        center_id: &str,
        preferred_database: Option<&str>,
        max_hops: usize,
    ) {
        let center_idx = match self.resolve_center_index(center_id, preferred_database) {
            Some(idx) => idx,
            None => return,
        };

        let hop_budget = max_hops.max(1);
        let mut neighbors = HashSet::new();
        let mut queue = VecDeque::new();
        neighbors.insert(center_idx);
        queue.push_back((center_idx, 0usize));

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= hop_budget {
                continue;
            }

            for direction in [petgraph::Direction::Incoming, petgraph::Direction::Outgoing] {
                for next in self.graph.neighbors_directed(current, direction) {
                    if neighbors.insert(next) {
                        queue.push_back((next, depth + 1));
                    }
                }
            }
        }

        // Rebuild rather than remove in place so surviving nodes and edges keep
        // their discovery order.
        let mut filtered = DependencyGraph::new();
        for idx in self.graph.node_indices() {
            if neighbors.contains(&idx) {
                if let Some(node) = self.graph.node_weight(idx) {
                    filtered.add_node(node.clone());
                }
            }
        }
        for edge in self.graph.edge_references() {
            if let (Some(source), Some(target)) = (
                self.graph.node_weight(edge.source()),
                self.graph.node_weight(edge.target()),
            ) {
                filtered.add_edge(&source.id, &target.id, edge.weight().edge_type);
            }
        }

        *self = filtered;
    }
}
