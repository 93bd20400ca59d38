use anyhow::{bail, Result};
use parking_lot::RwLock;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::KindConflict;
use crate::model::{Direction, EdgeType, EntityKind, Identifier, Node, PageRequest, SortOrder, ID_FIELD};
use crate::store::traits::{EdgeStore, NodeStore, Store};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Edge {
    from: Identifier,
    edge: EdgeType,
    to: Identifier,
}

#[derive(Debug, Default)]
struct Graph {
    nodes: HashMap<Identifier, Node>,
    /// Insertion ordered; `edge_targets` reports targets in creation order.
    edges: Vec<Edge>,
}

/// Process-local graph store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    graph: RwLock<Graph>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Sort key of one node for one field: `uuid` is the identifier, anything
/// else is the property rendered as text. Null and missing are both `None`.
fn sort_key(node: &Node, field: &str) -> Option<String> {
    if field == ID_FIELD {
        return Some(node.id.to_string());
    }
    match node.properties.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Ascending puts missing values last, descending puts them first; ties fall
/// back to the identifier.
pub(crate) fn compare_nodes(a: &Node, b: &Node, sort: &[SortOrder]) -> Ordering {
    for order in sort {
        let ordering = match (sort_key(a, &order.field), sort_key(b, &order.field)) {
            (Some(x), Some(y)) => match order.direction {
                Direction::Asc => x.cmp(&y),
                Direction::Desc => y.cmp(&x),
            },
            (None, None) => Ordering::Equal,
            (None, Some(_)) => match order.direction {
                Direction::Asc => Ordering::Greater,
                Direction::Desc => Ordering::Less,
            },
            (Some(_), None) => match order.direction {
                Direction::Asc => Ordering::Less,
                Direction::Desc => Ordering::Greater,
            },
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.id.cmp(&b.id)
}

#[async_trait::async_trait]
impl NodeStore for MemoryStore {
    async fn get_node(&self, kind: EntityKind, id: &Identifier) -> Result<Option<Node>> {
        let graph = self.graph.read();
        Ok(graph.nodes.get(id).filter(|n| n.kind == kind).cloned())
    }

    async fn node_kind(&self, id: &Identifier) -> Result<Option<EntityKind>> {
        Ok(self.graph.read().nodes.get(id).map(|n| n.kind))
    }

    async fn find_nodes_by_property(
        &self,
        kind: EntityKind,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        let graph = self.graph.read();
        let mut found: Vec<Node> = graph
            .nodes
            .values()
            .filter(|n| n.kind == kind && n.properties.get(field) == Some(value))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    async fn list_nodes(&self, kind: EntityKind, request: &PageRequest) -> Result<(Vec<Node>, u64)> {
        let graph = self.graph.read();
        let mut nodes: Vec<&Node> = graph.nodes.values().filter(|n| n.kind == kind).collect();
        let total = nodes.len() as u64;
        nodes.sort_by(|a, b| compare_nodes(a, b, &request.sort));

        let page = nodes
            .into_iter()
            .skip(usize::try_from(request.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn upsert_node(&self, node: Node) -> Result<()> {
        let mut graph = self.graph.write();
        if let Some(existing) = graph.nodes.get(&node.id) {
            if existing.kind != node.kind {
                return Err(KindConflict {
                    id: node.id.clone(),
                    existing: existing.kind,
                }
                .into());
            }
        }
        graph.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    async fn delete_node(&self, kind: EntityKind, id: &Identifier) -> Result<bool> {
        let mut graph = self.graph.write();
        if !graph.nodes.get(id).is_some_and(|n| n.kind == kind) {
            return Ok(false);
        }
        graph.nodes.remove(id);
        graph.edges.retain(|e| &e.from != id && &e.to != id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl EdgeStore for MemoryStore {
    async fn create_edge(&self, from: &Identifier, edge: EdgeType, to: &Identifier) -> Result<()> {
        let mut graph = self.graph.write();
        for end in [from, to] {
            if !graph.nodes.contains_key(end) {
                bail!("cannot link {} -[{}]-> {}: {} does not exist", from, edge, to, end);
            }
        }
        let candidate = Edge {
            from: from.clone(),
            edge,
            to: to.clone(),
        };
        if !graph.edges.contains(&candidate) {
            graph.edges.push(candidate);
        }
        Ok(())
    }

    async fn delete_edges(&self, from: &Identifier, edge: EdgeType) -> Result<u64> {
        let mut graph = self.graph.write();
        let before = graph.edges.len();
        graph.edges.retain(|e| !(&e.from == from && e.edge == edge));
        Ok((before - graph.edges.len()) as u64)
    }

    async fn edge_targets(&self, from: &Identifier, edge: EdgeType) -> Result<Vec<Identifier>> {
        let graph = self.graph.read();
        Ok(graph
            .edges
            .iter()
            .filter(|e| &e.from == from && e.edge == edge)
            .map(|e| e.to.clone())
            .collect())
    }

    async fn edge_sources(&self, edge: EdgeType, to: &Identifier) -> Result<Vec<Identifier>> {
        let graph = self.graph.read();
        Ok(graph
            .edges
            .iter()
            .filter(|e| &e.to == to && e.edge == edge)
            .map(|e| e.from.clone())
            .collect())
    }
}

impl Store for MemoryStore {}
