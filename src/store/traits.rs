use crate::model::{EdgeType, EntityKind, Identifier, Node, PageRequest};
use anyhow::Result;
use serde_json::Value;

#[async_trait::async_trait]
pub trait NodeStore: Send + Sync {
    /// Point lookup restricted to one label.
    async fn get_node(&self, kind: EntityKind, id: &Identifier) -> Result<Option<Node>>;
    /// Label a stored identifier is bound to, if any.
    async fn node_kind(&self, id: &Identifier) -> Result<Option<EntityKind>>;
    /// Nodes of `kind` whose property `field` equals `value`.
    async fn find_nodes_by_property(
        &self,
        kind: EntityKind,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Node>>;
    /// One page of nodes of `kind` plus the total count of that kind.
    async fn list_nodes(&self, kind: EntityKind, request: &PageRequest) -> Result<(Vec<Node>, u64)>;
    /// Insert, or replace the properties of an existing node.
    async fn upsert_node(&self, node: Node) -> Result<()>;
    /// Removes the node and every edge touching it.
    async fn delete_node(&self, kind: EntityKind, id: &Identifier) -> Result<bool>;
}

#[async_trait::async_trait]
pub trait EdgeStore: Send + Sync {
    async fn create_edge(&self, from: &Identifier, edge: EdgeType, to: &Identifier) -> Result<()>;
    /// Removes every outgoing edge of one type and returns how many went away.
    async fn delete_edges(&self, from: &Identifier, edge: EdgeType) -> Result<u64>;
    async fn edge_targets(&self, from: &Identifier, edge: EdgeType) -> Result<Vec<Identifier>>;
    async fn edge_sources(&self, edge: EdgeType, to: &Identifier) -> Result<Vec<Identifier>>;
}

/// Combined trait for backends able to hold the whole catalog graph.
pub trait Store: NodeStore + EdgeStore + Send + Sync {}
