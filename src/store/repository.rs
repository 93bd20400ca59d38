use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;

use crate::model::{EdgeType, EntityKind, GraphEntity, Identifier, Node, Page, PageRequest};
use crate::store::traits::Store;

/// Typed entity access over a graph [`Store`].
///
/// Entities are read back with their outgoing relation fields filled from
/// edges. Saving writes the node only; edges are managed explicitly.
pub struct Repository<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for Repository<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> Repository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    async fn hydrate<E: GraphEntity>(&self, node: Node) -> Result<E> {
        let id = node.id.clone();
        let mut entity = E::from_node(node)?;
        for relation in E::RELATIONS {
            let targets = self.store.edge_targets(&id, relation.edge).await?;
            entity.set_relation(relation.field, targets);
        }
        Ok(entity)
    }

    pub async fn find_by_id<E: GraphEntity>(&self, id: &Identifier) -> Result<Option<E>> {
        match self.store.get_node(E::KIND, id).await? {
            Some(node) => Ok(Some(self.hydrate(node).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_all<E: GraphEntity>(&self, request: &PageRequest) -> Result<Page<E>> {
        let (nodes, total) = self.store.list_nodes(E::KIND, request).await?;
        let mut content = Vec::with_capacity(nodes.len());
        for node in nodes {
            content.push(self.hydrate(node).await?);
        }
        Ok(Page::new(content, request, total))
    }

    pub async fn find_by_property<E: GraphEntity>(&self, field: &str, value: &Value) -> Result<Vec<E>> {
        let nodes = self.store.find_nodes_by_property(E::KIND, field, value).await?;
        let mut found = Vec::with_capacity(nodes.len());
        for node in nodes {
            found.push(self.hydrate(node).await?);
        }
        Ok(found)
    }

    pub async fn save<E: GraphEntity>(&self, entity: &E) -> Result<()> {
        self.store.upsert_node(entity.to_node()?).await
    }

    pub async fn delete_by_id<E: GraphEntity>(&self, id: &Identifier) -> Result<bool> {
        self.store.delete_node(E::KIND, id).await
    }

    pub async fn create_edge(&self, from: &Identifier, edge: EdgeType, to: &Identifier) -> Result<()> {
        self.store.create_edge(from, edge, to).await
    }

    pub async fn delete_edges(&self, from: &Identifier, edge: EdgeType) -> Result<u64> {
        self.store.delete_edges(from, edge).await
    }

    pub async fn sources_of(&self, edge: EdgeType, to: &Identifier) -> Result<Vec<Identifier>> {
        self.store.edge_sources(edge, to).await
    }

    pub async fn targets_of(&self, from: &Identifier, edge: EdgeType) -> Result<Vec<Identifier>> {
        self.store.edge_targets(from, edge).await
    }

    pub async fn node_kind(&self, id: &Identifier) -> Result<Option<EntityKind>> {
        self.store.node_kind(id).await
    }

    /// Resolves a client-supplied reference to a stored node of one of `kinds`.
    ///
    /// Malformed text and identifiers bound to another kind resolve to `None`.
    pub async fn resolve(&self, candidate: &str, kinds: &[EntityKind]) -> Result<Option<Identifier>> {
        let Ok(id) = Identifier::parse(candidate) else {
            return Ok(None);
        };
        match self.store.node_kind(&id).await? {
            Some(kind) if kinds.contains(&kind) => Ok(Some(id)),
            _ => Ok(None),
        }
    }
}
