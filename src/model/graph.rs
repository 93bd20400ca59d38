use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::model::{EntityKind, Identifier};

/// Field holding the identifier in every serialized entity.
pub const ID_FIELD: &str = "uuid";

/// Directed, typed link between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    PartOf,
    Has,
    ProvidedBy,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::PartOf => "PART_OF",
            EdgeType::Has => "HAS",
            EdgeType::ProvidedBy => "PROVIDED_BY",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PART_OF" => Ok(EdgeType::PartOf),
            "HAS" => Ok(EdgeType::Has),
            "PROVIDED_BY" => Ok(EdgeType::ProvidedBy),
            other => Err(anyhow!("unknown edge type '{}'", other)),
        }
    }
}

/// A stored vertex: identifier, label and schemaless scalar properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Identifier,
    pub kind: EntityKind,
    pub properties: Map<String, Value>,
}

/// An outgoing relationship an entity exposes as a field of identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// JSON field carrying the target identifier(s).
    pub field: &'static str,
    pub edge: EdgeType,
    /// Kinds a target may be resolved as, in lookup order.
    pub targets: &'static [EntityKind],
    /// `false` means at most one outgoing edge of this type.
    pub many: bool,
}

/// A relationship target as written by a client: either the bare identifier
/// or an embedded entity carrying its `uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Entity { uuid: String },
}

impl Reference {
    pub fn target(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Entity { uuid } => uuid,
        }
    }
}

/// Flattens optional single/many references into raw target strings.
pub fn reference_targets<'a>(refs: impl IntoIterator<Item = &'a Reference>) -> Vec<String> {
    refs.into_iter().map(|r| r.target().to_string()).collect()
}

/// An entity persisted as a node plus outgoing edges.
///
/// Scalar fields round-trip through [`Node::properties`]; fields named by
/// [`GraphEntity::RELATIONS`] are rebuilt from edges and fields named by
/// [`GraphEntity::TRANSIENT_FIELDS`] are read-time views that are never stored.
pub trait GraphEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: EntityKind;
    const RELATIONS: &'static [RelationDef] = &[];
    const TRANSIENT_FIELDS: &'static [&'static str] = &[];
    const SORTABLE_FIELDS: &'static [&'static str];
    const DEFAULT_SORT: &'static str;

    fn id(&self) -> &Identifier;

    fn relation(&self, _field: &str) -> Vec<Identifier> {
        Vec::new()
    }

    fn set_relation(&mut self, _field: &str, _targets: Vec<Identifier>) {}

    fn to_node(&self) -> Result<Node> {
        let value = serde_json::to_value(self)
            .with_context(|| format!("Failed to serialize {}", Self::KIND))?;
        let Value::Object(mut properties) = value else {
            bail!("{} did not serialize to an object", Self::KIND);
        };
        properties.remove(ID_FIELD);
        for relation in Self::RELATIONS {
            properties.remove(relation.field);
        }
        for field in Self::TRANSIENT_FIELDS {
            properties.remove(*field);
        }
        Ok(Node {
            id: self.id().clone(),
            kind: Self::KIND,
            properties,
        })
    }

    fn from_node(node: Node) -> Result<Self> {
        if node.kind != Self::KIND {
            bail!("node {} is a {}, not a {}", node.id, node.kind, Self::KIND);
        }
        let mut properties = node.properties;
        properties.insert(ID_FIELD.to_string(), Value::String(node.id.to_string()));
        serde_json::from_value(Value::Object(properties))
            .with_context(|| format!("Failed to read {} {}", Self::KIND, node.id))
    }
}
