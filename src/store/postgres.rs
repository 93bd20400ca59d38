use anyhow::{bail, Context, Result};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::error::KindConflict;
use crate::model::{Direction, EdgeType, EntityKind, Identifier, Node, PageRequest, SortOrder, ID_FIELD};
use crate::store::traits::{EdgeStore, NodeStore, Store};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS nodes (
        id TEXT PRIMARY KEY,
        kind TEXT NOT NULL,
        properties JSONB NOT NULL DEFAULT '{}'::jsonb,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS nodes_kind_idx ON nodes (kind)",
    r#"
    CREATE TABLE IF NOT EXISTS edges (
        from_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        edge_type TEXT NOT NULL,
        to_id TEXT NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
        position BIGSERIAL,
        PRIMARY KEY (from_id, edge_type, to_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS edges_to_idx ON edges (to_id, edge_type)",
];

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Creates the node and edge tables when they are missing.
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("Failed to bootstrap graph tables")?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn node_from_row(row: &PgRow) -> Result<Node> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let properties: Value = row.try_get("properties")?;

    let Value::Object(properties) = properties else {
        bail!("properties of node {} are not a JSON object", id);
    };
    Ok(Node {
        id: Identifier::parse(&id).with_context(|| format!("Stored node id {} is invalid", id))?,
        kind: kind
            .parse()
            .with_context(|| format!("Stored node {} has unknown kind {}", id, kind))?,
        properties,
    })
}

fn identifier_column(row: &PgRow, column: &str) -> Result<Identifier> {
    let id: String = row.try_get(column)?;
    Identifier::parse(&id).with_context(|| format!("Stored edge end {} is invalid", id))
}

/// Builds the `ORDER BY` list for `sort`, binding property names from `$first_param`.
///
/// Returns the clause and the property names in bind order. Ascending puts
/// nulls last and descending puts them first; `id` always breaks ties.
pub(crate) fn order_clause(sort: &[SortOrder], first_param: usize) -> (String, Vec<String>) {
    let mut terms = Vec::new();
    let mut binds = Vec::new();
    for order in sort {
        let direction = match order.direction {
            Direction::Asc => "ASC NULLS LAST",
            Direction::Desc => "DESC NULLS FIRST",
        };
        if order.field == ID_FIELD {
            terms.push(format!("id {}", direction));
        } else {
            terms.push(format!(
                "properties->>${} {}",
                first_param + binds.len(),
                direction
            ));
            binds.push(order.field.clone());
        }
    }
    terms.push("id ASC".to_string());
    (terms.join(", "), binds)
}

#[async_trait::async_trait]
impl NodeStore for PostgresStore {
    async fn get_node(&self, kind: EntityKind, id: &Identifier) -> Result<Option<Node>> {
        let row = sqlx::query("SELECT id, kind, properties FROM nodes WHERE id = $1 AND kind = $2")
            .bind(id.as_str())
            .bind(kind.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch node")?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn node_kind(&self, id: &Identifier) -> Result<Option<EntityKind>> {
        let kind: Option<String> = sqlx::query_scalar("SELECT kind FROM nodes WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch node kind")?;

        kind.map(|k| k.parse::<EntityKind>().context("Stored node has unknown kind"))
            .transpose()
    }

    async fn find_nodes_by_property(
        &self,
        kind: EntityKind,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        let rows = sqlx::query(
            "SELECT id, kind, properties FROM nodes WHERE kind = $1 AND properties -> $2 = $3 ORDER BY id",
        )
        .bind(kind.as_str())
        .bind(field)
        .bind(Json(value))
        .fetch_all(&self.pool)
        .await
        .context("Failed to search nodes by property")?;

        rows.iter().map(node_from_row).collect()
    }

    async fn list_nodes(&self, kind: EntityKind, request: &PageRequest) -> Result<(Vec<Node>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nodes WHERE kind = $1")
            .bind(kind.as_str())
            .fetch_one(&self.pool)
            .await
            .context("Failed to count nodes")?;

        let (order, fields) = order_clause(&request.sort, 2);
        let limit_param = 2 + fields.len();
        let sql = format!(
            "SELECT id, kind, properties FROM nodes WHERE kind = $1 ORDER BY {} LIMIT ${} OFFSET ${}",
            order,
            limit_param,
            limit_param + 1
        );

        let mut query = sqlx::query(&sql).bind(kind.as_str());
        for field in &fields {
            query = query.bind(field);
        }
        let rows = query
            .bind(i64::try_from(request.size).unwrap_or(i64::MAX))
            .bind(i64::try_from(request.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list nodes")?;

        let nodes = rows.iter().map(node_from_row).collect::<Result<Vec<_>>>()?;
        Ok((nodes, total.max(0) as u64))
    }

    async fn upsert_node(&self, node: Node) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO nodes (id, kind, properties)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                properties = EXCLUDED.properties,
                updated_at = NOW()
            WHERE nodes.kind = EXCLUDED.kind
            "#,
        )
        .bind(node.id.as_str())
        .bind(node.kind.as_str())
        .bind(Json(&node.properties))
        .execute(&self.pool)
        .await
        .context("Failed to upsert node")?;

        if result.rows_affected() == 0 {
            let existing = self.node_kind(&node.id).await?;
            let Some(existing) = existing else {
                bail!("node {} vanished while being upserted as a {}", node.id, node.kind);
            };
            return Err(KindConflict {
                id: node.id,
                existing,
            }
            .into());
        }
        Ok(())
    }

    async fn delete_node(&self, kind: EntityKind, id: &Identifier) -> Result<bool> {
        let result = sqlx::query("DELETE FROM nodes WHERE id = $1 AND kind = $2")
            .bind(id.as_str())
            .bind(kind.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to delete node")?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl EdgeStore for PostgresStore {
    async fn create_edge(&self, from: &Identifier, edge: EdgeType, to: &Identifier) -> Result<()> {
        sqlx::query(
            "INSERT INTO edges (from_id, edge_type, to_id) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(from.as_str())
        .bind(edge.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to create edge {} -[{}]-> {}", from, edge, to))?;

        Ok(())
    }

    async fn delete_edges(&self, from: &Identifier, edge: EdgeType) -> Result<u64> {
        let result = sqlx::query("DELETE FROM edges WHERE from_id = $1 AND edge_type = $2")
            .bind(from.as_str())
            .bind(edge.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to delete edges")?;

        Ok(result.rows_affected())
    }

    async fn edge_targets(&self, from: &Identifier, edge: EdgeType) -> Result<Vec<Identifier>> {
        let rows = sqlx::query(
            "SELECT to_id FROM edges WHERE from_id = $1 AND edge_type = $2 ORDER BY position",
        )
        .bind(from.as_str())
        .bind(edge.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch edge targets")?;

        rows.iter().map(|row| identifier_column(row, "to_id")).collect()
    }

    async fn edge_sources(&self, edge: EdgeType, to: &Identifier) -> Result<Vec<Identifier>> {
        let rows = sqlx::query(
            "SELECT from_id FROM edges WHERE to_id = $1 AND edge_type = $2 ORDER BY position",
        )
        .bind(to.as_str())
        .bind(edge.as_str())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch edge sources")?;

        rows.iter().map(|row| identifier_column(row, "from_id")).collect()
    }
}

impl Store for PostgresStore {}
