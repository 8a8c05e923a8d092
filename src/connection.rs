//! Connection handle: the caller-owned entry point for every operation.
//!
//! One handle owns its store client, its read-only schema and its
//! configuration; there is no process-wide registry. Schema synchronization
//! runs inside [`Connection::connect`] before the handle is handed out, so a
//! partially-provisioned connection is never observable.

use serde_json::Value;
use tracing::debug;

use crate::cast::Caster;
use crate::criteria::Criteria;
use crate::error::{ArqoError, Result};
use crate::model::{Direction, LogicalCollection, Schema};
use crate::query::compiler::{compile_destroy, compile_find, compile_update, CompiledQuery};
use crate::query::filter::{HANDLE_FIELD, KEY_FIELD, REV_FIELD};
use crate::query::join::{check_handle, compile_join, compile_neighbors, NeighborScope};
use crate::store::{Document, StoreClient};
use crate::sync;

/// Per-connection configuration.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Named graph to traverse; `None` selects the relational join strategy.
    pub graph: Option<String>,
    /// Default case sensitivity for string comparisons. Overridable per
    /// filter leaf via `caseSensitive`.
    pub case_sensitive: bool,
    /// Whether to synchronize the physical schema inside `connect`.
    pub sync_on_connect: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            graph: None,
            case_sensitive: false,
            sync_on_connect: true,
        }
    }
}

impl ConnectionConfig {
    /// Configuration using the given named graph for joins and traversals.
    pub fn with_graph(graph: impl Into<String>) -> Self {
        Self {
            graph: Some(graph.into()),
            ..Self::default()
        }
    }
}

/// An established logical connection: store client + schema + configuration.
pub struct Connection<C: StoreClient> {
    store: C,
    schema: Schema,
    config: ConnectionConfig,
}

impl<C: StoreClient> Connection<C> {
    /// Establishes a connection, synchronizing the physical schema first
    /// unless configured otherwise. A synchronization failure aborts setup;
    /// no handle is returned.
    pub async fn connect(store: C, schema: Schema, config: ConnectionConfig) -> Result<Self> {
        if config.sync_on_connect {
            sync::synchronize(&store, &schema, config.graph.as_deref()).await?;
        }
        Ok(Self {
            store,
            schema,
            config,
        })
    }

    /// The connection's schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The connection's configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// The underlying store client.
    pub fn store(&self) -> &C {
        &self.store
    }

    /// Finds records matching the criteria. Joins, when requested, use the
    /// strategy selected by the connection's graph configuration.
    pub async fn find(&self, collection: &str, criteria: &Criteria) -> Result<Vec<Document>> {
        let physical = self.physical(collection);
        let compiled = if criteria.joins.is_empty() {
            compile_find(&physical, criteria, self.config.case_sensitive)?
        } else {
            compile_join(
                &physical,
                criteria,
                self.config.case_sensitive,
                self.config.graph.as_deref(),
                &self.schema,
            )?
        };
        let rows = self.store.execute(&compiled.aql).await?;
        let mut documents = self.shape_wrapped(rows, &compiled)?;
        Caster::new(&self.schema).cast_all(collection, &mut documents);
        Ok(documents)
    }

    /// Inserts one document and returns the stored, cast copy.
    pub async fn create(&self, collection: &str, document: Document) -> Result<Document> {
        let physical = self.physical(collection);
        let mut stored = self.store.insert(&physical, document).await?;
        Caster::new(&self.schema).cast(collection, &mut stored);
        Ok(stored)
    }

    /// Updates all records matching the criteria and returns the modified
    /// copies.
    pub async fn update(
        &self,
        collection: &str,
        criteria: &Criteria,
        patch: &Value,
    ) -> Result<Vec<Document>> {
        let physical = self.physical(collection);
        let compiled = compile_update(&physical, criteria, patch, self.config.case_sensitive)?;
        let rows = self.store.execute(&compiled.aql).await?;
        let mut documents = plain_documents(rows);
        Caster::new(&self.schema).cast_all(collection, &mut documents);
        Ok(documents)
    }

    /// Removes all records matching the criteria and returns the removed
    /// copies.
    pub async fn destroy(&self, collection: &str, criteria: &Criteria) -> Result<Vec<Document>> {
        let physical = self.physical(collection);
        let compiled = compile_destroy(&physical, criteria, self.config.case_sensitive)?;
        let rows = self.store.execute(&compiled.aql).await?;
        let mut documents = plain_documents(rows);
        Caster::new(&self.schema).cast_all(collection, &mut documents);
        Ok(documents)
    }

    /// Returns the direct neighbors of a vertex, addressed by handle and
    /// either an edge collection or a named graph. The raw neighbor list is
    /// returned without record merging.
    pub async fn neighbors(
        &self,
        handle: &str,
        scope: &NeighborScope,
        direction: Direction,
    ) -> Result<Vec<Document>> {
        let compiled = compile_neighbors(handle, scope, direction)?;
        let rows = self.store.execute(&compiled.aql).await?;
        Ok(plain_documents(rows))
    }

    /// Creates an edge between two vertices. The edge collection is resolved
    /// from the logical model by matching the handles' collection pair
    /// against declared relations.
    pub async fn create_edge(
        &self,
        from: &str,
        to: &str,
        mut data: Document,
    ) -> Result<Document> {
        let (from_collection, _) = check_handle(from)?;
        let (to_collection, _) = check_handle(to)?;
        let edge_collection = self
            .schema
            .edge_collection_between(from_collection, to_collection)
            .ok_or_else(|| {
                ArqoError::validation(
                    from,
                    format!(
                        "no declared relation between `{from_collection}` and `{to_collection}`"
                    ),
                )
            })?
            .to_string();
        debug!(%edge_collection, from, to, "creating edge");
        data.insert("_from".to_string(), Value::String(from.to_string()));
        data.insert("_to".to_string(), Value::String(to.to_string()));
        Ok(self.store.insert(&edge_collection, data).await?)
    }

    /// Removes an edge by its own handle.
    pub async fn delete_edge(&self, handle: &str) -> Result<Document> {
        check_handle(handle)?;
        Ok(self.store.remove(handle).await?)
    }

    /// Executes caller-supplied AQL unmodified and returns the raw rows.
    pub async fn raw_query(&self, aql: &str) -> Result<Vec<Value>> {
        Ok(self.store.execute(aql).await?)
    }

    fn physical(&self, collection: &str) -> String {
        self.schema
            .get(collection)
            .map_or(collection, LogicalCollection::physical)
            .to_string()
    }

    /// Unwraps `{d: record, <alias>: ...}` rows, attaches graph-join lists
    /// and applies the select manifest.
    fn shape_wrapped(&self, rows: Vec<Value>, compiled: &CompiledQuery) -> Result<Vec<Document>> {
        let graph_joins = self.config.graph.is_some();
        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut row) = row else {
                return Err(ArqoError::Compilation(format!(
                    "expected an object row, store returned {row}"
                )));
            };
            let Some(Value::Object(mut doc)) = row.remove("d") else {
                return Err(ArqoError::Compilation(
                    "result row is missing its record field".to_string(),
                ));
            };

            if !compiled.select.is_empty() {
                let mut trimmed = Document::new();
                for key in [HANDLE_FIELD, KEY_FIELD, REV_FIELD] {
                    if let Some(v) = doc.remove(key) {
                        trimmed.insert(key.to_string(), v);
                    }
                }
                for key in &compiled.select {
                    if let Some(v) = doc.remove(key.as_str()) {
                        trimmed.insert(key.clone(), v);
                    }
                }
                doc = trimmed;
            }

            if graph_joins {
                for join in &compiled.joins {
                    if compiled.select.is_empty() || compiled.select.contains(&join.alias) {
                        let neighbors = row
                            .remove(join.alias.as_str())
                            .unwrap_or_else(|| Value::Array(Vec::new()));
                        doc.insert(join.alias.clone(), neighbors);
                    }
                }
            }
            documents.push(doc);
        }
        Ok(documents)
    }
}

/// Converts raw rows into documents, skipping non-object rows.
fn plain_documents(rows: Vec<Value>) -> Vec<Document> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(doc) => Some(doc),
            _ => None,
        })
        .collect()
}
