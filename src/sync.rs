//! Schema synchronizer: reconciles the logical model with physical storage.
//!
//! A pure [`plan`] diffs the declared schema against what the store reports;
//! [`synchronize`] then applies the plan as one ordered pipeline (document
//! collections, then edge collections, then vertex registrations, then edge
//! definitions), failing fast on the first store error. Re-running against a provisioned
//! store yields an empty plan and performs no writes; existing objects are
//! never dropped or altered.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{ArqoError, Result};
use crate::model::{EdgeDefinition, Schema};
use crate::store::{CollectionInfo, CollectionKind, StoreClient, StoreError};

/// The computed difference between declared and existing storage objects.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// Document collections to create, in schema order.
    pub missing_documents: Vec<String>,
    /// Edge collections to create, in schema order.
    pub missing_edges: Vec<String>,
    /// Vertex collections to register with the graph (the newly created
    /// document collections).
    pub vertex_registrations: Vec<String>,
    /// Edge definitions to register with the graph (those backed by a newly
    /// created edge collection).
    pub edge_definitions: Vec<EdgeDefinition>,
}

impl SyncPlan {
    /// True when the store already matches the declared model.
    pub fn is_empty(&self) -> bool {
        self.missing_documents.is_empty() && self.missing_edges.is_empty()
    }
}

/// Diffs the declared schema against the collections the store reported.
pub fn plan(schema: &Schema, graph: Option<&str>, existing: &[CollectionInfo]) -> SyncPlan {
    let existing_documents: BTreeSet<&str> = existing
        .iter()
        .filter(|c| c.kind == CollectionKind::Document)
        .map(|c| c.name.as_str())
        .collect();
    let existing_edges: BTreeSet<&str> = existing
        .iter()
        .filter(|c| c.kind == CollectionKind::Edge)
        .map(|c| c.name.as_str())
        .collect();

    let missing_documents: Vec<String> = schema
        .collections()
        .map(|col| col.physical().to_string())
        .filter(|name| !existing_documents.contains(name.as_str()))
        .collect();

    let mut missing_edges: Vec<String> = Vec::new();
    for col in schema.collections() {
        for rel in col.relations() {
            let name = rel.edge_collection.as_str();
            if !existing_edges.contains(name) && !missing_edges.iter().any(|e| e == name) {
                missing_edges.push(name.to_string());
            }
        }
    }

    let (vertex_registrations, edge_definitions) = match graph {
        Some(graph) => (
            missing_documents.clone(),
            schema
                .named_graph(graph)
                .edge_definitions
                .into_iter()
                .filter(|def| missing_edges.contains(&def.collection))
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    SyncPlan {
        missing_documents,
        missing_edges,
        vertex_registrations,
        edge_definitions,
    }
}

/// Inspects the store, diffs, and provisions missing objects in dependency
/// order. Returns the applied plan. Concurrent synchronization of the same
/// connection is not supported; run once at connection setup.
pub async fn synchronize<C: StoreClient>(
    store: &C,
    schema: &Schema,
    graph: Option<&str>,
) -> Result<SyncPlan> {
    let existing = store
        .list_collections()
        .await
        .map_err(|e| stage_error("inspect", e))?;
    let plan = plan(schema, graph, &existing);
    if plan.is_empty() {
        debug!("schema already synchronized, nothing to create");
    }

    for name in &plan.missing_documents {
        info!(collection = %name, "creating document collection");
        store
            .create_collection(name, CollectionKind::Document)
            .await
            .map_err(|e| stage_error("create-document-collection", e))?;
    }

    for name in &plan.missing_edges {
        info!(collection = %name, "creating edge collection");
        store
            .create_collection(name, CollectionKind::Edge)
            .await
            .map_err(|e| stage_error("create-edge-collection", e))?;
    }

    if let Some(graph) = graph {
        // Vertex registration depends on the document collections existing,
        // edge definitions on the edge collections; both run after creation.
        for name in &plan.vertex_registrations {
            info!(graph, collection = %name, "registering vertex collection");
            store
                .add_vertex_collection(graph, name)
                .await
                .map_err(|e| stage_error("register-vertex-collection", e))?;
        }
        for definition in &plan.edge_definitions {
            info!(graph, edge = %definition.collection, "registering edge definition");
            store
                .add_edge_definition(graph, definition)
                .await
                .map_err(|e| stage_error("register-edge-definition", e))?;
        }
    }

    Ok(plan)
}

fn stage_error(stage: &'static str, source: StoreError) -> ArqoError {
    ArqoError::SchemaSync { stage, source }
}
