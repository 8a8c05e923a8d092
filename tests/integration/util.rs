//! In-memory store client shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use arqo::{
    CollectionInfo, CollectionKind, Document, EdgeDefinition, StoreClient, StoreError,
};

/// Scriptable in-memory stand-in for the external store.
#[derive(Default)]
pub struct MockStore {
    /// Collections the store reports as existing.
    pub collections: Mutex<Vec<CollectionInfo>>,
    /// Creation log: `(name, kind)` in call order.
    pub created: Mutex<Vec<(String, CollectionKind)>>,
    /// Vertex collections registered with a graph.
    pub vertex_registrations: Mutex<Vec<String>>,
    /// Edge definitions registered with a graph.
    pub edge_definitions: Mutex<Vec<EdgeDefinition>>,
    /// Every AQL program handed to `execute`, in call order.
    pub queries: Mutex<Vec<String>>,
    /// Queued responses for `execute`, popped front first.
    pub responses: Mutex<VecDeque<Vec<Value>>>,
    /// Insert log: `(collection, stored document)`.
    pub inserted: Mutex<Vec<(String, Document)>>,
    /// Remove log: handles in call order.
    pub removed: Mutex<Vec<String>>,
    /// When set, `create_collection` fails for this name.
    pub fail_create: Mutex<Option<String>>,
    /// When set, `execute` fails with this error.
    pub fail_execute: Mutex<Option<StoreError>>,
}

/// Installs the env-filtered test subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockStore {
    pub fn new() -> Self {
        init_tracing();
        Self::default()
    }

    /// Queues one `execute` response.
    pub fn respond_with(&self, rows: Vec<Value>) {
        self.responses.lock().unwrap().push_back(rows);
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn last_query(&self) -> String {
        self.queries.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

impl StoreClient for MockStore {
    fn execute(&self, aql: &str) -> impl Future<Output = Result<Vec<Value>, StoreError>> + Send {
        let aql = aql.to_string();
        async move {
            if let Some(err) = self.fail_execute.lock().unwrap().clone() {
                return Err(err);
            }
            self.queries.lock().unwrap().push(aql);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_default())
        }
    }

    fn list_collections(
        &self,
    ) -> impl Future<Output = Result<Vec<CollectionInfo>, StoreError>> + Send {
        async move { Ok(self.collections.lock().unwrap().clone()) }
    }

    fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let name = name.to_string();
        async move {
            if self.fail_create.lock().unwrap().as_deref() == Some(name.as_str()) {
                return Err(StoreError {
                    code: Some(1207),
                    message: format!("cannot create `{name}`"),
                });
            }
            self.created.lock().unwrap().push((name.clone(), kind));
            self.collections
                .lock()
                .unwrap()
                .push(CollectionInfo { name, kind });
            Ok(())
        }
    }

    fn add_vertex_collection(
        &self,
        _graph: &str,
        name: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let name = name.to_string();
        async move {
            self.vertex_registrations.lock().unwrap().push(name);
            Ok(())
        }
    }

    fn add_edge_definition(
        &self,
        _graph: &str,
        definition: &EdgeDefinition,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        let definition = definition.clone();
        async move {
            self.edge_definitions.lock().unwrap().push(definition);
            Ok(())
        }
    }

    fn insert(
        &self,
        collection: &str,
        document: Document,
    ) -> impl Future<Output = Result<Document, StoreError>> + Send {
        let collection = collection.to_string();
        async move {
            let mut stored = document;
            let key = format!("{}", self.inserted.lock().unwrap().len() + 1);
            stored.insert("_key".to_string(), Value::String(key.clone()));
            stored.insert(
                "_id".to_string(),
                Value::String(format!("{collection}/{key}")),
            );
            stored.insert("_rev".to_string(), Value::String("r1".to_string()));
            self.inserted
                .lock()
                .unwrap()
                .push((collection, stored.clone()));
            Ok(stored)
        }
    }

    fn remove(&self, handle: &str) -> impl Future<Output = Result<Document, StoreError>> + Send {
        let handle = handle.to_string();
        async move {
            self.removed.lock().unwrap().push(handle.clone());
            let mut removed = Document::new();
            removed.insert("_id".to_string(), Value::String(handle));
            Ok(removed)
        }
    }
}
