//! Boundary contract to the external document/graph store.
//!
//! The transport layer (connection pooling, HTTP, retries) lives behind
//! [`StoreClient`]; this crate only compiles programs and hands them over.
//! Tests drive the crate through an in-memory implementation.

use serde_json::Value;
use thiserror::Error;

use crate::model::EdgeDefinition;

/// A stored record: a flat mapping of field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Physical collection kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionKind {
    /// Vertex/document collection.
    Document,
    /// Edge collection.
    Edge,
}

/// One existing physical collection, as reported by the store.
#[derive(Clone, Debug)]
pub struct CollectionInfo {
    /// Physical collection name.
    pub name: String,
    /// Document or edge.
    pub kind: CollectionKind,
}

/// Native store failure, passed through unmodified.
#[derive(Clone, Debug, Error)]
#[error("store error: {message}")]
pub struct StoreError {
    /// Store-native error number, when the store supplied one.
    pub code: Option<i64>,
    /// Store-native error message.
    pub message: String,
}

impl StoreError {
    /// Error with a message only.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Async contract the external store client implements.
///
/// All methods are non-blocking; one slow request must not stall compilation
/// of others. Cancellation is caller-driven (drop the pending future) and
/// timeout policy belongs to the implementation.
pub trait StoreClient {
    /// Executes a query program and returns the ordered result rows.
    fn execute(
        &self,
        aql: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Value>, StoreError>> + Send;

    /// Lists existing physical collections with their kinds.
    fn list_collections(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<CollectionInfo>, StoreError>> + Send;

    /// Creates a physical collection of the given kind.
    fn create_collection(
        &self,
        name: &str,
        kind: CollectionKind,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Registers a vertex collection with the named graph.
    fn add_vertex_collection(
        &self,
        graph: &str,
        name: &str,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Registers an edge definition with the named graph.
    fn add_edge_definition(
        &self,
        graph: &str,
        definition: &EdgeDefinition,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Inserts one document, returning the stored copy (with `_id`, `_key`,
    /// `_rev` populated).
    fn insert(
        &self,
        collection: &str,
        document: Document,
    ) -> impl std::future::Future<Output = Result<Document, StoreError>> + Send;

    /// Removes one document by handle (`collection/key`), returning the
    /// removed copy.
    fn remove(
        &self,
        handle: &str,
    ) -> impl std::future::Future<Output = Result<Document, StoreError>> + Send;
}
