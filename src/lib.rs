//! Criteria-to-AQL query compiler and schema synchronizer.
//!
//! `arqo` translates a storage-agnostic criteria description (filters, sort,
//! pagination, field selection, joins, single-group aggregates) into AQL
//! programs for a document/graph store, keeps the store's physical schema in
//! line with a declared logical model, and casts raw result rows back onto
//! declared attribute types. Transport to the store lives behind the async
//! [`store::StoreClient`] trait; compilation itself is pure and synchronous.

#![warn(missing_docs)]

pub mod cast;
pub mod connection;
pub mod criteria;
pub mod error;
pub mod model;
pub mod query;
pub mod store;
pub mod sync;

pub use cast::Caster;
pub use connection::{Connection, ConnectionConfig};
pub use criteria::{Criteria, FilterTree, JoinSpec, SortDirection, SortKey};
pub use error::{ArqoError, Result};
pub use model::{
    Attribute, AttributeType, Direction, EdgeDefinition, EdgeRelation, LogicalCollection,
    NamedGraph, Schema,
};
pub use query::{CompiledQuery, NeighborScope};
pub use store::{CollectionInfo, CollectionKind, Document, StoreClient, StoreError};
pub use sync::{plan as plan_sync, synchronize, SyncPlan};
