#![allow(missing_docs)]

mod util;

use arqo::{
    ArqoError, Attribute, AttributeType, CollectionKind, Connection, ConnectionConfig, Direction,
    EdgeRelation, LogicalCollection, Schema, synchronize,
};
use util::MockStore;

fn schema() -> Schema {
    let users = LogicalCollection::new("users")
        .attribute("name", Attribute::new(AttributeType::String))
        .attribute(
            "pet",
            Attribute::new(AttributeType::Reference).with_edge(EdgeRelation {
                target: "pets".into(),
                edge_collection: "owns".into(),
                direction: Direction::Any,
            }),
        );
    let pets = LogicalCollection::new("pets");
    Schema::new(vec![users, pets]).expect("schema")
}

#[tokio::test]
async fn provisions_empty_store_in_dependency_order() {
    let store = MockStore::new();
    let plan = synchronize(&store, &schema(), Some("zoo")).await.unwrap();

    assert_eq!(plan.missing_documents, vec!["pets", "users"]);
    assert_eq!(plan.missing_edges, vec!["owns"]);

    let created = store.created.lock().unwrap().clone();
    assert_eq!(
        created,
        vec![
            ("pets".to_string(), CollectionKind::Document),
            ("users".to_string(), CollectionKind::Document),
            ("owns".to_string(), CollectionKind::Edge),
        ],
        "documents created before edges"
    );
    assert_eq!(
        store.vertex_registrations.lock().unwrap().clone(),
        vec!["pets".to_string(), "users".to_string()]
    );
    let defs = store.edge_definitions.lock().unwrap().clone();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].collection, "owns");
    assert_eq!(defs[0].from, vec!["users".to_string()]);
    assert_eq!(defs[0].to, vec!["pets".to_string()]);
}

#[tokio::test]
async fn second_run_creates_nothing() {
    let store = MockStore::new();
    synchronize(&store, &schema(), Some("zoo")).await.unwrap();
    let after_first = store.created_count();

    let plan = synchronize(&store, &schema(), Some("zoo")).await.unwrap();
    assert!(plan.is_empty(), "second diff is empty");
    assert_eq!(
        store.created_count(),
        after_first,
        "no additional physical objects on re-run"
    );
}

#[tokio::test]
async fn creation_failure_aborts_the_pipeline() {
    let store = MockStore::new();
    *store.fail_create.lock().unwrap() = Some("pets".to_string());

    let err = synchronize(&store, &schema(), Some("zoo")).await.unwrap_err();
    match err {
        ArqoError::SchemaSync { stage, source } => {
            assert_eq!(stage, "create-document-collection");
            assert_eq!(source.code, Some(1207));
        }
        other => panic!("expected schema sync error, got {other:?}"),
    }
    // `pets` sorts first, so nothing else was attempted.
    assert_eq!(store.created_count(), 0);
    assert!(store.vertex_registrations.lock().unwrap().is_empty());
    assert!(store.edge_definitions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn connect_aborts_on_sync_failure() {
    let store = MockStore::new();
    *store.fail_create.lock().unwrap() = Some("users".to_string());

    let result = Connection::connect(
        store,
        schema(),
        ConnectionConfig::with_graph("zoo"),
    )
    .await;
    assert!(matches!(result, Err(ArqoError::SchemaSync { .. })));
}

#[tokio::test]
async fn sync_without_graph_skips_registrations() {
    let store = MockStore::new();
    synchronize(&store, &schema(), None).await.unwrap();

    assert_eq!(store.created_count(), 3, "collections still created");
    assert!(store.vertex_registrations.lock().unwrap().is_empty());
    assert!(store.edge_definitions.lock().unwrap().is_empty());
}
