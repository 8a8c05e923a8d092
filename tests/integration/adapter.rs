#![allow(missing_docs)]

mod util;

use serde_json::{json, Value};

use arqo::{
    ArqoError, Attribute, AttributeType, Connection, ConnectionConfig, Criteria, Direction,
    Document, EdgeRelation, LogicalCollection, NeighborScope, Schema, StoreError,
};
use util::MockStore;

fn schema() -> Schema {
    let users = LogicalCollection::new("users")
        .attribute("name", Attribute::new(AttributeType::String))
        .attribute("tags", Attribute::new(AttributeType::Array))
        .attribute("dob", Attribute::new(AttributeType::Date))
        .attribute(
            "pet",
            Attribute::new(AttributeType::Reference).with_edge(EdgeRelation {
                target: "pets".into(),
                edge_collection: "owns".into(),
                direction: Direction::Any,
            }),
        );
    let pets = LogicalCollection::new("pets")
        .attribute("name", Attribute::new(AttributeType::String));
    Schema::new(vec![users, pets]).expect("schema")
}

fn no_sync() -> ConnectionConfig {
    ConnectionConfig {
        sync_on_connect: false,
        ..ConnectionConfig::default()
    }
}

fn doc(v: Value) -> Document {
    match v {
        Value::Object(m) => m,
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn find_compiles_executes_and_casts() {
    let store = MockStore::new();
    store.respond_with(vec![json!({
        "d": {"_key": "1", "_id": "users/1", "name": "Fred Blogs", "tags": "[1,2]"}
    })]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria = Criteria::new()
        .filter(json!({"name": {"contains": "fred blogs"}}))
        .unwrap();
    let found = conn.find("users", &criteria).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].get("id"), Some(&json!("1")), "primary key aliased");
    assert_eq!(found[0].get("tags"), Some(&json!([1, 2])), "array cast");
}

#[tokio::test]
async fn find_emits_case_insensitive_like_by_default() {
    let store = MockStore::new();
    store.respond_with(vec![]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria = Criteria::new()
        .filter(json!({"name": {"contains": "fred blogs"}}))
        .unwrap();
    conn.find("users", &criteria).await.unwrap();

    assert_eq!(
        conn.store().last_query(),
        "FOR d IN users FILTER LOWER(d.name) LIKE LOWER(\"%fred blogs%\") RETURN {d: d}"
    );
}

#[tokio::test]
async fn select_trims_to_requested_fields() {
    let store = MockStore::new();
    store.respond_with(vec![json!({
        "d": {"_key": "1", "_id": "users/1", "_rev": "r", "name": "Fred", "dob": "x", "extra": 1}
    })]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria = Criteria::new().select(["name"]);
    let found = conn.find("users", &criteria).await.unwrap();

    assert_eq!(found[0].get("name"), Some(&json!("Fred")));
    assert_eq!(found[0].get("_key"), Some(&json!("1")));
    assert!(found[0].get("extra").is_none(), "unselected field trimmed");
    assert!(found[0].get("dob").is_none());
}

#[tokio::test]
async fn relational_join_returns_merged_and_unmerged_parents() {
    let store = MockStore::new();
    store.respond_with(vec![
        json!({"d": {"_key": "1", "name": "Fred", "pet": {"_key": "9", "name": "Rex"}}}),
        json!({"d": {"_key": "2", "name": "Mary"}}),
    ]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria: Criteria = serde_json::from_value(json!({
        "joins": [{
            "alias": "pet",
            "parent": "users",
            "parentKey": "pet_id",
            "child": "pets",
            "childKey": "id"
        }]
    }))
    .unwrap();
    let found = conn.find("users", &criteria).await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(
        found[0].get("pet").and_then(|p| p.get("name")),
        Some(&json!("Rex")),
        "matched parent merged with its pet"
    );
    assert!(
        found[1].get("pet").is_none(),
        "parent without a match has no alias field"
    );
}

#[tokio::test]
async fn graph_join_attaches_neighbor_lists() {
    let store = MockStore::new();
    store.respond_with(vec![json!({
        "d": {"_key": "42", "name": "Fred"},
        "pet": [{"_key": "9", "name": "Rex"}]
    })]);
    let config = ConnectionConfig {
        graph: Some("zoo".into()),
        sync_on_connect: false,
        ..ConnectionConfig::default()
    };
    let conn = Connection::connect(store, schema(), config).await.unwrap();

    let criteria: Criteria = serde_json::from_value(json!({
        "where": {"id": "42"},
        "joins": [{
            "alias": "pet",
            "parent": "users",
            "parentKey": "pet_id",
            "child": "pets",
            "childKey": "id"
        }]
    }))
    .unwrap();
    let found = conn.find("users", &criteria).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].get("pet"),
        Some(&json!([{"_key": "9", "name": "Rex"}])),
        "graph neighbors come back as a list"
    );
}

#[tokio::test]
async fn create_then_find_round_trips_structured_arrays() {
    let store = MockStore::new();
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let created = conn
        .create("users", doc(json!({"name": "Fred", "tags": [1, 2, 3]})))
        .await
        .unwrap();
    assert_eq!(created.get("tags"), Some(&json!([1, 2, 3])));
    assert_eq!(created.get("id"), created.get("_key"));
}

#[tokio::test]
async fn update_returns_cast_modified_records() {
    let store = MockStore::new();
    store.respond_with(vec![json!({"_key": "1", "name": "Fred", "age": 31})]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria = Criteria::new().filter(json!({"name": "Fred"})).unwrap();
    let updated = conn
        .update("users", &criteria, &json!({"age": 31}))
        .await
        .unwrap();

    assert_eq!(updated[0].get("age"), Some(&json!(31)));
    assert_eq!(updated[0].get("id"), Some(&json!("1")));
}

#[tokio::test]
async fn destroy_returns_removed_records() {
    let store = MockStore::new();
    store.respond_with(vec![json!({"_key": "1", "name": "Fred"})]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let criteria = Criteria::new().filter(json!({"id": "1"})).unwrap();
    let removed = conn.destroy("users", &criteria).await.unwrap();
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].get("id"), Some(&json!("1")));
}

#[tokio::test]
async fn neighbors_returns_raw_vertices() {
    let store = MockStore::new();
    store.respond_with(vec![json!({"_key": "9", "name": "Rex"})]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let neighbors = conn
        .neighbors(
            "users/42",
            &NeighborScope::EdgeCollection("owns".into()),
            Direction::Any,
        )
        .await
        .unwrap();
    assert_eq!(neighbors.len(), 1);
    assert_eq!(neighbors[0].get("name"), Some(&json!("Rex")));
}

#[tokio::test]
async fn create_edge_resolves_collection_from_declared_relations() {
    let store = MockStore::new();
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let edge = conn
        .create_edge("users/1", "pets/9", doc(json!({"since": 2020})))
        .await
        .unwrap();
    assert_eq!(edge.get("_from"), Some(&json!("users/1")));
    assert_eq!(edge.get("_to"), Some(&json!("pets/9")));
    assert_eq!(
        edge.get("_id").and_then(Value::as_str).map(|s| s.split('/').next().unwrap()),
        Some("owns"),
        "edge written into the declared edge collection"
    );
}

#[tokio::test]
async fn create_edge_without_declared_relation_fails() {
    let store = MockStore::new();
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let err = conn
        .create_edge("pets/9", "users/1", Document::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ArqoError::Validation { .. }));
}

#[tokio::test]
async fn delete_edge_removes_by_handle() {
    let store = MockStore::new();
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let removed = conn.delete_edge("owns/5").await.unwrap();
    assert_eq!(removed.get("_id"), Some(&json!("owns/5")));
    assert!(conn.delete_edge("not-a-handle").await.is_err());
}

#[tokio::test]
async fn raw_query_passes_aql_through_unmodified() {
    let store = MockStore::new();
    store.respond_with(vec![json!({"n": 1}), json!(2)]);
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let rows = conn.raw_query("RETURN 1 + 1").await.unwrap();
    assert_eq!(conn.store().last_query(), "RETURN 1 + 1");
    assert_eq!(rows, vec![json!({"n": 1}), json!(2)], "rows come back unshaped");
}

#[tokio::test]
async fn store_errors_surface_unmodified() {
    let store = MockStore::new();
    *store.fail_execute.lock().unwrap() = Some(StoreError {
        code: Some(1203),
        message: "collection not found".into(),
    });
    let conn = Connection::connect(store, schema(), no_sync()).await.unwrap();

    let err = conn.find("users", &Criteria::new()).await.unwrap_err();
    match err {
        ArqoError::Store(store_err) => {
            assert_eq!(store_err.code, Some(1203));
            assert_eq!(store_err.message, "collection not found");
        }
        other => panic!("expected store error, got {other:?}"),
    }
}
