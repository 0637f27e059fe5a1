use std::time::Duration;

use onboard_store::{Deadline, DocumentStore, SqliteDocumentStore, StoreError};
use onboard_types::ObjectId;
use pretty_assertions::assert_eq;
use serde_json::{Map, Value, json};

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test body must be an object"),
    }
}

fn deadline() -> Deadline {
    Deadline::after(Duration::from_secs(5))
}

// ── Insert & find ────────────────────────────────────────────────

#[tokio::test]
async fn insert_generates_id_and_find_returns_body() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let id = store
        .insert("books", None, body(json!({"title": "Dune"})), &deadline())
        .await
        .unwrap();

    let doc = store.find_by_id("books", &id, &deadline()).await.unwrap();
    assert_eq!(doc.id, id);
    assert_eq!(doc.get("title"), Some(&json!("Dune")));
}

#[tokio::test]
async fn insert_keeps_supplied_id() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let wanted = ObjectId::new();
    let id = store
        .insert("books", Some(wanted), body(json!({"title": "Emma"})), &deadline())
        .await
        .unwrap();
    assert_eq!(id, wanted);
}

#[tokio::test]
async fn duplicate_id_is_rejected() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let id = ObjectId::new();
    store.insert("books", Some(id), Map::new(), &deadline()).await.unwrap();
    let err = store.insert("books", Some(id), Map::new(), &deadline()).await.unwrap_err();
    assert!(matches!(err, StoreError::Database(_)));
}

#[tokio::test]
async fn find_missing_is_not_found() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let err = store
        .find_by_id("books", &ObjectId::new(), &deadline())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn find_all_in_insertion_order() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for title in ["a", "b", "c"] {
        store
            .insert("books", None, body(json!({"title": title})), &deadline())
            .await
            .unwrap();
    }
    let titles: Vec<Value> = store
        .find_all("books", &deadline())
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.body["title"].clone())
        .collect();
    assert_eq!(titles, vec![json!("a"), json!("b"), json!("c")]);
}

#[tokio::test]
async fn collections_are_isolated() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    store.insert("books", None, Map::new(), &deadline()).await.unwrap();
    assert_eq!(store.count("books", &deadline()).await.unwrap(), 1);
    assert_eq!(store.count("users", &deadline()).await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_collection_name_is_rejected() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let err = store.count("books;--", &deadline()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

// ── Update & delete ──────────────────────────────────────────────

#[tokio::test]
async fn update_replaces_only_listed_fields() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let id = store
        .insert("users", None, body(json!({"firstName": "Matt", "age": 20})), &deadline())
        .await
        .unwrap();

    let updated = store
        .update_by_id("users", &id, body(json!({"age": 30})), &deadline())
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let doc = store.find_by_id("users", &id, &deadline()).await.unwrap();
    assert_eq!(Value::Object(doc.body), json!({"firstName": "Matt", "age": 30}));
}

#[tokio::test]
async fn update_missing_returns_zero() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let updated = store
        .update_by_id("users", &ObjectId::new(), body(json!({"age": 1})), &deadline())
        .await
        .unwrap();
    assert_eq!(updated, 0);
}

#[tokio::test]
async fn delete_reports_count() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let id = store.insert("books", None, Map::new(), &deadline()).await.unwrap();
    assert_eq!(store.delete_by_id("books", &id, &deadline()).await.unwrap(), 1);
    assert_eq!(store.delete_by_id("books", &id, &deadline()).await.unwrap(), 0);
    assert_eq!(store.count("books", &deadline()).await.unwrap(), 0);
}

// ── Deadlines ────────────────────────────────────────────────────

#[tokio::test]
async fn expired_deadline_times_out() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let err = store
        .count("books", &Deadline::after(Duration::ZERO))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

// ── Cursors ──────────────────────────────────────────────────────

#[tokio::test]
async fn cursor_over_missing_collection_is_empty() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let mut cursor = store.open_cursor("books").await.unwrap();
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn cursor_yields_every_document_in_order() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let mut ids = Vec::new();
    for i in 0..100 {
        ids.push(
            store
                .insert("books", None, body(json!({"n": i})), &deadline())
                .await
                .unwrap(),
        );
    }

    let mut cursor = store.open_cursor("books").await.unwrap();
    let mut seen = Vec::new();
    while let Some(doc) = cursor.next().await {
        seen.push(doc.unwrap().id);
    }
    assert_eq!(seen, ids);
}

#[tokio::test]
async fn dropped_cursor_does_not_block_writers() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for i in 0..200 {
        store
            .insert("books", None, body(json!({"n": i})), &deadline())
            .await
            .unwrap();
    }

    let mut cursor = store.open_cursor("books").await.unwrap();
    assert!(cursor.next().await.unwrap().is_ok());
    drop(cursor);

    store
        .insert("books", None, body(json!({"n": 200})), &deadline())
        .await
        .unwrap();
    assert_eq!(store.count("books", &deadline()).await.unwrap(), 201);
}

#[tokio::test]
async fn closed_cursor_drains_buffer_then_ends() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    for i in 0..5 {
        store
            .insert("books", None, body(json!({"n": i})), &deadline())
            .await
            .unwrap();
    }
    let mut cursor = store.open_cursor("books").await.unwrap();
    assert!(cursor.next().await.is_some());
    cursor.close();
    let mut rest = 0;
    while cursor.next().await.is_some() {
        rest += 1;
    }
    assert!(rest <= 4);
}

#[tokio::test]
async fn writes_to_fresh_collection_while_cursor_is_open() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    store.ensure_collections(&["users", "books"]).await.unwrap();
    for i in 0..200 {
        store
            .insert("users", None, body(json!({"n": i})), &deadline())
            .await
            .unwrap();
    }

    // Keep the statement open: one item read, the rest still pending.
    let mut cursor = store.open_cursor("users").await.unwrap();
    assert!(cursor.next().await.unwrap().is_ok());

    let book = store
        .insert("books", None, body(json!({"title": "Dune"})), &deadline())
        .await
        .unwrap();
    assert_eq!(store.count("books", &deadline()).await.unwrap(), 1);
    assert!(store.find_by_id("books", &book, &deadline()).await.is_ok());

    let mut books = store.open_cursor("books").await.unwrap();
    assert_eq!(books.next().await.unwrap().unwrap().id, book);

    let mut rest = 0;
    while let Some(doc) = cursor.next().await {
        doc.unwrap();
        rest += 1;
    }
    assert_eq!(rest, 199);
}

#[tokio::test]
async fn ensure_collections_rejects_invalid_names() {
    let store = SqliteDocumentStore::open_in_memory().unwrap();
    let err = store.ensure_collections(&["users", "bad name"]).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidData(_)));
}

// ── File-backed stores ───────────────────────────────────────────

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("onboard.db");

    let id = {
        let store = SqliteDocumentStore::open(&path).unwrap();
        store
            .insert("books", None, body(json!({"title": "Kept"})), &deadline())
            .await
            .unwrap()
    };

    let store = SqliteDocumentStore::open(&path).unwrap();
    let doc = store.find_by_id("books", &id, &deadline()).await.unwrap();
    assert_eq!(doc.get("title"), Some(&json!("Kept")));

    let mut cursor = store.open_cursor("books").await.unwrap();
    assert_eq!(cursor.next().await.unwrap().unwrap().id, id);
    assert!(cursor.next().await.is_none());
}

#[tokio::test]
async fn reader_open_failure_arrives_through_the_cursor() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("onboard.db");
    let store = SqliteDocumentStore::open(&path).unwrap();
    store
        .insert("books", None, body(json!({"title": "Gone"})), &deadline())
        .await
        .unwrap();

    // The primary connection keeps working; a new reader cannot find the file.
    std::fs::remove_file(&path).unwrap();

    let mut cursor = store.open_cursor("books").await.unwrap();
    let err = cursor.next().await.unwrap().unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(cursor.next().await.is_none());
}
