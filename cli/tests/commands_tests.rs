use arena_cli::{Command, parse_fields, run};
use arena_data::{DataClient, DataConfig};
use arena_store::MemoryStore;
use arena_types::Record;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::sync::Arc;

fn seeded() -> (Arc<MemoryStore>, DataClient) {
    let rows = vec![
        Record::new("a1", json!({"title": "Canine Base", "price": 30}).as_object().cloned().unwrap()),
        Record::new("a2", json!({"title": "Fox Tail", "price": 10}).as_object().cloned().unwrap()),
    ];
    let store = Arc::new(
        MemoryStore::new()
            .with_records("assets", rows)
            .with_function("echo", |payload| Ok(payload)),
    );
    let client = DataClient::from_backend(store.clone(), DataConfig::default());
    (store, client)
}

async fn run_json(command: Command, client: &DataClient) -> Value {
    let out = run(command, client).await.unwrap();
    serde_json::from_str(&out).unwrap()
}

// ── Reads ────────────────────────────────────────────────────────

#[tokio::test]
async fn get_prints_record() {
    let (_, client) = seeded();
    let out = run_json(
        Command::Get {
            table: "assets".into(),
            id: "a2".into(),
        },
        &client,
    )
    .await;
    assert_eq!(out, json!({"id": "a2", "title": "Fox Tail", "price": 10}));
}

#[tokio::test]
async fn get_missing_record_fails() {
    let (_, client) = seeded();
    let err = run(
        Command::Get {
            table: "assets".into(),
            id: "zz".into(),
        },
        &client,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "assets/zz not found");
}

#[tokio::test]
async fn list_orders_and_counts() {
    let (_, client) = seeded();
    let out = run_json(
        Command::List {
            table: "assets".into(),
            order_by: Some("price".into()),
            desc: false,
            limit: Some(1),
        },
        &client,
    )
    .await;
    assert_eq!(out["count"], json!(2));
    assert_eq!(out["records"][0]["id"], json!("a2"));
    assert_eq!(out["records"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn search_matches_substring() {
    let (_, client) = seeded();
    let out = run_json(
        Command::Search {
            table: "assets".into(),
            term: "FOX".into(),
            fields: vec!["title".into()],
            select: "id".into(),
        },
        &client,
    )
    .await;
    assert_eq!(out, json!([{"id": "a2"}]));
}

// ── Writes ───────────────────────────────────────────────────────

#[tokio::test]
async fn insert_update_delete() {
    let (store, client) = seeded();

    let out = run_json(
        Command::Insert {
            table: "assets".into(),
            json: r#"{"title": "Wolf Ears"}"#.into(),
        },
        &client,
    )
    .await;
    let id = out[0]["id"].as_str().unwrap().to_string();

    let out = run_json(
        Command::Update {
            table: "assets".into(),
            id: id.clone(),
            json: r#"{"price": 5}"#.into(),
        },
        &client,
    )
    .await;
    assert_eq!(out, json!({"updated": id}));

    run(
        Command::Delete {
            table: "assets".into(),
            id: id.clone(),
        },
        &client,
    )
    .await
    .unwrap();
    assert_eq!(store.rows("assets").await.len(), 2);
}

#[tokio::test]
async fn insert_rejects_audit_fields() {
    let (store, client) = seeded();
    let err = run(
        Command::Insert {
            table: "assets".into(),
            json: r#"{"created_by": "me"}"#.into(),
        },
        &client,
    )
    .await
    .unwrap_err();
    assert!(format!("{err:#}").contains("server-managed"));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn call_returns_function_output() {
    let (_, client) = seeded();
    let out = run_json(
        Command::Call {
            function: "echo".into(),
            json: r#"{"ping": true}"#.into(),
        },
        &client,
    )
    .await;
    assert_eq!(out, json!({"ping": true}));
}

#[test]
fn parse_fields_requires_object() {
    assert!(parse_fields(r#"{"a": 1}"#).is_ok());
    assert!(parse_fields("[1, 2]").is_err());
    assert!(parse_fields("not json").is_err());
}
