mod common;

use arena_data::{ErrorReporter, Mutation, MutationError, MutationMode, SaveStatus};
use arena_store::{MemoryStore, StoreError};
use common::{CapturingSink, asset_store, fields};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

// ── Insert / update / delete ─────────────────────────────────────

#[tokio::test]
async fn save_without_id_inserts_and_returns_record() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store.clone(), "assets");

    let created = m.save(Some(fields(json!({"title": "X"}))), None).await.unwrap();

    assert_eq!(created.len(), 1);
    assert!(!created[0].id.is_empty());
    assert_eq!(created[0].get_str("/title"), Some("X"));
    assert_eq!(store.rows("assets").await.len(), 1);
}

#[tokio::test]
async fn save_with_explicit_id_updates_and_returns_empty() {
    let store = Arc::new(MemoryStore::new().with_records("assets", vec![common::record("abc123", json!({"title": "X"}))]));
    let m = Mutation::new(store.clone(), "assets");

    let out = m.save(Some(fields(json!({"title": "Y"}))), Some("abc123")).await.unwrap();

    assert!(out.is_empty());
    assert_eq!(store.rows("assets").await[0].get_str("/title"), Some("Y"));
    assert!(m.is_success());
    assert!(!m.is_saving());
}

#[tokio::test]
async fn bound_id_selects_update() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").bound_to("a2");
    assert_eq!(m.bound_id(), Some("a2"));

    m.save(Some(fields(json!({"title": "Fox Tail v2"}))), None).await.unwrap();
    let rows = store.rows("assets").await;
    assert_eq!(rows.iter().find(|r| r.id == "a2").unwrap().get_str("/title"), Some("Fox Tail v2"));
}

#[tokio::test]
async fn explicit_id_overrides_bound_id() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").bound_to("a1");

    m.save(Some(fields(json!({"category": "prop"}))), Some("a3")).await.unwrap();
    let rows = store.rows("assets").await;
    assert_eq!(rows.iter().find(|r| r.id == "a3").unwrap().get_str("/category"), Some("prop"));
    assert_eq!(rows.iter().find(|r| r.id == "a1").unwrap().get_str("/category"), Some("avatar"));
}

#[tokio::test]
async fn delete_mode_deletes_bound_record() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").bound_to("a1").deleting();
    assert_eq!(m.mode(), MutationMode::Delete);

    let out = m.save(None, None).await.unwrap();
    assert!(out.is_empty());
    assert_eq!(store.rows("assets").await.len(), 2);
}

#[tokio::test]
async fn soft_delete_sets_flag() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets");

    m.soft_delete("a2").await.unwrap();
    let rows = store.rows("assets").await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().find(|r| r.id == "a2").unwrap().is_deleted());
}

#[tokio::test]
async fn soft_delete_on_deleter_keeps_the_row() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").bound_to("a1").deleting();

    let out = m.soft_delete("a1").await.unwrap();

    assert!(out.is_empty());
    assert!(m.is_success());
    let rows = store.rows("assets").await;
    assert_eq!(rows.len(), 3);
    let row = rows.iter().find(|r| r.id == "a1").unwrap();
    assert_eq!(row.get_bool("/isdeleted"), Some(true));
    assert!(row.is_deleted());
}

#[tokio::test]
async fn soft_delete_falls_back_to_bound_id() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").bound_to("a3");

    m.soft_delete("").await.unwrap();
    let rows = store.rows("assets").await;
    assert!(rows.iter().find(|r| r.id == "a3").unwrap().is_deleted());
}

#[tokio::test]
async fn soft_delete_without_any_id_is_rejected() {
    let store = Arc::new(asset_store());
    let m = Mutation::new(store.clone(), "assets").deleting();

    assert_eq!(m.soft_delete("").await.unwrap_err(), MutationError::MissingId);
    assert_eq!(store.call_count(), 0);
    assert_eq!(m.status(), SaveStatus::Idle);
}

// ── Programmer errors ────────────────────────────────────────────

#[tokio::test]
async fn audit_field_fails_before_any_store_call() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store.clone(), "assets");

    let err = m
        .save(Some(fields(json!({"title": "X", "createdAt": "2024-01-01T00:00:00Z"}))), None)
        .await
        .unwrap_err();

    assert_eq!(err, MutationError::ServerManagedField("createdAt".to_string()));
    assert!(err.is_programmer_error());
    assert_eq!(store.call_count(), 0);
    assert_eq!(m.status(), SaveStatus::Idle);
}

#[tokio::test]
async fn audit_field_rejected_even_when_store_is_down() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(StoreError::Transport("offline".into()));
    let m = Mutation::new(store.clone(), "assets").bound_to("a1");

    let err = m.save(Some(fields(json!({"createdat": "now"}))), None).await.unwrap_err();
    assert!(matches!(err, MutationError::ServerManagedField(_)));
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn upsert_without_fields_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store.clone(), "assets");
    assert_eq!(m.save(None, None).await.unwrap_err(), MutationError::MissingFields);
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn delete_without_id_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store.clone(), "assets").deleting();
    assert_eq!(m.save(None, None).await.unwrap_err(), MutationError::MissingId);
    assert_eq!(m.save(None, Some("")).await.unwrap_err(), MutationError::MissingId);
    assert_eq!(store.call_count(), 0);
}

// ── Store failures ───────────────────────────────────────────────

#[tokio::test]
async fn unique_violation_is_returned_and_stored() {
    let store = Arc::new(MemoryStore::new().with_unique("profiles", "username"));
    let m = Mutation::new(store.clone(), "profiles");
    m.save(Some(fields(json!({"username": "sam"}))), None).await.unwrap();

    let err = m.save(Some(fields(json!({"username": "sam"}))), None).await.unwrap_err();

    assert!(err.store_error().unwrap().is_unique_violation());
    assert!(!err.is_programmer_error());
    assert!(m.last_error().unwrap().is_unique_violation());
    assert!(!m.is_success());
    assert!(!m.is_saving());
}

#[tokio::test]
async fn failures_are_reported() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(StoreError::from_parts("42501", "permission denied", None));
    let sink = Arc::new(CapturingSink::default());
    let reporter = Arc::new(ErrorReporter::new(sink.clone()));
    let m = Mutation::new(store, "reports").with_reporter(reporter);

    assert!(m.save(Some(fields(json!({"reason": "spam"}))), None).await.is_err());
    assert_eq!(sink.messages(), vec!["database error 42501: permission denied".to_string()]);
}

#[tokio::test]
async fn benign_failures_are_not_forwarded() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(StoreError::Transport("Failed to fetch".into()));
    let sink = Arc::new(CapturingSink::default());
    let m = Mutation::new(store, "reports").with_reporter(Arc::new(ErrorReporter::new(sink.clone())));

    assert!(m.save(Some(fields(json!({}))), None).await.is_err());
    assert!(m.last_error().is_some());
    assert!(sink.messages().is_empty());
}

// ── Status machine ───────────────────────────────────────────────

#[tokio::test]
async fn status_moves_through_saving() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(50)));
    let m = Arc::new(Mutation::new(store, "assets"));
    let mut rx = m.subscribe();
    assert_eq!(*rx.borrow_and_update(), SaveStatus::Idle);

    let saver = m.clone();
    let task = tokio::spawn(async move { saver.save(Some(fields(json!({"title": "X"}))), None).await });

    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), SaveStatus::Saving);
    task.await.unwrap().unwrap();
    assert_eq!(m.status(), SaveStatus::Success);
}

#[tokio::test]
async fn clear_returns_to_idle_and_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store.clone(), "assets");

    m.clear();
    assert_eq!(m.status(), SaveStatus::Idle);

    m.save(Some(fields(json!({"title": "X"}))), None).await.unwrap();
    m.clear();
    assert_eq!(m.status(), SaveStatus::Idle);
    m.clear();
    assert_eq!(m.status(), SaveStatus::Idle);

    store.fail_next(StoreError::Transport("down".into()));
    let _ = m.save(Some(fields(json!({"title": "Y"}))), None).await;
    assert!(m.last_error().is_some());
    m.clear();
    assert_eq!(m.last_error(), None);
    assert_eq!(m.status(), SaveStatus::Idle);
}

#[tokio::test]
async fn concurrent_saves_each_reach_the_store() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(10)));
    let m = Mutation::new(store.clone(), "comments");

    let (a, b) = tokio::join!(
        m.save(Some(fields(json!({"comment": "first"}))), None),
        m.save(Some(fields(json!({"comment": "second"}))), None),
    );

    assert_ne!(a.unwrap()[0].id, b.unwrap()[0].id);
    assert_eq!(store.call_count(), 2);
    assert_eq!(store.rows("comments").await.len(), 2);
    assert!(m.is_success());
}

// ── Dismiss timer ────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn dismiss_timer_clears_success_after_delay() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store, "assets");
    let _timer = m.dismiss_after(Duration::from_secs(3));

    m.save(Some(fields(json!({"title": "X"}))), None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(m.is_success());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(m.status(), SaveStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn dismiss_timer_leaves_errors_alone() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(StoreError::Transport("down".into()));
    let m = Mutation::new(store, "assets");
    let _timer = m.dismiss_after(Duration::from_secs(1));

    let _ = m.save(Some(fields(json!({"title": "X"}))), None).await;
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(m.last_error().is_some());
}

#[tokio::test(start_paused = true)]
async fn dropped_dismiss_timer_does_nothing() {
    let store = Arc::new(MemoryStore::new());
    let m = Mutation::new(store, "assets");
    let timer = m.dismiss_after(Duration::from_secs(1));
    timer.cancel();

    m.save(Some(fields(json!({"title": "X"}))), None).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(m.is_success());
}
