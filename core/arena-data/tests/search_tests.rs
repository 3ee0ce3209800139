mod common;

use arena_data::{DEFAULT_DEBOUNCE, FetchState, Search, SearchingFlag};
use arena_store::{MemoryStore, StoreError};
use arena_types::Filter;
use common::asset_store;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

fn titles(state: &FetchState<Vec<arena_types::Record>>) -> Vec<String> {
    let mut titles: Vec<String> = state
        .data
        .iter()
        .flatten()
        .filter_map(|r| r.get_str("/title").map(str::to_owned))
        .collect();
    titles.sort();
    titles
}

// ── Debounce ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn keystrokes_within_window_issue_one_query() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());
    assert_eq!(search.debounce(), DEFAULT_DEBOUNCE);
    let mut rx = search.subscribe();

    for term in ["f", "fo", "fox"] {
        search.set_term(term);
        sleep(Duration::from_millis(100)).await;
    }
    assert!(search.state().is_loading);
    assert_eq!(store.call_count(), 0);

    let state = rx.wait_for(|s| !s.is_loading).await.unwrap().clone();
    assert_eq!(titles(&state), vec!["Arctic Fox", "Fox Tail"]);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn query_waits_for_quiet_period() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new())
        .with_debounce(Duration::from_millis(300));

    search.set_term("fox");
    sleep(Duration::from_millis(250)).await;
    assert_eq!(store.call_count(), 0);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(store.call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn issued_query_is_not_cancelled_by_next_keystroke() {
    let store = Arc::new(asset_store().with_latency(Duration::from_millis(300)));
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    search.set_term("fox");
    sleep(Duration::from_millis(600)).await;
    search.set_term("arctic");
    sleep(Duration::from_secs(2)).await;

    assert_eq!(store.call_count(), 2);
    assert_eq!(titles(&search.state()), vec!["Arctic Fox"]);
}

#[tokio::test(start_paused = true)]
async fn clearing_term_discards_in_flight_response() {
    let store = Arc::new(asset_store().with_latency(Duration::from_millis(200)));
    let flag = SearchingFlag::new();
    let search = Search::new(store.clone(), "assets", ["title"], flag.clone());

    search.set_term("fox");
    sleep(Duration::from_millis(550)).await;
    assert!(flag.is_searching());

    search.set_term("");
    assert_eq!(search.state(), FetchState::idle());

    sleep(Duration::from_secs(1)).await;
    assert_eq!(store.call_count(), 1);
    assert!(!flag.is_searching());
    assert_eq!(search.state(), FetchState::idle());
}

#[tokio::test(start_paused = true)]
async fn cancel_ignores_in_flight_response() {
    let store = Arc::new(asset_store().with_latency(Duration::from_millis(200)));
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    search.set_term("fox");
    sleep(Duration::from_millis(550)).await;
    search.cancel();
    assert!(!search.state().is_loading);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(store.call_count(), 1);
    assert_eq!(search.state().data, None);
}

#[tokio::test(start_paused = true)]
async fn new_keystroke_clears_previous_error() {
    let store = Arc::new(asset_store());
    store.fail_next(StoreError::Transport("down".into()));
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    assert!(search.search_now("fox").await.is_error());

    search.set_term("arctic");
    let state = search.state();
    assert!(state.is_loading);
    assert_eq!(state.error_code, None);

    let mut rx = search.subscribe();
    let state = rx.wait_for(|s| !s.is_loading).await.unwrap().clone();
    assert_eq!(titles(&state), vec!["Arctic Fox"]);
}

#[tokio::test(start_paused = true)]
async fn blank_term_clears_without_query() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    search.set_term("fox");
    search.set_term("   ");
    assert_eq!(search.state(), FetchState::idle());

    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.call_count(), 0);
    assert_eq!(search.state(), FetchState::idle());
}

#[tokio::test(start_paused = true)]
async fn dropping_search_cancels_pending_timer() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    search.set_term("fox");
    drop(search);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_drops_pending_timer() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    search.set_term("fox");
    search.cancel();
    sleep(Duration::from_secs(2)).await;
    assert_eq!(store.call_count(), 0);
}

// ── Searching flag ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn flag_is_set_only_while_query_in_flight() {
    let store = Arc::new(asset_store().with_latency(Duration::from_millis(200)));
    let flag = SearchingFlag::new();
    let search = Search::new(store, "assets", ["title"], flag.clone());

    search.set_term("fox");
    sleep(Duration::from_millis(100)).await;
    assert!(!flag.is_searching());

    sleep(Duration::from_millis(500)).await;
    assert!(flag.is_searching());

    sleep(Duration::from_millis(500)).await;
    assert!(!flag.is_searching());
    assert!(!search.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn flag_is_shared_across_searches() {
    let store = Arc::new(asset_store().with_latency(Duration::from_millis(200)));
    let flag = SearchingFlag::new();
    let assets = Search::new(store.clone(), "assets", ["title"], flag.clone());
    let others = Search::new(store.clone(), "assets", ["description"], flag.clone());
    let mut rx = flag.subscribe();

    assets.set_term("fox");
    others.set_term("quest");
    rx.wait_for(|searching| *searching).await.unwrap();
    rx.wait_for(|searching| !*searching).await.unwrap();

    assert_eq!(store.call_count(), 2);
    assert!(!assets.state().is_loading);
    assert!(!others.state().is_loading);
}

// ── Immediate search ─────────────────────────────────────────────

#[tokio::test]
async fn fields_are_anded() {
    let store = Arc::new(asset_store());
    let search = Search::new(store, "assets", ["title", "description"], SearchingFlag::new());

    let query = search.query_for("a");
    assert_eq!(
        query.filters,
        vec![Filter::ilike("title", "a"), Filter::ilike("description", "a")]
    );

    let state = search.search_now("a").await;
    assert_eq!(titles(&state), vec!["Arctic Fox", "Canine Base"]);
}

#[tokio::test]
async fn search_is_case_insensitive() {
    let store = Arc::new(asset_store());
    let search = Search::new(store, "assets", ["description"], SearchingFlag::new());

    let state = search.search_now("QUEST").await;
    assert_eq!(titles(&state), vec!["Arctic Fox", "Canine Base"]);
}

#[tokio::test]
async fn limit_applies_to_results() {
    let store = Arc::new(asset_store());
    let search = Search::new(store, "assets", ["title"], SearchingFlag::new()).with_limit(1);

    let state = search.search_now("fox").await;
    assert_eq!(state.data.unwrap().len(), 1);
}

#[tokio::test]
async fn search_now_blank_term_is_idle() {
    let store = Arc::new(asset_store());
    let search = Search::new(store.clone(), "assets", ["title"], SearchingFlag::new());

    assert_eq!(search.search_now(" ").await, FetchState::idle());
    assert_eq!(store.call_count(), 0);
}

#[tokio::test]
async fn failure_surfaces_error_code() {
    let store = Arc::new(MemoryStore::new());
    store.fail_next(StoreError::from_parts("57014", "canceling statement due to statement timeout", None));
    let flag = SearchingFlag::new();
    let search = Search::new(store, "profiles", ["username"], flag.clone());

    let state = search.search_now("sam").await;
    assert_eq!(state.error_code.as_deref(), Some("57014"));
    assert_eq!(state.data, None);
    assert!(!flag.is_searching());
}
