//! Paginator behaviour against an in-memory backend with controlled latency

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use taskora_core::test_support::MemoryBackend;
use taskora_core::types::row;
use taskora_core::{
    BackendError, FilterDescriptor, LoadState, PageOutcome, Paginator, QueryCache,
    QueryExecutor, QueryOptions,
};

fn backend(rows: usize) -> MemoryBackend {
    let briefs = (1..=rows)
        .map(|i| {
            row(json!({
                "id": format!("b{i:02}"),
                "category": if i % 2 == 0 { "design" } else { "writing" },
                "created_at": format!("2024-02-{i:02}"),
            }))
        })
        .collect();
    MemoryBackend::new().with_table("briefs", briefs)
}

fn paginator(backend: &MemoryBackend, base: QueryOptions, page_size: usize) -> Paginator {
    let executor = QueryExecutor::new(
        Arc::new(backend.clone()),
        Arc::new(QueryCache::default()),
    );
    Paginator::new(Arc::new(executor), "briefs", base, page_size)
}

fn ids(pager: &Paginator) -> Vec<String> {
    pager
        .snapshot()
        .rows
        .iter()
        .map(|r| r["id"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn slow_earlier_page_loses_to_later_request() {
    let backend = backend(25);
    backend.set_latency(|request| {
        if request.range.offset == 10 {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(50)
        }
    });
    let pager = paginator(&backend, QueryOptions::default().use_cache(false), 10);

    let slow = {
        let pager = pager.clone();
        tokio::spawn(async move { pager.go_to_page(2).await })
    };
    tokio::task::yield_now().await;
    let fast = pager.go_to_page(1).await;

    assert_eq!(fast, PageOutcome::Applied);
    assert_eq!(slow.await.unwrap(), PageOutcome::Superseded);

    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.state, LoadState::Loaded);
    assert_eq!(ids(&pager).first().map(String::as_str), Some("b25"));
    assert_eq!(ids(&pager).len(), 10);
}

#[tokio::test(start_paused = true)]
async fn fast_earlier_page_is_still_superseded() {
    let backend = backend(25);
    backend.set_latency(|request| {
        if request.range.offset == 10 {
            Duration::from_millis(50)
        } else {
            Duration::from_millis(500)
        }
    });
    let pager = paginator(&backend, QueryOptions::default().use_cache(false), 10);

    let first = {
        let pager = pager.clone();
        tokio::spawn(async move { pager.go_to_page(2).await })
    };
    tokio::task::yield_now().await;
    let second = pager.go_to_page(1).await;

    assert_eq!(first.await.unwrap(), PageOutcome::Superseded);
    assert_eq!(second, PageOutcome::Applied);
    assert_eq!(pager.snapshot().page, 1);
    assert_eq!(ids(&pager).first().map(String::as_str), Some("b25"));
}

#[tokio::test]
async fn load_more_appends_until_exhausted() {
    let backend = backend(25);
    let pager = paginator(&backend, QueryOptions::default(), 10);

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    assert_eq!(pager.snapshot().rows.len(), 10);
    assert_eq!(pager.snapshot().page, 1);

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    assert_eq!(pager.load_more().await, PageOutcome::Applied);

    let snapshot = pager.snapshot();
    assert_eq!(snapshot.rows.len(), 25);
    assert_eq!(snapshot.page, 3);
    assert!(!snapshot.has_more, "short page ends the scroll");

    let selects = backend.stats().selects;
    assert_eq!(pager.load_more().await, PageOutcome::Skipped);
    assert_eq!(backend.stats().selects, selects, "no fetch when exhausted");
}

#[tokio::test(start_paused = true)]
async fn load_more_is_skipped_while_in_flight() {
    let backend = backend(25);
    backend.set_latency(|_| Duration::from_millis(100));
    let pager = paginator(&backend, QueryOptions::default(), 10);

    let pending = {
        let pager = pager.clone();
        tokio::spawn(async move { pager.load_more().await })
    };
    tokio::task::yield_now().await;
    assert!(pager.is_loading());
    assert_eq!(pager.snapshot().state, LoadState::Loading);
    assert_eq!(pager.load_more().await, PageOutcome::Skipped);

    assert_eq!(pending.await.unwrap(), PageOutcome::Applied);
    assert_eq!(backend.stats().selects, 1);
}

#[tokio::test]
async fn errors_keep_accumulated_rows() {
    let backend = backend(25);
    let pager = paginator(&backend, QueryOptions::default(), 10);
    pager.load_more().await;

    backend.fail_next(BackendError::network("connection reset"));
    let outcome = pager.load_more().await;

    assert!(matches!(outcome, PageOutcome::Failed(ref m) if m.contains("connection reset")));
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.rows.len(), 10);
    assert_eq!(snapshot.page, 1, "page not advanced on failure");
    assert!(matches!(snapshot.state, LoadState::Errored(_)));

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    assert_eq!(pager.snapshot().rows.len(), 20);
    assert_eq!(pager.snapshot().page, 2);
}

#[tokio::test]
async fn first_page_failure_is_retried_not_skipped() {
    let backend = backend(25);
    let pager = paginator(&backend, QueryOptions::default(), 10);

    backend.fail_next(BackendError::network("connection reset"));
    assert!(matches!(pager.load_more().await, PageOutcome::Failed(_)));
    assert!(pager.snapshot().rows.is_empty());

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(ids(&pager).first().map(String::as_str), Some("b25"));
    assert_eq!(ids(&pager).last().map(String::as_str), Some("b16"));
}

#[tokio::test]
async fn failed_go_to_page_can_be_retried() {
    let backend = backend(45);
    let pager = paginator(&backend, QueryOptions::default(), 10);
    assert_eq!(pager.load().await, PageOutcome::Applied);

    backend.fail_next(BackendError::network("connection reset"));
    assert!(matches!(pager.go_to_page(3).await, PageOutcome::Failed(_)));
    assert_eq!(ids(&pager).first().map(String::as_str), Some("b45"), "old rows kept");

    assert_eq!(pager.go_to_page(3).await, PageOutcome::Applied);
    assert_eq!(ids(&pager).first().map(String::as_str), Some("b25"));

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 4);
    assert_eq!(ids(&pager).len(), 20);
    assert_eq!(ids(&pager)[10], "b15");
}

#[tokio::test]
async fn load_more_after_failed_jump_continues_from_loaded_rows() {
    let backend = backend(45);
    let pager = paginator(&backend, QueryOptions::default(), 10);
    assert_eq!(pager.load().await, PageOutcome::Applied);

    backend.fail_next(BackendError::network("connection reset"));
    assert!(matches!(pager.go_to_page(3).await, PageOutcome::Failed(_)));

    assert_eq!(pager.load_more().await, PageOutcome::Applied);
    let ids = ids(&pager);
    assert_eq!(ids.len(), 20);
    assert_eq!(ids[10], "b35", "page 2 follows page 1");
    assert_eq!(pager.snapshot().page, 2);
}

#[tokio::test]
async fn refresh_restarts_from_first_page() {
    let backend = backend(25);
    let pager = paginator(&backend, QueryOptions::default().use_cache(false), 10);
    pager.load_more().await;
    pager.load_more().await;

    assert_eq!(pager.refresh().await, PageOutcome::Applied);
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.rows.len(), 10);
    assert!(snapshot.has_more);
}

#[tokio::test]
async fn set_filters_resets_to_first_page() {
    let backend = backend(25);
    let pager = paginator(&backend, QueryOptions::default(), 5);
    pager.go_to_page(3).await;

    pager
        .set_filters(FilterDescriptor::new().eq("category", "design"))
        .await;

    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(snapshot.rows.len(), 5);
    assert!(snapshot.rows.iter().all(|r| r["category"] == json!("design")));
}

#[tokio::test]
async fn set_table_resets_to_first_page() {
    let backend = backend(3).with_table("users", vec![row(json!({ "id": "u1" }))]);
    let pager = paginator(&backend, QueryOptions::default(), 2);
    pager.go_to_page(2).await;

    pager.set_table("users").await;

    let snapshot = pager.snapshot();
    assert_eq!(snapshot.page, 1);
    assert_eq!(ids(&pager), vec!["u1"]);
    assert!(!snapshot.has_more);
}

#[tokio::test]
async fn exact_count_drives_has_more() {
    let backend = backend(20);
    let pager = paginator(&backend, QueryOptions::default().want_count(true), 10);

    pager.load_more().await;
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.total, Some(20));
    assert!(snapshot.has_more);

    pager.load_more().await;
    let snapshot = pager.snapshot();
    assert_eq!(snapshot.rows.len(), 20);
    assert!(!snapshot.has_more, "full last page with known total ends the scroll");
}

#[tokio::test(start_paused = true)]
async fn cancel_discards_in_flight_page() {
    let backend = backend(25);
    backend.set_latency(|_| Duration::from_millis(200));
    let pager = paginator(&backend, QueryOptions::default(), 10);

    let pending = {
        let pager = pager.clone();
        tokio::spawn(async move { pager.go_to_page(2).await })
    };
    tokio::task::yield_now().await;
    pager.cancel();

    assert_eq!(pending.await.unwrap(), PageOutcome::Superseded);
    assert!(pager.snapshot().rows.is_empty());
    assert!(!pager.is_loading());
}
