//! End-to-end pagination scenarios against the in-memory executor.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use waypoint_core::value::doc_field;
use waypoint_engine::pager::{FallbackPolicy, Pager, PagerConfig};
use waypoint_engine::{
    FetchError, FilterExpr, HopPolicy, OffsetPolicy, PageRequest, PagerError, SeekDirection,
    StrategyKind, TotalsMode,
};
use waypoint_test_utils::{timeline_docs, timeline_sort, InMemoryCache, InMemoryExecutor};

fn setup(n: usize) -> (Arc<InMemoryExecutor>, Arc<InMemoryCache>, Pager<InMemoryExecutor, InMemoryCache>) {
    let executor = Arc::new(InMemoryExecutor::new());
    executor.load("events", timeline_docs(n));
    let cache = Arc::new(InMemoryCache::new());
    let pager = Pager::with_defaults(executor.clone(), cache.clone());
    (executor, cache, pager)
}

fn request(limit: u64) -> PageRequest {
    PageRequest::new("events", timeline_sort(), limit)
}

fn ids(items: &[waypoint_core::Document]) -> Vec<String> {
    items
        .iter()
        .map(|d| doc_field(d, "_id").as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn sequential_cursor_walk_yields_every_document_once() {
    let (_, _, pager) = setup(253);
    let mut seen = Vec::new();
    let mut page = pager.page(request(20).with_page(1)).await.unwrap();
    loop {
        seen.extend(ids(&page.items));
        if !page.page_info.has_next_page {
            break;
        }
        let cursor = page.page_info.end_cursor.clone().unwrap();
        page = pager.page(request(20).with_after(cursor)).await.unwrap();
    }
    // Timeline docs sorted by (createdAt desc, _id asc) come out in _id order.
    let expected: Vec<String> = (0..253).map(|i| format!("doc-{i:06}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn skip_and_hop_strategies_return_identical_pages() {
    let (_, _, pager) = setup(200);
    let base = request(10).with_page(7).with_hop_policy(HopPolicy {
        step: 3,
        max_hops: 10,
    });

    let via_skip = pager.page(base.clone()).await.unwrap();
    assert_eq!(via_skip.meta.strategy, StrategyKind::Skip);

    let via_hop = pager
        .page(base.with_offset_policy(OffsetPolicy {
            enabled: false,
            max_skip: 0,
        }))
        .await
        .unwrap();
    assert_eq!(via_hop.meta.strategy, StrategyKind::Hop);

    assert_eq!(via_skip.items, via_hop.items);
    assert_eq!(via_skip.page_info, via_hop.page_info);
}

#[tokio::test]
async fn deep_page_worked_example() {
    let (_, _, pager) = setup(10_000);
    let deep = request(20)
        .with_hop_policy(HopPolicy {
            step: 10,
            max_hops: 5,
        })
        .with_offset_policy(OffsetPolicy {
            enabled: false,
            max_skip: 0,
        });

    // Page 37 with no existing bookmarks: bounded hops from the start.
    let page = pager.page(deep.clone().with_page(37)).await.unwrap();
    assert_eq!(page.items.len(), 20);
    assert_eq!(ids(&page.items)[0], "doc-000720");
    assert!(page.page_info.has_previous_page);
    assert!(page.page_info.has_next_page);
    assert_eq!(page.meta.strategy, StrategyKind::Hop);
    assert!(page.meta.hops <= 4, "expected <= 4 hops, got {}", page.meta.hops);

    // Page 501 is beyond the 500 existing pages and beyond the hop
    // budget: the default policy degrades to a literal skip.
    let past_end = pager.page(deep.with_page(501)).await.unwrap();
    assert!(past_end.items.is_empty());
    assert!(!past_end.page_info.has_next_page);
    assert!(past_end.meta.cost_warning);
}

#[tokio::test]
async fn bookmarks_self_heal_and_make_nearby_pages_cheaper() {
    let (executor, cache, pager) = setup(2_000);
    let deep = |page: u64| {
        request(10)
            .with_page(page)
            .with_hop_policy(HopPolicy {
                step: 5,
                max_hops: 100,
            })
            .with_offset_policy(OffsetPolicy {
                enabled: false,
                max_skip: 0,
            })
    };

    // Cold: page 150 walks from the collection start.
    let cold = pager.page(deep(150)).await.unwrap();
    assert_eq!(ids(&cold.items)[0], "doc-001490");
    let cold_fetches = executor.fetch_count();
    assert!(cold_fetches > 10);

    // Warm: the walk left bookmarks behind, so a nearby page is served
    // with at most one hop plus the window fetch.
    executor.reset_counters();
    let warm = pager.page(deep(151)).await.unwrap();
    assert_eq!(ids(&warm.items)[0], "doc-001500");
    assert!(warm.meta.hops <= 1);
    assert!(executor.fetch_count() <= 2);

    // Evicting every bookmark only costs performance: the same page is
    // still correct, and the walk regenerates the bookmarks.
    assert!(cache.evict_prefix("pg:") > 0);
    executor.reset_counters();
    let healed = pager.page(deep(150)).await.unwrap();
    assert_eq!(healed.items, cold.items);
    assert!(executor.fetch_count() > 10);
    assert!(cache.keys().iter().any(|k| k.starts_with("pg:")));
}

#[tokio::test]
async fn astronomical_page_numbers_degrade_to_an_empty_page() {
    let (_, _, pager) = setup(100);
    // (u64::MAX - 1) * 20 overflows u64; the request must neither panic
    // nor serve a wrapped-around shallow page.
    let page = pager.page(request(20).with_page(u64::MAX)).await.unwrap();
    assert!(page.items.is_empty());
    assert!(!page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);
    assert!(page.meta.cost_warning);
}

#[tokio::test]
async fn reject_policy_surfaces_page_unreachable() {
    let (executor, cache, _) = setup(10_000);
    let pager = Pager::new(
        executor,
        cache,
        PagerConfig::new().with_fallback(FallbackPolicy::Reject),
    );
    let result = pager
        .page(
            request(20)
                .with_page(501)
                .with_hop_policy(HopPolicy {
                    step: 10,
                    max_hops: 5,
                })
                .with_offset_policy(OffsetPolicy {
                    enabled: false,
                    max_skip: 0,
                }),
        )
        .await;
    assert!(matches!(
        result,
        Err(PagerError::Fetch(FetchError::PageUnreachable { page: 501, .. }))
    ));
}

#[tokio::test]
async fn hop_walk_past_end_of_collection_returns_empty_page() {
    let (_, _, pager) = setup(100);
    let page = pager
        .page(
            request(10)
                .with_page(15)
                .with_hop_policy(HopPolicy {
                    step: 2,
                    max_hops: 20,
                })
                .with_offset_policy(OffsetPolicy {
                    enabled: false,
                    max_skip: 0,
                }),
        )
        .await
        .unwrap();
    assert!(page.items.is_empty());
    assert!(!page.page_info.has_next_page);
    assert!(page.page_info.has_previous_page);
}

#[tokio::test]
async fn backward_cursor_returns_previous_page_in_sort_order() {
    let (_, _, pager) = setup(100);
    let page3 = pager.page(request(10).with_page(3)).await.unwrap();
    let start = page3.page_info.start_cursor.clone().unwrap();

    let page2 = pager
        .page(
            request(10)
                .with_after(start)
                .with_direction(SeekDirection::Backward),
        )
        .await
        .unwrap();
    let expected: Vec<String> = (10..20).map(|i| format!("doc-{i:06}")).collect();
    assert_eq!(ids(&page2.items), expected);
    assert!(page2.page_info.has_previous_page);
    assert!(page2.page_info.has_next_page);
}

#[tokio::test]
async fn filtered_pagination_respects_base_filter_across_hops() {
    let (_, _, pager) = setup(700);
    let filtered = request(10)
        .with_filter(FilterExpr::eq("bucket", json!(3)))
        .with_page(4)
        .with_hop_policy(HopPolicy {
            step: 2,
            max_hops: 10,
        })
        .with_offset_policy(OffsetPolicy {
            enabled: false,
            max_skip: 0,
        });
    let page = pager.page(filtered).await.unwrap();
    // 100 docs carry bucket == 3; page 4 of 10 is the 31st..40th.
    assert_eq!(page.items.len(), 10);
    for d in &page.items {
        assert_eq!(doc_field(d, "bucket"), &json!(3));
    }
    assert_eq!(ids(&page.items)[0], "doc-000213");
}

#[tokio::test]
async fn identical_requests_are_idempotent() {
    let (_, _, pager) = setup(300);
    let req = request(20).with_page(9).with_totals(TotalsMode::Sync);
    let first = pager.page(req.clone()).await.unwrap();
    let second = pager.page(req).await.unwrap();
    assert_eq!(first.items, second.items);
    assert_eq!(first.page_info, second.page_info);
    assert_eq!(first.totals.value, second.totals.value);
}

#[tokio::test]
async fn cached_envelope_replays_without_hitting_the_store() {
    let (executor, _, pager) = setup(300);
    let req = request(20).with_page(2).with_cache_ttl_ms(60_000);
    let first = pager.page(req.clone()).await.unwrap();
    let fetches = executor.fetch_count();

    let replay = pager.page(req).await.unwrap();
    assert_eq!(first, replay);
    assert_eq!(executor.fetch_count(), fetches);
}

#[tokio::test]
async fn totals_mode_is_part_of_the_result_cache_identity() {
    let (executor, _, pager) = setup(300);
    let plain = request(20).with_page(2).with_cache_ttl_ms(60_000);
    pager.page(plain.clone()).await.unwrap();
    assert_eq!(executor.count_count(), 0);

    // Same page, but asking for totals: the cached no-totals envelope
    // must not be replayed in place of the blocking count.
    let counted = pager
        .page(plain.with_totals(TotalsMode::Sync))
        .await
        .unwrap();
    assert_eq!(executor.count_count(), 1);
    assert_eq!(counted.totals.value, Some(300));
}

#[tokio::test]
async fn sync_totals_counts_exactly() {
    let (_, _, pager) = setup(300);
    let page = pager
        .page(request(20).with_page(1).with_totals(TotalsMode::Sync))
        .await
        .unwrap();
    assert_eq!(page.totals.value, Some(300));
    assert!(!page.totals.pending);
    assert!(page.totals.computed_at.is_some());
}

#[tokio::test]
async fn async_totals_patch_the_cached_envelope() {
    let (executor, _, pager) = setup(300);
    let req = request(20)
        .with_page(1)
        .with_totals(TotalsMode::Async)
        .with_cache_ttl_ms(60_000);

    let first = pager.page(req.clone()).await.unwrap();
    assert_eq!(first.totals.value, None);
    assert!(first.totals.pending);

    // Let the detached count land.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(executor.count_count(), 1);

    let replayed = pager.page(req).await.unwrap();
    assert_eq!(replayed.totals.value, Some(300));
    assert!(!replayed.totals.pending);
}

#[tokio::test]
async fn timeout_surfaces_with_strategy_context() {
    let (executor, _, pager) = setup(50);
    executor.set_latency_ms(Some(100));

    let fetch = pager
        .page(request(10).with_page(1).with_max_time_ms(1))
        .await;
    match fetch {
        Err(PagerError::Fetch(FetchError::FetchTimeout {
            max_time_ms,
            strategy,
            ..
        })) => {
            assert_eq!(max_time_ms, 1);
            assert_eq!(strategy, Some(StrategyKind::Skip));
        }
        other => panic!("expected FetchTimeout, got {other:?}"),
    }

    let count = pager
        .page(
            request(10)
                .with_page(1)
                .with_totals(TotalsMode::Sync)
                .with_max_time_ms(1),
        )
        .await;
    assert!(matches!(
        count,
        Err(PagerError::Fetch(FetchError::FetchTimeout { .. }))
            | Err(PagerError::Fetch(FetchError::CountTimeout { .. }))
    ));
}

#[tokio::test]
async fn mid_walk_timeout_reports_hops_attempted() {
    let (executor, _, pager) = setup(2_000);
    // The first two fetches (hops) succeed; the third blows the budget.
    executor.set_latency_after(2, 100);
    let result = pager
        .page(
            request(10)
                .with_page(100)
                .with_hop_policy(HopPolicy {
                    step: 5,
                    max_hops: 100,
                })
                .with_offset_policy(OffsetPolicy {
                    enabled: false,
                    max_skip: 0,
                })
                .with_max_time_ms(10),
        )
        .await;
    match result {
        Err(PagerError::Fetch(FetchError::FetchTimeout {
            strategy,
            hops_attempted,
            ..
        })) => {
            assert_eq!(strategy, Some(StrategyKind::Hop));
            assert_eq!(hops_attempted, 2);
        }
        other => panic!("expected FetchTimeout, got {other:?}"),
    }
}

#[tokio::test]
async fn count_over_budget_surfaces_count_timeout() {
    let (executor, _, pager) = setup(50);
    executor.set_count_latency_ms(Some(100));
    let result = pager
        .page(
            request(10)
                .with_page(1)
                .with_totals(TotalsMode::Sync)
                .with_max_time_ms(10),
        )
        .await;
    assert!(matches!(
        result,
        Err(PagerError::Fetch(FetchError::CountTimeout { max_time_ms: 10 }))
    ));
}

#[tokio::test]
async fn malformed_cursor_is_rejected() {
    let (_, _, pager) = setup(50);
    let result = pager
        .page(request(10).with_after(waypoint_core::Cursor::from_token("junk")))
        .await;
    assert!(matches!(result, Err(PagerError::Cursor(_))));
}
