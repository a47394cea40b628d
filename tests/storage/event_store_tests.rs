//! EventStore interface tests.
//!
//! These tests verify the contract of the EventStore trait.
//! Each storage implementation should run these tests.
//!
//! Every test clears the store first. The main suite uses whole-second
//! instants so the same assertions hold for backends that truncate to the
//! second; backends that keep full instants also run the sub-second suite.

use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use eventline::model::{truncate_to_seconds, Event, EventId, EventPatch, Order, RangeQuery};
use eventline::storage::{EventStore, StorageError};

/// Current time at whole-second precision.
pub fn now() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

pub async fn reset<S: EventStore>(store: &S) {
    store.clear().await.expect("clear should succeed");
}

/// Create one event.
pub async fn put<S: EventStore>(store: &S, at: DateTime<Utc>, data: &str) -> Event {
    store
        .create(at.into(), data.to_string())
        .await
        .expect("create should succeed")
}

/// Run a range query without a limit and return the events.
pub async fn scan<S: EventStore>(store: &S, query: RangeQuery) -> Vec<Event> {
    store
        .range(query)
        .await
        .expect("range should succeed")
        .into_events()
}

pub fn data_of(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.data.as_str()).collect()
}

pub fn ids_of(events: &[Event]) -> Vec<EventId> {
    events.iter().map(|e| e.id.clone()).collect()
}

/// Expected scan order, computed independently of the store.
pub fn expected_ids(events: &[Event], order: Order) -> Vec<EventId> {
    let mut sorted = events.to_vec();
    match order {
        Order::Asc => sorted.sort_by(|a, b| (a.at, &a.id).cmp(&(b.at, &b.id))),
        Order::Desc => sorted.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| a.id.cmp(&b.id))),
    }
    ids_of(&sorted)
}

/// Follow cursors to the end. Returns the concatenated ids and page count.
pub async fn walk_pages<S: EventStore>(
    store: &S,
    query: RangeQuery,
    limit: usize,
) -> (Vec<EventId>, usize) {
    let mut ids = Vec::new();
    let mut cursor = None;
    let mut pages = 0;

    loop {
        let page = store
            .range(query.clone().limit(limit).cursor(cursor))
            .await
            .expect("range should succeed")
            .into_page()
            .expect("limited query should return a page");
        pages += 1;
        assert!(page.events.len() <= limit, "page larger than limit");
        if page.events.len() < limit {
            assert!(page.next_cursor.is_none(), "short page must not carry a cursor");
        }
        ids.extend(ids_of(&page.events));

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
        assert!(pages <= 1000, "pagination did not terminate");
    }

    (ids, pages)
}

// =============================================================================
// EventStore::create / get tests
// =============================================================================

pub async fn test_create_then_get<S: EventStore>(store: &S) {
    reset(store).await;
    let at = now();

    let created = put(store, at, "hello").await;
    assert_eq!(created.at, at);
    assert_eq!(created.data, "hello");

    let fetched = store.get(&created.id).await.expect("get should succeed");
    assert_eq!(fetched, created);
}

pub async fn test_create_assigns_distinct_ids<S: EventStore>(store: &S) {
    reset(store).await;
    let at = now();

    let mut ids = Vec::new();
    for i in 0..10 {
        ids.push(put(store, at, &format!("e{}", i)).await.id);
    }
    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), ids.len(), "identifiers must be unique");
}

pub async fn test_create_normalizes_offset<S: EventStore>(store: &S) {
    reset(store).await;
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let zoned = offset.with_ymd_and_hms(2024, 6, 1, 14, 0, 0).unwrap();

    let event = store
        .create(zoned.into(), "zoned".to_string())
        .await
        .expect("create should succeed");
    assert_eq!(event.at, Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap());
}

pub async fn test_create_reads_naive_as_local<S: EventStore>(store: &S) {
    reset(store).await;
    let naive = NaiveDate::from_ymd_opt(2024, 6, 15)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let expected = Local
        .from_local_datetime(&naive)
        .single()
        .expect("mid-June noon is unambiguous")
        .with_timezone(&Utc);

    let event = store
        .create(naive.into(), "naive".to_string())
        .await
        .expect("create should succeed");
    assert_eq!(event.at, expected);
    assert_eq!(store.get(&event.id).await.unwrap().at, expected);
}

pub async fn test_get_deleted_is_not_found<S: EventStore>(store: &S) {
    reset(store).await;
    let event = put(store, now(), "gone").await;
    store.delete(&event.id).await.expect("delete should succeed");

    let result = store.get(&event.id).await;
    assert!(matches!(result, Err(StorageError::NotFound(ref id)) if *id == event.id));
}

// =============================================================================
// EventStore::update tests
// =============================================================================

pub async fn test_update_data_only<S: EventStore>(store: &S) {
    reset(store).await;
    let at = now();
    let event = put(store, at, "before").await;

    let updated = store
        .update(&event.id, EventPatch::new().data("after"))
        .await
        .expect("update should succeed");
    assert_eq!(updated.id, event.id);
    assert_eq!(updated.at, at, "omitted at must be left unchanged");
    assert_eq!(updated.data, "after");
    assert_eq!(store.get(&event.id).await.unwrap(), updated);
}

pub async fn test_update_at_only<S: EventStore>(store: &S) {
    reset(store).await;
    let at = now();
    let event = put(store, at, "keep").await;

    let later = at + Duration::minutes(5);
    let updated = store
        .update(&event.id, EventPatch::new().at(later))
        .await
        .expect("update should succeed");
    assert_eq!(updated.at, later);
    assert_eq!(updated.data, "keep", "omitted data must be left unchanged");
}

pub async fn test_update_empty_patch_is_noop<S: EventStore>(store: &S) {
    reset(store).await;
    let event = put(store, now(), "same").await;

    let updated = store
        .update(&event.id, EventPatch::new())
        .await
        .expect("empty update should succeed");
    assert_eq!(updated, event);
}

pub async fn test_update_missing_is_not_found<S: EventStore>(store: &S) {
    reset(store).await;
    let event = put(store, now(), "gone").await;
    store.delete(&event.id).await.unwrap();

    let result = store.update(&event.id, EventPatch::new().data("x")).await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
    assert!(scan(store, RangeQuery::new()).await.is_empty());
}

pub async fn test_update_relocates<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    let a = put(store, t, "a").await;
    put(store, t + Duration::seconds(10), "b").await;
    put(store, t + Duration::seconds(20), "c").await;

    store
        .update(&a.id, EventPatch::new().at(t + Duration::seconds(30)))
        .await
        .expect("update should succeed");

    let asc = scan(store, RangeQuery::new()).await;
    assert_eq!(data_of(&asc), vec!["b", "c", "a"]);

    let desc = scan(store, RangeQuery::new().desc()).await;
    assert_eq!(data_of(&desc), vec!["a", "c", "b"]);

    // Not visible at the old position.
    let old = scan(store, RangeQuery::new().start(t).end(t)).await;
    assert!(old.is_empty(), "event must leave its old index position");
}

// =============================================================================
// EventStore::delete tests
// =============================================================================

pub async fn test_delete_removes_from_range<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, t, "a").await;
    let b = put(store, t + Duration::seconds(1), "b").await;
    put(store, t + Duration::seconds(2), "c").await;

    store.delete(&b.id).await.expect("delete should succeed");

    assert_eq!(data_of(&scan(store, RangeQuery::new()).await), vec!["a", "c"]);
    assert_eq!(
        data_of(&scan(store, RangeQuery::new().desc()).await),
        vec!["c", "a"]
    );
}

pub async fn test_delete_twice_is_not_found<S: EventStore>(store: &S) {
    reset(store).await;
    let event = put(store, now(), "once").await;

    store.delete(&event.id).await.expect("first delete should succeed");
    let result = store.delete(&event.id).await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
}

// =============================================================================
// EventStore::range ordering tests
// =============================================================================

pub async fn test_total_order<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();

    // Few distinct instants so that ties are common.
    let offsets: Vec<i64> = {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        (0..40).map(|_| rng.random_range(0..6)).collect()
    };

    let mut created = Vec::new();
    for (i, offset) in offsets.iter().enumerate() {
        created.push(put(store, t + Duration::seconds(*offset), &format!("e{}", i)).await);
    }

    let asc = scan(store, RangeQuery::new()).await;
    assert_eq!(ids_of(&asc), expected_ids(&created, Order::Asc));

    let desc = scan(store, RangeQuery::new().desc()).await;
    assert_eq!(ids_of(&desc), expected_ids(&created, Order::Desc));
}

pub async fn test_reverse_for_distinct_instants<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    for i in [3, 1, 4, 0, 2] {
        put(store, t + Duration::seconds(i), &format!("s{}", i)).await;
    }

    let asc = scan(store, RangeQuery::new()).await;
    let mut desc = scan(store, RangeQuery::new().desc()).await;
    desc.reverse();
    assert_eq!(asc, desc);
    assert_eq!(data_of(&asc), vec!["s0", "s1", "s2", "s3", "s4"]);
}

pub async fn test_tie_break_by_id<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    let mut created = Vec::new();
    for name in ["x", "y", "z"] {
        created.push(put(store, t, name).await);
    }
    let mut by_id = ids_of(&created);
    by_id.sort();

    let asc = scan(store, RangeQuery::new()).await;
    assert_eq!(ids_of(&asc), by_id);

    // Same-instant ties stay id-ascending in descending scans too.
    let desc = scan(store, RangeQuery::new().desc()).await;
    assert_eq!(ids_of(&desc), by_id);

    // Deterministic across repeated calls.
    assert_eq!(scan(store, RangeQuery::new().desc()).await, desc);
}

pub async fn test_bounds_are_inclusive<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    for i in 0..5 {
        put(store, t + Duration::seconds(i), &format!("s{}", i)).await;
    }

    let query = RangeQuery::new()
        .start(t + Duration::seconds(1))
        .end(t + Duration::seconds(3));
    assert_eq!(data_of(&scan(store, query.clone()).await), vec!["s1", "s2", "s3"]);
    assert_eq!(data_of(&scan(store, query.desc()).await), vec!["s3", "s2", "s1"]);

    let open_start = RangeQuery::new().end(t + Duration::seconds(1));
    assert_eq!(data_of(&scan(store, open_start).await), vec!["s0", "s1"]);

    let open_end = RangeQuery::new().start(t + Duration::seconds(3)).desc();
    assert_eq!(data_of(&scan(store, open_end).await), vec!["s4", "s3"]);
}

pub async fn test_start_after_end_is_empty<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, t, "a").await;

    for order in [Order::Asc, Order::Desc] {
        let page = store
            .range(
                RangeQuery::new()
                    .start(t + Duration::seconds(1))
                    .end(t - Duration::seconds(1))
                    .limit(5)
                    .order(order),
            )
            .await
            .expect("range should succeed")
            .into_page()
            .unwrap();
        assert!(page.events.is_empty());
        assert!(page.next_cursor.is_none());
    }
}

// =============================================================================
// EventStore::range pagination tests
// =============================================================================

pub async fn test_pagination_coverage<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();

    let offsets: Vec<i64> = {
        let mut rng = StdRng::seed_from_u64(7);
        (0..9).map(|_| rng.random_range(0..4)).collect()
    };
    for (i, offset) in offsets.iter().enumerate() {
        put(store, t + Duration::seconds(*offset), &format!("p{}", i)).await;
    }
    let n = offsets.len();

    for order in [Order::Asc, Order::Desc] {
        let full = ids_of(&scan(store, RangeQuery::new().order(order)).await);
        assert_eq!(full.len(), n);

        for limit in 1..=n + 1 {
            let (ids, pages) = walk_pages(store, RangeQuery::new().order(order), limit).await;
            assert_eq!(ids, full, "order {} limit {}", order, limit);

            // A full final page is followed by one empty page.
            let expected_pages = n / limit + 1;
            assert_eq!(pages, expected_pages, "order {} limit {}", order, limit);
        }
    }
}

pub async fn test_pagination_within_bounds<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    for i in 0..10 {
        put(store, t + Duration::seconds(i / 2), &format!("b{}", i)).await;
    }

    let bounded = RangeQuery::new()
        .start(t + Duration::seconds(1))
        .end(t + Duration::seconds(3));
    for order in [Order::Asc, Order::Desc] {
        let full = ids_of(&scan(store, bounded.clone().order(order)).await);
        assert_eq!(full.len(), 6);
        let (ids, _) = walk_pages(store, bounded.clone().order(order), 4).await;
        assert_eq!(ids, full);
    }
}

pub async fn test_exhaustion_is_idempotent<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, t, "a").await;
    put(store, t + Duration::seconds(1), "b").await;

    for order in [Order::Asc, Order::Desc] {
        let first = store
            .range(RangeQuery::new().limit(2).order(order))
            .await
            .unwrap()
            .into_page()
            .unwrap();
        let cursor = first.next_cursor.expect("full page carries a cursor");

        for _ in 0..2 {
            let after = store
                .range(RangeQuery::new().limit(2).order(order).cursor(Some(cursor.clone())))
                .await
                .expect("exhausted cursor is not an error")
                .into_page()
                .unwrap();
            assert!(after.events.is_empty());
            assert!(after.next_cursor.is_none());
        }
    }
}

pub async fn test_invalid_cursor_is_rejected<S: EventStore>(store: &S) {
    reset(store).await;
    put(store, now(), "a").await;

    for token in ["not a cursor", "", "bWFsZm9ybWVk"] {
        let result = store
            .range(RangeQuery::new().limit(1).cursor(Some(token.to_string())))
            .await;
        assert!(
            matches!(result, Err(StorageError::InvalidCursor(_))),
            "token {:?} should be rejected",
            token
        );
    }
}

pub async fn test_zero_limit_is_rejected<S: EventStore>(store: &S) {
    reset(store).await;
    let result = store.range(RangeQuery::new().limit(0)).await;
    assert!(matches!(result, Err(StorageError::Validation(_))));
}

pub async fn test_new_event_after_cursor_is_seen<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, t, "a").await;
    put(store, t + Duration::seconds(1), "b").await;

    let first = store
        .range(RangeQuery::new().limit(2))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    let cursor = first.next_cursor.unwrap();

    put(store, t + Duration::seconds(2), "c").await;

    let next = store
        .range(RangeQuery::new().limit(2).cursor(Some(cursor)))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&next.events), vec!["c"]);
    assert!(next.next_cursor.is_none());
}

// =============================================================================
// Concrete timeline scenario
// =============================================================================

async fn five_events<S: EventStore>(store: &S) -> [DateTime<Utc>; 5] {
    reset(store).await;
    let now = now();
    let instants = [
        now - Duration::days(10),
        now - Duration::minutes(10),
        now,
        now + Duration::minutes(10),
        now + Duration::days(10),
    ];
    for (at, name) in instants
        .iter()
        .zip(["past_far", "past", "now", "future", "future_far"])
    {
        put(store, *at, name).await;
    }
    instants
}

pub async fn test_scenario_descending<S: EventStore>(store: &S) {
    let [past_far, past, _, future, _] = five_events(store).await;
    let window = RangeQuery::new().start(past).end(future).desc();

    let page = store
        .range(window.clone().limit(2))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["future", "now"]);
    let c1 = page.next_cursor.expect("C1");

    let page = store
        .range(window.clone().limit(1).cursor(Some(c1)))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["past"]);
    let c2 = page.next_cursor.expect("C2");

    let page = store
        .range(window.clone().limit(2).cursor(Some(c2.clone())))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert!(page.events.is_empty());
    assert!(page.next_cursor.is_none());

    // Widening start surfaces the earlier event even with the old cursor.
    let widened = RangeQuery::new().start(past_far).end(future).desc();
    let page = store
        .range(widened.limit(2).cursor(Some(c2)))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["past_far"]);
    assert!(page.next_cursor.is_none());
}

pub async fn test_scenario_ascending<S: EventStore>(store: &S) {
    let [_, past, _, future, future_far] = five_events(store).await;
    let window = RangeQuery::new().start(past).end(future);

    let page = store
        .range(window.clone().limit(2))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["past", "now"]);
    let c1 = page.next_cursor.expect("C1");

    let page = store
        .range(window.clone().limit(1).cursor(Some(c1)))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["future"]);
    let c2 = page.next_cursor.expect("C2");

    let page = store
        .range(window.clone().limit(2).cursor(Some(c2.clone())))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert!(page.events.is_empty());
    assert!(page.next_cursor.is_none());

    let widened = RangeQuery::new().start(past).end(future_far);
    let page = store
        .range(widened.limit(2).cursor(Some(c2)))
        .await
        .unwrap()
        .into_page()
        .unwrap();
    assert_eq!(data_of(&page.events), vec!["future_far"]);
    assert!(page.next_cursor.is_none());
}

// =============================================================================
// Sub-second precision tests
// =============================================================================

fn millis_after(base: DateTime<Utc>, millis: i64) -> DateTime<Utc> {
    base + Duration::milliseconds(millis)
}

pub async fn test_sub_second_bounds_are_exact<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, millis_after(t, 100), "early").await;
    let late = put(store, millis_after(t, 700), "late").await;
    put(store, millis_after(t, 1_000), "next").await;

    let events = scan(store, RangeQuery::new().start(millis_after(t, 500))).await;
    assert_eq!(data_of(&events), vec!["late", "next"]);

    let events = scan(store, RangeQuery::new().end(millis_after(t, 500)).desc()).await;
    assert_eq!(data_of(&events), vec!["early"]);

    let events = scan(store, RangeQuery::new().start(late.at).end(late.at)).await;
    assert_eq!(data_of(&events), vec!["late"]);
}

pub async fn test_sub_second_order_follows_instant<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    put(store, millis_after(t, 900), "created_first").await;
    put(store, millis_after(t, 100), "created_second").await;
    put(store, millis_after(t, 500), "created_third").await;

    let events = scan(store, RangeQuery::new()).await;
    assert_eq!(
        data_of(&events),
        vec!["created_second", "created_third", "created_first"]
    );

    let events = scan(store, RangeQuery::new().desc()).await;
    assert_eq!(
        data_of(&events),
        vec!["created_first", "created_third", "created_second"]
    );
}

pub async fn test_sub_second_pagination<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();

    let mut rng = StdRng::seed_from_u64(11);
    let mut created = Vec::new();
    for i in 0..14 {
        // Coarse steps so some events share an instant.
        let millis = rng.random_range(0..12) * 150;
        created.push(put(store, millis_after(t, millis), &format!("s{}", i)).await);
    }

    let start = millis_after(t, 300);
    let end = millis_after(t, 1_350);
    let inside: Vec<Event> = created
        .iter()
        .filter(|e| e.at >= start && e.at <= end)
        .cloned()
        .collect();

    for order in [Order::Asc, Order::Desc] {
        for limit in [1, 2, 5] {
            let (ids, _) = walk_pages(store, RangeQuery::new().order(order), limit).await;
            assert_eq!(ids, expected_ids(&created, order), "order {} limit {}", order, limit);

            let bounded = RangeQuery::new().start(start).end(end).order(order);
            let (ids, _) = walk_pages(store, bounded, limit).await;
            assert_eq!(ids, expected_ids(&inside, order), "bounded order {} limit {}", order, limit);
        }
    }
}

// =============================================================================
// EventStore::clear tests
// =============================================================================

pub async fn test_clear_empties_store<S: EventStore>(store: &S) {
    reset(store).await;
    let t = now();
    let a = put(store, t, "a").await;
    put(store, t, "b").await;

    store.clear().await.expect("clear should succeed");

    assert!(scan(store, RangeQuery::new()).await.is_empty());
    assert!(matches!(store.get(&a.id).await, Err(StorageError::NotFound(_))));
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all EventStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_event_store_tests {
    ($store:expr) => {
        use $crate::storage::event_store_tests::*;

        // create/get tests
        test_create_then_get($store).await;
        println!("  test_create_then_get: PASSED");

        test_create_assigns_distinct_ids($store).await;
        println!("  test_create_assigns_distinct_ids: PASSED");

        test_create_normalizes_offset($store).await;
        println!("  test_create_normalizes_offset: PASSED");

        test_create_reads_naive_as_local($store).await;
        println!("  test_create_reads_naive_as_local: PASSED");

        test_get_deleted_is_not_found($store).await;
        println!("  test_get_deleted_is_not_found: PASSED");

        // update tests
        test_update_data_only($store).await;
        println!("  test_update_data_only: PASSED");

        test_update_at_only($store).await;
        println!("  test_update_at_only: PASSED");

        test_update_empty_patch_is_noop($store).await;
        println!("  test_update_empty_patch_is_noop: PASSED");

        test_update_missing_is_not_found($store).await;
        println!("  test_update_missing_is_not_found: PASSED");

        test_update_relocates($store).await;
        println!("  test_update_relocates: PASSED");

        // delete tests
        test_delete_removes_from_range($store).await;
        println!("  test_delete_removes_from_range: PASSED");

        test_delete_twice_is_not_found($store).await;
        println!("  test_delete_twice_is_not_found: PASSED");

        // ordering tests
        test_total_order($store).await;
        println!("  test_total_order: PASSED");

        test_reverse_for_distinct_instants($store).await;
        println!("  test_reverse_for_distinct_instants: PASSED");

        test_tie_break_by_id($store).await;
        println!("  test_tie_break_by_id: PASSED");

        test_bounds_are_inclusive($store).await;
        println!("  test_bounds_are_inclusive: PASSED");

        test_start_after_end_is_empty($store).await;
        println!("  test_start_after_end_is_empty: PASSED");

        // pagination tests
        test_pagination_coverage($store).await;
        println!("  test_pagination_coverage: PASSED");

        test_pagination_within_bounds($store).await;
        println!("  test_pagination_within_bounds: PASSED");

        test_exhaustion_is_idempotent($store).await;
        println!("  test_exhaustion_is_idempotent: PASSED");

        test_invalid_cursor_is_rejected($store).await;
        println!("  test_invalid_cursor_is_rejected: PASSED");

        test_zero_limit_is_rejected($store).await;
        println!("  test_zero_limit_is_rejected: PASSED");

        test_new_event_after_cursor_is_seen($store).await;
        println!("  test_new_event_after_cursor_is_seen: PASSED");

        // scenario tests
        test_scenario_descending($store).await;
        println!("  test_scenario_descending: PASSED");

        test_scenario_ascending($store).await;
        println!("  test_scenario_ascending: PASSED");

        // clear tests
        test_clear_empties_store($store).await;
        println!("  test_clear_empties_store: PASSED");
    };
}

/// Run the sub-second precision tests. Only for backends that keep full
/// instants on write.
#[macro_export]
macro_rules! run_exact_instant_tests {
    ($store:expr) => {
        use $crate::storage::event_store_tests::*;

        test_sub_second_bounds_are_exact($store).await;
        println!("  test_sub_second_bounds_are_exact: PASSED");

        test_sub_second_order_follows_instant($store).await;
        println!("  test_sub_second_order_follows_instant: PASSED");

        test_sub_second_pagination($store).await;
        println!("  test_sub_second_pagination: PASSED");
    };
}
