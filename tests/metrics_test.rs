//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter. Only synchronous
//! paths are measured: fetch counters are recorded when a fetch is issued,
//! entry counters when the mapping changes.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use muninn::telemetry;
use muninn::{
    Book, BookCache, BookId, CacheConfig, CreateBook, MuninnError, Observable, RefreshPolicy,
    ResourceTransport, Result,
};

// ============================================================================
// Mock transport
// ============================================================================

struct EmptyShelf;

#[async_trait]
impl ResourceTransport<Book> for EmptyShelf {
    fn name(&self) -> &str {
        "empty"
    }

    async fn list(&self) -> Result<Vec<Book>> {
        Ok(Vec::new())
    }

    async fn get(&self, id: &BookId) -> Result<Book> {
        Err(MuninnError::NotFound(id.to_string()))
    }

    async fn create(&self, input: &CreateBook) -> Result<Book> {
        Ok(Book {
            id: BookId::new(uuid::Uuid::new_v4()),
            title: input.name.clone(),
            amount: input.amount,
        })
    }

    async fn update(&self, id: &BookId, _input: &CreateBook) -> Result<Book> {
        Err(MuninnError::NotFound(id.to_string()))
    }

    async fn delete(&self, _id: &BookId) -> Result<()> {
        Ok(())
    }
}

fn shelf() -> BookCache {
    BookCache::new(Arc::new(EmptyShelf), CacheConfig::default()).unwrap()
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    counter_with(snapshot, name, |_| true)
}

/// Sum counter values for `name` whose `label` equals `value`.
fn counter_labelled(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    counter_with(snapshot, name, |key| {
        key.key()
            .labels()
            .any(|l| l.key() == label && l.value() == value)
    })
}

fn counter_with(
    snapshot: &SnapshotVec,
    name: &str,
    keep: impl Fn(&metrics_util::CompositeKey) -> bool,
) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter && key.key().name() == name && keep(key)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Run `f` with a local recorder on the current worker and return the snapshot.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
fn recorded<F>(f: F) -> SnapshotVec
where
    F: FnOnce(),
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, move || {
        tokio::task::block_in_place(move || {
            tokio::runtime::Handle::current().block_on(async move { f() })
        })
    });

    snapshotter.snapshot().into_vec()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn entry_creation_and_reuse_recorded() {
    let cache = shelf();

    let snapshot = recorded(|| {
        let _first = cache.collection();
        let _again = cache.collection();
        let _again = cache.collection();
    });

    assert_eq!(counter_total(&snapshot, telemetry::ENTRIES_CREATED_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::ENTRIES_REUSED_TOTAL), 2);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::ENTRIES_CREATED_TOTAL, "kind", "book"),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn initial_and_manual_fetches_labelled_by_origin() {
    let cache = shelf();

    let snapshot = recorded(|| {
        let all = cache.collection();
        all.update();
        all.update();
    });

    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 3);
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "origin", "initial"),
        1
    );
    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "origin", "manual"),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn eviction_recorded_once() {
    let cache = shelf();

    let snapshot = recorded(|| {
        let all = cache.collection();
        let sub = all.subscribe(|_| {});
        sub.unsubscribe();
        sub.unsubscribe();
    });

    assert_eq!(counter_total(&snapshot, telemetry::ENTRIES_EVICTED_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn mutations_do_not_touch_entry_counters() {
    let cache = shelf();

    let snapshot = recorded(|| {
        let created = cache.create(CreateBook::new("X", 3));
        created.update();
    });

    assert_eq!(counter_total(&snapshot, telemetry::ENTRIES_CREATED_TOTAL), 0);
    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn standalone_observable_uses_its_own_kind() {
    let snapshot = recorded(|| {
        let _clock = Observable::new(|| async { Ok(1u8) }, RefreshPolicy::Once);
    });

    assert_eq!(
        counter_labelled(&snapshot, telemetry::FETCHES_TOTAL, "kind", "book"),
        0
    );
    assert_eq!(counter_total(&snapshot, telemetry::FETCHES_TOTAL), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let cache = shelf();
    let all = cache.collection();
    all.update();
    assert!(all.current().await.unwrap().is_empty());
}
