//! Key → entry mapping with subscriber-driven eviction.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::observable::{Label, Observable, Teardown};
use crate::telemetry;

type Shared<K, T> = Arc<Mutex<HashMap<K, Observable<T>>>>;

/// Owns the live entries of one cache mapping.
///
/// Lookups create missing entries under the map lock, so concurrent callers
/// for the same key always get the same entry. An entry leaves the map when
/// its teardown callback reports the entry id it was created with; a report
/// that does not match the mapped entry is ignored.
pub(crate) struct EntryMap<K, T> {
    kind: &'static str,
    entries: Shared<K, T>,
}

impl<K, T> EntryMap<K, T>
where
    K: Clone + Eq + Hash + fmt::Display + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the mapped entry for `key`, or build one with `make` and map it.
    pub(crate) fn get_or_create<F>(&self, key: &K, make: F) -> Observable<T>
    where
        F: FnOnce(Label, Teardown) -> Observable<T>,
    {
        let mut entries = lock(&self.entries);
        if let Some(existing) = entries.get(key) {
            metrics::counter!(telemetry::ENTRIES_REUSED_TOTAL, "kind" => self.kind).increment(1);
            debug!(kind = self.kind, %key, entry = existing.entry_id(), "reusing cache entry");
            return existing.clone();
        }

        let label = Label {
            kind: self.kind,
            key: key.to_string(),
        };
        let observable = make(label, self.teardown(key.clone()));
        entries.insert(key.clone(), observable.clone());

        metrics::counter!(telemetry::ENTRIES_CREATED_TOTAL, "kind" => self.kind).increment(1);
        debug!(kind = self.kind, %key, entry = observable.entry_id(), "created cache entry");
        observable
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        lock(&self.entries).contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    fn teardown(&self, key: K) -> Teardown {
        let entries = Arc::downgrade(&self.entries);
        let kind = self.kind;
        Box::new(move |entry_id| {
            let Some(entries) = entries.upgrade() else {
                return;
            };
            let mut guard = lock(&entries);
            let matches = guard
                .get(&key)
                .is_some_and(|mapped| mapped.entry_id() == entry_id);
            if !matches {
                debug!(kind, %key, entry = entry_id, "stale teardown ignored");
                return;
            }
            let removed = guard.remove(&key);
            drop(guard);
            drop(removed);

            metrics::counter!(telemetry::ENTRIES_EVICTED_TOTAL, "kind" => kind).increment(1);
            debug!(kind, %key, entry = entry_id, "evicted cache entry");
        })
    }
}

fn lock<K, T>(entries: &Mutex<HashMap<K, Observable<T>>>) -> MutexGuard<'_, HashMap<K, Observable<T>>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RefreshPolicy;
    use std::time::Duration;

    fn build(label: Label, teardown: Teardown) -> Observable<u8> {
        Observable::build(
            || async { Ok(1u8) },
            RefreshPolicy::Interval(Duration::from_millis(100)),
            label,
            Some(teardown),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn same_key_same_entry() {
        let map: EntryMap<u32, u8> = EntryMap::new("test");
        let a = map.get_or_create(&1, build);
        let b = map.get_or_create(&1, build);
        let c = map.get_or_create(&2, build);

        assert!(a.same_entry(&b));
        assert!(!a.same_entry(&c));
        assert_eq!(map.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn last_unsubscribe_evicts() {
        let map: EntryMap<u32, u8> = EntryMap::new("test");
        let first = map.get_or_create(&1, build);
        let sub = first.subscribe(|_| {});
        assert!(map.contains(&1));

        sub.unsubscribe();
        assert!(!map.contains(&1));

        let second = map.get_or_create(&1, build);
        assert!(!first.same_entry(&second));
        assert!(map.contains(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_teardown_keeps_newer_entry() {
        let map: EntryMap<u32, u8> = EntryMap::new("test");
        let current = map.get_or_create(&1, build);

        let stale = map.teardown(1);
        stale(current.entry_id() + 1_000);

        assert!(map.contains(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_after_map_dropped_is_noop() {
        let map: EntryMap<u32, u8> = EntryMap::new("test");
        let entry = map.get_or_create(&1, build);
        let sub = entry.subscribe(|_| {});
        drop(map);

        sub.unsubscribe();
        assert!(entry.is_retired());
    }
}
