//! Observable resource cache.
//!
//! [`ResourceCache`] hands out [`Observable`] handles for one resource type:
//!
//! - [`collection()`](ResourceCache::collection) and
//!   [`by_key()`](ResourceCache::by_key) are cached. Each key maps to at most
//!   one live entry, which polls the transport while it has subscribers and
//!   leaves the mapping the moment its last subscriber unsubscribes. The
//!   next request for that key builds a fresh entry.
//!
//! - [`create()`](ResourceCache::create),
//!   [`update_by_key()`](ResourceCache::update_by_key) and
//!   [`delete_by_key()`](ResourceCache::delete_by_key) are not cached. Each
//!   call issues its request once and returns a standalone
//!   [`RefreshPolicy::Once`] observable; replaying a mutation on a timer
//!   would repeat its side effect.
//!
//! There is no size- or time-based eviction, and no global state: every
//! `ResourceCache` owns its mappings, so independent instances never share
//! entries.

mod entries;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::observable::{DEFAULT_REFRESH_INTERVAL, Label, Observable, RefreshPolicy};
use crate::transport::{ResourceTransport, RestTransport};
use crate::{MuninnError, Resource, ResourceKey, Result};
use entries::EntryMap;

/// Configuration for a [`ResourceCache`].
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new().refresh_interval(Duration::from_secs(5));
/// assert_eq!(config.refresh_interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Period between automatic refreshes of cached entries. Default: 1s.
    pub refresh_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default refresh interval.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the period between automatic refreshes.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_interval.is_zero() {
            return Err(MuninnError::Configuration(
                "refresh interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Deduplicating cache of observable resources.
pub struct ResourceCache<R: Resource> {
    transport: Arc<dyn ResourceTransport<R>>,
    config: CacheConfig,
    collection: EntryMap<ResourceKey<R::Id>, Vec<R>>,
    items: EntryMap<ResourceKey<R::Id>, R>,
}

impl<R: Resource> ResourceCache<R> {
    /// Create a cache over `transport`.
    ///
    /// Fails when the configured refresh interval is zero.
    pub fn new(transport: Arc<dyn ResourceTransport<R>>, config: CacheConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            transport,
            config,
            collection: EntryMap::new(R::KIND),
            items: EntryMap::new(R::KIND),
        })
    }

    /// Create a cache backed by a [`RestTransport`] built from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = RestTransport::<R>::from_config(&config.transport)?;
        Self::new(Arc::new(transport), config.cache_config())
    }

    /// Observable over the whole collection.
    ///
    /// Returns the live collection entry if there is one, otherwise creates
    /// it (issuing its initial fetch).
    ///
    /// The returned handle is tied to that entry. Once the entry's last
    /// subscriber leaves, the entry is evicted and retired: subscribing to
    /// an old handle afterwards still delivers its current value but never
    /// polls again. Call `collection()` again for a live entry.
    pub fn collection(&self) -> Observable<Vec<R>> {
        self.collection
            .get_or_create(&ResourceKey::Collection, |label, teardown| {
                let transport = Arc::clone(&self.transport);
                Observable::build(
                    move || {
                        let transport = Arc::clone(&transport);
                        async move { transport.list().await }
                    },
                    self.polling(),
                    label,
                    Some(teardown),
                )
            })
    }

    /// Observable over one resource.
    ///
    /// Returns the live entry for `id` if there is one, otherwise creates it
    /// (issuing its initial fetch).
    ///
    /// Handles outlive eviction the same way as for
    /// [`collection()`](Self::collection): after the last subscriber leaves,
    /// check [`Observable::is_retired()`] and request a fresh handle rather
    /// than resubscribing to the old one.
    pub fn by_key(&self, id: &R::Id) -> Observable<R> {
        self.items
            .get_or_create(&ResourceKey::Item(id.clone()), |label, teardown| {
                let transport = Arc::clone(&self.transport);
                let id = id.clone();
                Observable::build(
                    move || {
                        let transport = Arc::clone(&transport);
                        let id = id.clone();
                        async move { transport.get(&id).await }
                    },
                    self.polling(),
                    label,
                    Some(teardown),
                )
            })
    }

    /// Create a resource. The request is issued immediately; the returned
    /// observable is never cached and never refreshes.
    pub fn create(&self, input: R::Input) -> Observable<R> {
        let transport = Arc::clone(&self.transport);
        let input = Arc::new(input);
        Observable::build(
            move || {
                let transport = Arc::clone(&transport);
                let input = Arc::clone(&input);
                async move { transport.create(&input).await }
            },
            RefreshPolicy::Once,
            self.mutation_label("create", None),
            None,
        )
    }

    /// Update the resource `id`. One-shot, like [`create()`](Self::create).
    pub fn update_by_key(&self, id: &R::Id, input: R::Input) -> Observable<R> {
        let transport = Arc::clone(&self.transport);
        let input = Arc::new(input);
        let target = id.clone();
        Observable::build(
            move || {
                let transport = Arc::clone(&transport);
                let input = Arc::clone(&input);
                let id = target.clone();
                async move { transport.update(&id, &input).await }
            },
            RefreshPolicy::Once,
            self.mutation_label("update", Some(id)),
            None,
        )
    }

    /// Delete the resource `id`. One-shot, like [`create()`](Self::create).
    pub fn delete_by_key(&self, id: &R::Id) -> Observable<()> {
        let transport = Arc::clone(&self.transport);
        let target = id.clone();
        Observable::build(
            move || {
                let transport = Arc::clone(&transport);
                let id = target.clone();
                async move { transport.delete(&id).await }
            },
            RefreshPolicy::Once,
            self.mutation_label("delete", Some(id)),
            None,
        )
    }

    /// Whether a live entry exists for `key`.
    pub fn is_cached(&self, key: &ResourceKey<R::Id>) -> bool {
        match key {
            ResourceKey::Collection => self.collection.contains(key),
            ResourceKey::Item(_) => self.items.contains(key),
        }
    }

    /// Number of live entries (collection and items together).
    pub fn len(&self) -> usize {
        self.collection.len() + self.items.len()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The configuration this cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn polling(&self) -> RefreshPolicy {
        RefreshPolicy::Interval(self.config.refresh_interval)
    }

    fn mutation_label(&self, operation: &str, id: Option<&R::Id>) -> Label {
        let key = match id {
            Some(id) => format!("{operation} {id}"),
            None => operation.to_string(),
        };
        Label { kind: R::KIND, key }
    }
}

impl<R: Resource> fmt::Debug for ResourceCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("kind", &R::KIND)
            .field("transport", &self.transport.name())
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}
