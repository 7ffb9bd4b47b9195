//! Observable, periodically refreshed asynchronous values.
//!
//! An [`Observable`] wraps one fetch capability. It always holds exactly one
//! current [`Pending`] result and hands that handle (not its payload) to
//! every observer:
//!
//! - on subscribe, the new observer receives the current handle;
//! - on each refresh (timer tick or [`Observable::update()`]) a new fetch is
//!   issued, becomes the current handle, and is delivered to every observer.
//!
//! # Lifecycle
//!
//! The refresh timer runs while at least one observer is subscribed. When
//! the last observer leaves, the timer stops and the entry is *retired*:
//! the optional teardown callback fires (exactly once) and the entry never
//! polls again. A retired entry still answers [`current()`](Observable::current)
//! and [`update()`](Observable::update) for whoever holds the handle.
//!
//! # Ordering
//!
//! Deliveries go through a per-entry FIFO queue drained by one caller at a
//! time, so observers see handles in assignment order. Observers may call
//! back into the entry (subscribe, unsubscribe, update) from their callback;
//! those calls enqueue and return, and the delivery in progress picks them
//! up. Observers must not block. An observer that panics loses that one
//! delivery; the others still receive it and the entry keeps refreshing.

mod pending;
mod stream;
mod timer;

pub use pending::{FetchOrigin, Pending};
pub use stream::ObservableStream;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::Result;
use crate::telemetry;
use timer::RefreshTimer;

/// Default period between automatic refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(1000);

/// Kind label used for observables built outside a cache.
const STANDALONE_KIND: &str = "standalone";

static NEXT_ENTRY_ID: AtomicU64 = AtomicU64::new(1);

type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;
type Observer<T> = Arc<dyn Fn(Pending<T>) + Send + Sync>;
/// Called with the entry id when the entry retires.
pub(crate) type Teardown = Box<dyn FnOnce(u64) + Send>;
type Cancel = Box<dyn FnOnce() + Send>;

/// How an entry refreshes itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Re-fetch every period while subscribed.
    Interval(Duration),
    /// Fetch exactly once. Used for mutations: the entry never polls and
    /// [`Observable::update()`] is a no-op, so the side effect is never
    /// replayed.
    Once,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        RefreshPolicy::Interval(DEFAULT_REFRESH_INTERVAL)
    }
}

/// Names an entry in logs and metrics.
#[derive(Debug, Clone)]
pub(crate) struct Label {
    pub(crate) kind: &'static str,
    pub(crate) key: String,
}

struct Delivery<T> {
    value: Pending<T>,
    /// Observers registered when `value` was assigned.
    targets: Vec<u64>,
}

struct State<T> {
    current: Pending<T>,
    generation: u64,
    observers: BTreeMap<u64, Observer<T>>,
    next_observer: u64,
    timer: Option<RefreshTimer>,
    teardown: Option<Teardown>,
    retired: bool,
    queue: VecDeque<Delivery<T>>,
    draining: bool,
}

struct Entry<T> {
    id: u64,
    label: Label,
    policy: RefreshPolicy,
    fetch: FetchFn<T>,
    state: Mutex<State<T>>,
}

/// Handle to one observable entry.
///
/// Cloning is cheap; all clones share the same entry. See the
/// [module docs](self) for lifecycle and ordering.
pub struct Observable<T> {
    entry: Arc<Entry<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Build a standalone observable and issue its initial fetch.
    ///
    /// ```rust
    /// # use muninn::{Observable, RefreshPolicy};
    /// # use std::time::Duration;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let clock = Observable::new(
    ///     || async { Ok(42u32) },
    ///     RefreshPolicy::Interval(Duration::from_secs(5)),
    /// );
    /// let value = clock.current().await.unwrap();
    /// assert_eq!(value, 42);
    /// # }
    /// ```
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new<F, Fut>(fetch: F, policy: RefreshPolicy) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let label = Label {
            kind: STANDALONE_KIND,
            key: "-".to_string(),
        };
        Self::build(fetch, policy, label, None)
    }

    pub(crate) fn build<F, Fut>(
        fetch: F,
        policy: RefreshPolicy,
        label: Label,
        teardown: Option<Teardown>,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetch: FetchFn<T> = Box::new(move || fetch().boxed());
        let id = NEXT_ENTRY_ID.fetch_add(1, Ordering::Relaxed);
        let current = Pending::spawn(fetch(), 1, FetchOrigin::Initial);
        record_fetch(&label, id, 1, FetchOrigin::Initial);

        Self {
            entry: Arc::new(Entry {
                id,
                label,
                policy,
                fetch,
                state: Mutex::new(State {
                    current,
                    generation: 1,
                    observers: BTreeMap::new(),
                    next_observer: 0,
                    timer: None,
                    teardown,
                    retired: false,
                    queue: VecDeque::new(),
                    draining: false,
                }),
            }),
        }
    }

    /// Register `observer` for every value this entry assigns, starting with
    /// the current one (delivered before this call returns, unless another
    /// delivery is in progress on this entry).
    ///
    /// The first subscriber starts the refresh timer. Dropping the returned
    /// [`Subscription`] unsubscribes.
    ///
    /// # Panics
    ///
    /// Panics when the refresh timer must start outside a tokio runtime.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Pending<T>) + Send + Sync + 'static,
    {
        let id = self.entry.attach(Arc::new(observer));
        let entry = Arc::clone(&self.entry);
        Subscription::new(move || entry.detach(id))
    }

    /// Subscribe and receive values as a stream.
    ///
    /// The stream yields the current handle first, then every later one.
    /// Dropping the stream unsubscribes.
    pub fn stream(&self) -> ObservableStream<T> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self.subscribe(move |pending| {
            let _ = tx.send(pending);
        });
        ObservableStream::new(rx, subscription)
    }

    /// Issue a fresh fetch now and deliver it to every current observer.
    ///
    /// Works with or without subscribers and does not shift the timer's
    /// schedule. No-op for [`RefreshPolicy::Once`] entries.
    pub fn update(&self) {
        if self.entry.policy == RefreshPolicy::Once {
            debug!(
                kind = self.entry.label.kind,
                key = %self.entry.label.key,
                entry = self.entry.id,
                "update ignored on one-shot entry"
            );
            return;
        }
        self.entry.refresh(FetchOrigin::Manual);
    }

    /// The most recently assigned handle.
    pub fn current(&self) -> Pending<T> {
        self.entry.state().current.clone()
    }
}

impl<T> Observable<T> {
    /// Number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.entry.state().observers.len()
    }

    /// Whether the refresh timer is running.
    pub fn is_polling(&self) -> bool {
        self.entry.state().timer.is_some()
    }

    /// Whether the last subscriber has left. A retired entry never polls again.
    pub fn is_retired(&self) -> bool {
        self.entry.state().retired
    }

    /// Generation of the current handle.
    pub fn generation(&self) -> u64 {
        self.entry.state().generation
    }

    /// This entry's refresh policy.
    pub fn policy(&self) -> RefreshPolicy {
        self.entry.policy
    }

    /// Process-unique id of the underlying entry.
    pub fn entry_id(&self) -> u64 {
        self.entry.id
    }

    /// Whether both handles point at the same entry.
    pub fn same_entry(&self, other: &Observable<T>) -> bool {
        Arc::ptr_eq(&self.entry, &other.entry)
    }
}

impl<T> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("entry", &self.entry.id)
            .field("kind", &self.entry.label.kind)
            .field("key", &self.entry.label.key)
            .field("policy", &self.entry.policy)
            .finish_non_exhaustive()
    }
}

impl<T> Entry<T> {
    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove one observer. The 1→0 transition stops the timer, retires the
    /// entry and fires teardown; any other call (including a repeat for the
    /// same id) changes nothing.
    fn detach(&self, observer: u64) {
        let mut state = self.state();
        let Some(removed) = state.observers.remove(&observer) else {
            return;
        };
        if !state.observers.is_empty() {
            drop(state);
            drop(removed);
            return;
        }

        let timer = state.timer.take();
        let first_retirement = !state.retired;
        state.retired = true;
        let teardown = state.teardown.take();
        drop(state);
        drop(timer);
        drop(removed);

        if first_retirement {
            debug!(
                kind = self.label.kind,
                key = %self.label.key,
                entry = self.id,
                "last subscriber left, entry retired"
            );
        }
        if let Some(teardown) = teardown {
            teardown(self.id);
        }
    }
}

impl<T> Entry<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn attach(self: &Arc<Self>, observer: Observer<T>) -> u64 {
        let id = {
            let mut state = self.state();
            let id = state.next_observer;
            state.next_observer += 1;
            state.observers.insert(id, observer);

            if state.observers.len() == 1 {
                self.start_polling(&mut state);
            }

            let value = state.current.clone();
            state.queue.push_back(Delivery {
                value,
                targets: vec![id],
            });
            id
        };
        self.drain();
        id
    }

    fn start_polling(self: &Arc<Self>, state: &mut State<T>) {
        let RefreshPolicy::Interval(period) = self.policy else {
            return;
        };
        if state.retired {
            debug!(
                kind = self.label.kind,
                key = %self.label.key,
                entry = self.id,
                "subscriber joined retired entry, polling stays off"
            );
            return;
        }

        let weak = Arc::downgrade(self);
        state.timer = Some(RefreshTimer::start(period, move || match weak.upgrade() {
            Some(entry) => {
                entry.refresh(FetchOrigin::Tick);
                true
            }
            None => false,
        }));
        debug!(
            kind = self.label.kind,
            key = %self.label.key,
            entry = self.id,
            period_ms = period.as_millis() as u64,
            "refresh timer started"
        );
    }

    fn refresh(&self, origin: FetchOrigin) {
        {
            let mut state = self.state();
            state.generation += 1;
            let generation = state.generation;
            let pending = Pending::spawn((self.fetch)(), generation, origin);
            record_fetch(&self.label, self.id, generation, origin);

            state.current = pending.clone();
            let targets: Vec<u64> = state.observers.keys().copied().collect();
            if !targets.is_empty() {
                state.queue.push_back(Delivery {
                    value: pending,
                    targets,
                });
            }
        }
        self.drain();
    }

    /// Deliver queued values until the queue is empty. Only one caller
    /// drains at a time; everyone else just enqueues.
    fn drain(&self) {
        {
            let mut state = self.state();
            if state.draining {
                return;
            }
            state.draining = true;
        }

        loop {
            let (value, observers) = {
                let mut state = self.state();
                let Some(delivery) = state.queue.pop_front() else {
                    state.draining = false;
                    return;
                };
                let observers: Vec<Observer<T>> = delivery
                    .targets
                    .iter()
                    .filter_map(|id| state.observers.get(id).cloned())
                    .collect();
                (delivery.value, observers)
            };

            for observer in observers {
                let value = value.clone();
                if catch_unwind(AssertUnwindSafe(|| observer(value))).is_err() {
                    warn!(
                        kind = self.label.kind,
                        key = %self.label.key,
                        entry = self.id,
                        "observer panicked, delivery skipped"
                    );
                }
            }
        }
    }
}

fn record_fetch(label: &Label, entry: u64, generation: u64, origin: FetchOrigin) {
    metrics::counter!(telemetry::FETCHES_TOTAL,
        "kind" => label.kind,
        "origin" => origin.as_str(),
    )
    .increment(1);
    trace!(
        kind = label.kind,
        key = %label.key,
        entry,
        generation,
        origin = origin.as_str(),
        "fetch issued"
    );
}

/// An active registration on an [`Observable`].
///
/// [`unsubscribe()`](Self::unsubscribe) is idempotent; dropping the
/// subscription unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Mutex<Option<Cancel>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Stop receiving values. Calling this more than once has no effect.
    pub fn unsubscribe(&self) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    /// Whether [`unsubscribe()`](Self::unsubscribe) has not run yet.
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
