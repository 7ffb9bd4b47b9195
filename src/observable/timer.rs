//! Cancellable repeating refresh task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// A repeating task that calls `on_tick` once per period.
///
/// The first tick fires one full period after [`start()`](Self::start);
/// later ticks keep the original phase. Dropping the timer cancels every
/// future tick. Work already started by a tick (e.g. a spawned fetch) is
/// not affected.
pub(crate) struct RefreshTimer {
    handle: JoinHandle<()>,
}

impl RefreshTimer {
    /// Spawn the timer on the current tokio runtime.
    ///
    /// The task stops by itself once `on_tick` returns `false`.
    pub(crate) fn start<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let first = Instant::now() + period;
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for RefreshTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
