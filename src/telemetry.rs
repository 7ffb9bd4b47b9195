//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn caches. Consumers install their own
//! `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`.
//!
//! # Common labels
//!
//! - `kind`: resource kind (e.g. "book")
//! - `origin`: why a fetch was issued: "initial", "tick" or "manual"

/// Total fetches issued by observable entries.
///
/// Labels: `kind`, `origin` ("initial" | "tick" | "manual").
pub const FETCHES_TOTAL: &str = "muninn_fetches_total";

/// Total cache entries created on a mapping miss.
///
/// Labels: `kind`.
pub const ENTRIES_CREATED_TOTAL: &str = "muninn_entries_created_total";

/// Total requests answered by an existing cache entry.
///
/// Labels: `kind`.
pub const ENTRIES_REUSED_TOTAL: &str = "muninn_entries_reused_total";

/// Total cache entries removed after their last subscriber left.
///
/// Labels: `kind`.
pub const ENTRIES_EVICTED_TOTAL: &str = "muninn_entries_evicted_total";
