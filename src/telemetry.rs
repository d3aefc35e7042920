//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `variant`: model variant ("english" | "multilingual")
//! - `status`: outcome: "ok" or "error"
//! - `reason`: why an entry left the cache ("capacity" | "clear")
//! - `operation`: backend call ("health" | "generate")

/// Store lookups that found an entry.
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Store lookups that found nothing.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Entries removed from the store.
///
/// Labels: `reason` ("capacity" | "clear").
pub const CACHE_EVICTIONS_TOTAL: &str = "huginn_cache_evictions_total";

/// Artifacts returned to callers but not stored because they exceed the
/// byte budget.
pub const CACHE_REJECTIONS_TOTAL: &str = "huginn_cache_rejections_total";

/// Current number of stored entries (gauge).
pub const CACHE_ENTRIES: &str = "huginn_cache_entries";

/// Current total artifact bytes held by the store (gauge).
pub const CACHE_BYTES: &str = "huginn_cache_bytes";

/// Calls into the external model.
///
/// Labels: `variant`, `status`.
pub const SYNTHESIS_TOTAL: &str = "huginn_synthesis_total";

/// Duration of a single model call in seconds.
///
/// Labels: `variant`.
pub const SYNTHESIS_DURATION_SECONDS: &str = "huginn_synthesis_duration_seconds";

/// Requests that joined an already in-flight synthesis instead of starting
/// their own.
pub const SINGLE_FLIGHT_JOINS_TOTAL: &str = "huginn_single_flight_joins_total";

/// Model loads performed by the model pool.
///
/// Labels: `variant`, `status`.
pub const MODEL_LOADS_TOTAL: &str = "huginn_model_loads_total";

/// Backend calls retried after a transient error.
///
/// Labels: `variant`, `operation`.
pub const BACKEND_RETRIES_TOTAL: &str = "huginn_backend_retries_total";
