//! Caching subsystem.
//!
//! Two cooperating pieces:
//!
//! - [`CacheStore`]: bounded LRU store of synthesized audio, keyed by
//!   [`Fingerprint`](crate::Fingerprint). Bounded by entry count and total
//!   bytes; see [`store`] module docs for eviction and invalidation rules.
//!
//! - [`SynthesisGate`]: single-flight table ensuring at most one model call
//!   per fingerprint is outstanding. See [`gate`] module docs.
//!
//! Both are owned by [`SpeechGateway`](crate::SpeechGateway), which wires
//! them together behind `get_or_generate`.

pub mod gate;
pub mod store;

pub use gate::{Admission, LeaderTicket, SynthesisGate, SynthesisOutcome, Waiter};
pub use store::{CacheEntry, CacheStats, CacheStore, InsertOutcome};

use crate::fingerprint::DEFAULT_FLOAT_PRECISION;

/// Configuration for the synthesis cache.
///
/// ```rust
/// # use huginn::CacheConfig;
/// let config = CacheConfig::new()
///     .max_entries(1_000)
///     .max_bytes(256 * 1024 * 1024)
///     .float_precision(3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached artifacts. Default: 256.
    pub max_entries: u64,
    /// Maximum total artifact bytes. Default: 512 MiB.
    pub max_bytes: u64,
    /// Decimal digits kept for float parameters when fingerprinting.
    /// Default: 4.
    pub float_precision: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 256,
            max_bytes: 512 * 1024 * 1024,
            float_precision: DEFAULT_FLOAT_PRECISION,
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached artifacts.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the maximum total artifact bytes.
    pub fn max_bytes(mut self, n: u64) -> Self {
        self.max_bytes = n;
        self
    }

    /// Set the float rounding precision used for fingerprints.
    pub fn float_precision(mut self, digits: u32) -> Self {
        self.float_precision = digits;
        self
    }
}
