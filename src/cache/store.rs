//! Bounded LRU store of synthesized audio.
//!
//! Entries are bounded by count and by total artifact bytes. After every
//! insert the store evicts least-recently-used entries until both bounds
//! hold. Recency is kept as a strict list by [`lru::LruCache`], so eviction
//! order is exact and never depends on timestamps.
//!
//! [`CacheStore::clear`] bumps a generation counter. Syntheses that started
//! before the clear insert through [`CacheStore::insert_if_current`] and are
//! dropped as [`InsertOutcome::Stale`], so invalidated audio cannot reappear.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use lru::LruCache;
use serde::Serialize;
use tracing::{debug, warn};

use super::CacheConfig;
use crate::fingerprint::Fingerprint;
use crate::telemetry;
use crate::types::AudioArtifact;

/// A cached synthesis result. Immutable; shared as `Arc<CacheEntry>`.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub artifact: AudioArtifact,
    pub created_at: SystemTime,
}

impl CacheEntry {
    pub fn new(fingerprint: Fingerprint, artifact: AudioArtifact) -> Self {
        Self {
            fingerprint,
            artifact,
            created_at: SystemTime::now(),
        }
    }

    pub fn size_bytes(&self) -> u64 {
        self.artifact.size_bytes()
    }
}

/// What happened to an inserted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored; `evicted` older entries were removed to make room.
    Inserted { evicted: usize },
    /// An entry for this fingerprint already exists and was kept.
    AlreadyCached,
    /// The artifact alone exceeds the byte budget (or the store holds no
    /// entries at all); nothing was stored.
    Rejected { size: u64, budget: u64 },
    /// The store was cleared after the synthesis started; nothing was stored.
    Stale,
}

impl InsertOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Point-in-time store counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub bytes: u64,
    pub max_entries: u64,
    pub max_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub rejections: u64,
    pub generation: u64,
}

struct StoreInner {
    /// Unbounded recency list; both bounds are enforced by `evict_locked`.
    entries: LruCache<Fingerprint, Arc<CacheEntry>>,
    total_bytes: u64,
    generation: u64,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            entries: LruCache::unbounded(),
            total_bytes: 0,
            generation: 0,
        }
    }

    fn remove_oldest(&mut self) -> Option<Arc<CacheEntry>> {
        let (_, entry) = self.entries.pop_lru()?;
        self.total_bytes -= entry.size_bytes();
        Some(entry)
    }

    fn over_budget(&self, max_entries: u64, max_bytes: u64) -> bool {
        self.entries.len() as u64 > max_entries || self.total_bytes > max_bytes
    }
}

/// Thread-safe bounded LRU store keyed by [`Fingerprint`].
///
/// All operations hold a single mutex for O(1) work per entry touched; no
/// I/O or model calls happen under it.
pub struct CacheStore {
    inner: Mutex<StoreInner>,
    max_entries: u64,
    max_bytes: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejections: AtomicU64,
}

impl CacheStore {
    /// Create an empty store bounded by `config`.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Mutex::new(StoreInner::new()),
            max_entries: config.max_entries,
            max_bytes: config.max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Every mutation leaves the maps consistent before it can panic, so a
        // poisoned lock still guards valid state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up an entry, refreshing its recency on a hit.
    ///
    /// Emits cache hit/miss metrics.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        let found = self.lock().entries.get(fingerprint).map(Arc::clone);
        match &found {
            Some(_) => self.record_hit(),
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
            }
        }
        found
    }

    /// Look again after a counted miss.
    ///
    /// A hit refreshes recency and is counted like any other hit; a second
    /// miss is not counted.
    pub fn recheck(&self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        let found = self.lock().entries.get(fingerprint).map(Arc::clone);
        if found.is_some() {
            self.record_hit();
        }
        found
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
    }

    /// Fetch an entry without touching recency or hit/miss counters.
    pub fn peek(&self, fingerprint: &Fingerprint) -> Option<Arc<CacheEntry>> {
        self.lock().entries.peek(fingerprint).map(Arc::clone)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().entries.contains(fingerprint)
    }

    /// Insert an entry, then evict until both bounds hold.
    pub fn insert(&self, entry: impl Into<Arc<CacheEntry>>) -> InsertOutcome {
        let mut inner = self.lock();
        self.insert_locked(&mut inner, entry.into())
    }

    /// Insert only if no [`clear`](Self::clear) happened since `generation`
    /// was read.
    pub fn insert_if_current(
        &self,
        entry: impl Into<Arc<CacheEntry>>,
        generation: u64,
    ) -> InsertOutcome {
        let entry = entry.into();
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(fingerprint = %entry.fingerprint, "dropping result of pre-clear synthesis");
            return InsertOutcome::Stale;
        }
        self.insert_locked(&mut inner, entry)
    }

    fn insert_locked(&self, inner: &mut StoreInner, entry: Arc<CacheEntry>) -> InsertOutcome {
        let size = entry.size_bytes();
        if size > self.max_bytes || self.max_entries == 0 {
            self.rejections.fetch_add(1, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_REJECTIONS_TOTAL).increment(1);
            warn!(
                fingerprint = %entry.fingerprint,
                size,
                budget = self.max_bytes,
                "artifact exceeds cache capacity, returning without storing"
            );
            return InsertOutcome::Rejected {
                size,
                budget: self.max_bytes,
            };
        }

        if inner.entries.contains(&entry.fingerprint) {
            return InsertOutcome::AlreadyCached;
        }

        inner.total_bytes += size;
        inner.entries.put(entry.fingerprint, entry);

        let evicted = self.evict_locked(inner);
        InsertOutcome::Inserted { evicted }
    }

    /// Evict least-recently-used entries until both bounds hold.
    ///
    /// Returns the number of evicted entries. Runs automatically after each
    /// insert.
    pub fn evict_if_needed(&self) -> usize {
        let mut inner = self.lock();
        self.evict_locked(&mut inner)
    }

    fn evict_locked(&self, inner: &mut StoreInner) -> usize {
        let mut evicted = 0;
        while inner.over_budget(self.max_entries, self.max_bytes) {
            let Some(entry) = inner.remove_oldest() else {
                break;
            };
            debug!(fingerprint = %entry.fingerprint, bytes = entry.size_bytes(), "evicted");
            evicted += 1;
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "capacity")
                .increment(evicted as u64);
        }
        self.record_gauges(inner);
        evicted
    }

    /// Remove every entry and invalidate in-flight syntheses.
    ///
    /// Returns the number of entries removed. Callers holding an
    /// `Arc<CacheEntry>` keep a valid artifact; it is simply no longer
    /// reachable through the store.
    pub fn clear(&self) -> usize {
        let mut inner = self.lock();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.total_bytes = 0;
        inner.generation += 1;
        metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "clear")
            .increment(removed as u64);
        self.record_gauges(&inner);
        removed
    }

    /// Current generation; incremented by every [`clear`](Self::clear).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.lock().total_bytes
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entries: inner.entries.len() as u64,
            bytes: inner.total_bytes,
            max_entries: self.max_entries,
            max_bytes: self.max_bytes,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            generation: inner.generation,
        }
    }

    fn record_gauges(&self, inner: &StoreInner) {
        metrics::gauge!(telemetry::CACHE_ENTRIES).set(inner.entries.len() as f64);
        metrics::gauge!(telemetry::CACHE_BYTES).set(inner.total_bytes as f64);
    }
}
