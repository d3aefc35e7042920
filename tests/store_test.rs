//! Tests for [`CacheStore`] bounds, recency and invalidation.

use std::sync::Arc;

use huginn::{
    AudioArtifact, CacheConfig, CacheEntry, CacheStore, Fingerprint, GeneratedAudio,
    InsertOutcome,
};

fn fp(id: u8) -> Fingerprint {
    Fingerprint::from_bytes([id; 16])
}

fn entry(id: u8, samples: usize) -> CacheEntry {
    let audio = GeneratedAudio::new(vec![0.1; samples], 16_000);
    CacheEntry::new(fp(id), AudioArtifact::encode(&audio).unwrap())
}

fn store(max_entries: u64) -> CacheStore {
    CacheStore::new(&CacheConfig::new().max_entries(max_entries))
}

#[test]
fn miss_then_hit() {
    let store = store(4);
    assert!(store.lookup(&fp(1)).is_none());
    store.insert(entry(1, 10));
    let hit = store.lookup(&fp(1)).unwrap();
    assert_eq!(hit.fingerprint, fp(1));

    let stats = store.stats();
    assert_eq!((stats.hits, stats.misses), (1, 1));
}

#[test]
fn oldest_entry_evicted_when_count_exceeded() {
    let store = store(2);
    store.insert(entry(1, 10));
    store.insert(entry(2, 10));
    let outcome = store.insert(entry(3, 10));

    assert_eq!(outcome, InsertOutcome::Inserted { evicted: 1 });
    assert!(!store.contains(&fp(1)));
    assert!(store.contains(&fp(2)));
    assert!(store.contains(&fp(3)));
}

#[test]
fn lookup_protects_entry_from_eviction() {
    let store = store(2);
    store.insert(entry(1, 10));
    store.insert(entry(2, 10));
    store.lookup(&fp(1));
    store.insert(entry(3, 10));

    assert!(store.contains(&fp(1)));
    assert!(!store.contains(&fp(2)));
}

#[test]
fn peek_does_not_refresh_recency() {
    let store = store(2);
    store.insert(entry(1, 10));
    store.insert(entry(2, 10));
    assert!(store.peek(&fp(1)).is_some());
    store.insert(entry(3, 10));

    assert!(!store.contains(&fp(1)));
    assert_eq!(store.stats().hits, 0);
}

#[test]
fn byte_budget_evicts_until_it_holds() {
    let size = entry(0, 100).size_bytes();
    let store = CacheStore::new(&CacheConfig::new().max_bytes(size * 3));
    for id in 1..=3 {
        store.insert(entry(id, 100));
    }
    // One larger entry pushes out the two oldest.
    let outcome = store.insert(entry(4, 200));

    assert_eq!(outcome, InsertOutcome::Inserted { evicted: 2 });
    assert_eq!(store.len(), 2);
    assert!(store.total_bytes() <= size * 3);
    assert!(store.contains(&fp(3)));
    assert!(store.contains(&fp(4)));
}

#[test]
fn oversize_entry_rejected_without_evicting() {
    let store = CacheStore::new(&CacheConfig::new().max_bytes(200));
    store.insert(entry(1, 10));
    let outcome = store.insert(entry(2, 1_000));

    assert_eq!(
        outcome,
        InsertOutcome::Rejected {
            size: 44 + 2_000,
            budget: 200
        }
    );
    assert!(store.contains(&fp(1)));
    assert!(!store.contains(&fp(2)));
    assert_eq!(store.stats().rejections, 1);
}

#[test]
fn first_insert_stays_canonical() {
    let store = store(4);
    let first = Arc::new(entry(1, 10));
    store.insert(Arc::clone(&first));
    assert_eq!(store.insert(entry(1, 20)), InsertOutcome::AlreadyCached);

    let kept = store.peek(&fp(1)).unwrap();
    assert!(Arc::ptr_eq(&kept, &first));
    assert_eq!(store.len(), 1);
}

#[test]
fn clear_empties_and_bumps_generation() {
    let store = store(4);
    store.insert(entry(1, 10));
    store.insert(entry(2, 10));
    let before = store.generation();

    assert_eq!(store.clear(), 2);
    assert!(store.is_empty());
    assert_eq!(store.total_bytes(), 0);
    assert_eq!(store.generation(), before + 1);
}

#[test]
fn insert_after_clear_with_old_generation_is_stale() {
    let store = store(4);
    let generation = store.generation();
    store.clear();

    assert_eq!(
        store.insert_if_current(entry(1, 10), generation),
        InsertOutcome::Stale
    );
    assert!(store.is_empty());

    let current = store.generation();
    assert!(store.insert_if_current(entry(1, 10), current).is_stored());
}

#[test]
fn held_entries_outlive_eviction() {
    let store = store(1);
    store.insert(entry(1, 10));
    let held = store.lookup(&fp(1)).unwrap();
    store.insert(entry(2, 10));

    assert!(!store.contains(&fp(1)));
    assert_eq!(held.artifact.num_samples(), 10);
}
