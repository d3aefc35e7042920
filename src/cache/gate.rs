//! Single-flight gate: one in-flight synthesis per fingerprint.
//!
//! The first caller for a fingerprint becomes the leader and receives a
//! [`LeaderTicket`]; everyone arriving while that synthesis is outstanding
//! becomes a follower and receives a [`Waiter`]. Publishing through the
//! ticket removes the pending marker and wakes every waiter with the same
//! outcome, success or failure. The next request for that fingerprint starts
//! a fresh cycle.
//!
//! Each pending fingerprint owns a `tokio::sync::watch` channel; waiters are
//! woken by the channel, never by polling. The pending table itself sits
//! behind one mutex held only for O(1) insert/remove.
//!
//! [`SynthesisGate::detach_all`] forgets every pending marker without
//! touching the channels. Syntheses already running still reach the callers
//! that joined them, but later callers start a new cycle instead of joining
//! a synthesis that predates the detach.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::warn;

use super::store::CacheEntry;
use crate::fingerprint::Fingerprint;
use crate::{HuginnError, Result};

/// Outcome shared between the leader and all followers.
pub type SynthesisOutcome = Result<Arc<CacheEntry>>;

type Slot = Arc<watch::Sender<Option<SynthesisOutcome>>>;
type PendingTable = Arc<Mutex<HashMap<Fingerprint, Slot>>>;

/// Result of [`SynthesisGate::acquire_or_join`].
#[derive(Debug)]
pub enum Admission {
    /// Caller must synthesize and publish.
    Leader(LeaderTicket),
    /// Someone else is synthesizing; wait for their outcome.
    Follower(Waiter),
}

/// Collapses concurrent requests for one fingerprint into a single synthesis.
///
/// Cheap to clone; clones share the pending table.
#[derive(Clone, Default)]
pub struct SynthesisGate {
    pending: PendingTable,
}

impl SynthesisGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        lock_table(&self.pending)
    }

    /// Become leader for `fingerprint`, or join the synthesis already
    /// running for it.
    pub fn acquire_or_join(&self, fingerprint: Fingerprint) -> Admission {
        let mut pending = self.lock();
        if let Some(slot) = pending.get(&fingerprint) {
            return Admission::Follower(Waiter {
                fingerprint,
                rx: slot.subscribe(),
            });
        }

        let slot: Slot = Arc::new(watch::channel(None).0);
        pending.insert(fingerprint, Arc::clone(&slot));
        Admission::Leader(LeaderTicket {
            fingerprint,
            slot,
            pending: Arc::clone(&self.pending),
            published: false,
        })
    }

    /// Forget every pending marker. Returns how many were detached.
    ///
    /// Detached leaders still publish to the waiters they already have.
    pub fn detach_all(&self) -> usize {
        let mut pending = self.lock();
        let detached = pending.len();
        pending.clear();
        detached
    }

    /// Whether a synthesis for `fingerprint` is outstanding.
    pub fn is_pending(&self, fingerprint: &Fingerprint) -> bool {
        self.lock().contains_key(fingerprint)
    }

    /// Number of fingerprints with a synthesis outstanding.
    pub fn in_flight(&self) -> usize {
        self.lock().len()
    }

    /// Number of callers currently waiting on `fingerprint`, including the
    /// leader's own waiter if it took one.
    pub fn waiters(&self, fingerprint: &Fingerprint) -> usize {
        self.lock()
            .get(fingerprint)
            .map_or(0, |slot| slot.receiver_count())
    }
}

fn lock_table(
    table: &Mutex<HashMap<Fingerprint, Slot>>,
) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
    // Critical sections only insert/remove; the map is never left half-updated.
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Proof of leadership for one fingerprint.
///
/// Must be consumed by [`publish`](Self::publish). Dropping an unpublished
/// ticket publishes a [`HuginnError::SynthesisFailed`] so followers never
/// hang.
#[derive(Debug)]
pub struct LeaderTicket {
    fingerprint: Fingerprint,
    slot: Slot,
    pending: PendingTable,
    published: bool,
}

impl LeaderTicket {
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Subscribe to this ticket's own outcome, exactly like a follower.
    ///
    /// Lets the leader hand the ticket to a background task and still await
    /// the result.
    pub fn waiter(&self) -> Waiter {
        Waiter {
            fingerprint: self.fingerprint,
            rx: self.slot.subscribe(),
        }
    }

    /// Publish the outcome to every waiter and remove the pending marker,
    /// unless it was detached and replaced by a newer cycle.
    ///
    /// Returns the number of waiters that were subscribed.
    pub fn publish(mut self, outcome: SynthesisOutcome) -> usize {
        self.published = true;
        self.finish(outcome)
    }

    fn finish(&self, outcome: SynthesisOutcome) -> usize {
        {
            let mut pending = lock_table(&self.pending);
            if pending
                .get(&self.fingerprint)
                .is_some_and(|slot| Arc::ptr_eq(slot, &self.slot))
            {
                pending.remove(&self.fingerprint);
            }
        }
        let waiters = self.slot.receiver_count();
        self.slot.send_replace(Some(outcome));
        waiters
    }
}

impl Drop for LeaderTicket {
    fn drop(&mut self) {
        if !self.published {
            warn!(fingerprint = %self.fingerprint, "leader dropped without publishing");
            self.finish(Err(HuginnError::SynthesisFailed(
                "synthesis abandoned before publishing a result".into(),
            )));
        }
    }
}

/// Handle for awaiting a synthesis owned by someone else.
///
/// Dropping a waiter (e.g. on caller timeout) stops waiting without
/// affecting the leader.
#[derive(Debug)]
pub struct Waiter {
    fingerprint: Fingerprint,
    rx: watch::Receiver<Option<SynthesisOutcome>>,
}

impl Waiter {
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Wait for the leader's outcome.
    pub async fn wait(mut self) -> SynthesisOutcome {
        if let Ok(outcome) = self.rx.wait_for(Option::is_some).await {
            if let Some(outcome) = outcome.as_ref() {
                return outcome.clone();
            }
        }
        // Sender gone; the value may still have been published just before.
        self.rx.borrow().clone().unwrap_or_else(|| {
            Err(HuginnError::SynthesisFailed(
                "synthesis abandoned before publishing a result".into(),
            ))
        })
    }
}
