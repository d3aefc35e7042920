//! Tests for [`SynthesisGate`] leader/follower coordination.

use std::sync::Arc;

use huginn::cache::{Admission, LeaderTicket, Waiter};
use huginn::{
    AudioArtifact, CacheEntry, Fingerprint, GeneratedAudio, HuginnError, SynthesisGate,
};

fn fp(id: u8) -> Fingerprint {
    Fingerprint::from_bytes([id; 16])
}

fn entry(id: u8) -> Arc<CacheEntry> {
    let audio = GeneratedAudio::new(vec![0.2; 16], 8_000);
    Arc::new(CacheEntry::new(fp(id), AudioArtifact::encode(&audio).unwrap()))
}

fn lead(gate: &SynthesisGate, id: u8) -> LeaderTicket {
    match gate.acquire_or_join(fp(id)) {
        Admission::Leader(ticket) => ticket,
        Admission::Follower(_) => panic!("expected leader"),
    }
}

fn follow(gate: &SynthesisGate, id: u8) -> Waiter {
    match gate.acquire_or_join(fp(id)) {
        Admission::Follower(waiter) => waiter,
        Admission::Leader(_) => panic!("expected follower"),
    }
}

#[tokio::test]
async fn followers_receive_published_entry() {
    let gate = SynthesisGate::new();
    let ticket = lead(&gate, 1);
    let a = follow(&gate, 1);
    let b = follow(&gate, 1);

    let published = entry(1);
    assert_eq!(ticket.publish(Ok(Arc::clone(&published))), 2);

    for waiter in [a, b] {
        let got = waiter.wait().await.unwrap();
        assert!(Arc::ptr_eq(&got, &published));
    }
}

#[tokio::test]
async fn followers_receive_published_error() {
    let gate = SynthesisGate::new();
    let ticket = lead(&gate, 1);
    let waiter = follow(&gate, 1);

    ticket.publish(Err(HuginnError::SynthesisFailed("boom".into())));
    assert_eq!(
        waiter.wait().await.unwrap_err(),
        HuginnError::SynthesisFailed("boom".into())
    );
}

#[test]
fn publish_starts_a_fresh_cycle() {
    let gate = SynthesisGate::new();
    lead(&gate, 1).publish(Ok(entry(1)));

    assert!(!gate.is_pending(&fp(1)));
    // Next caller leads again.
    let _ticket = lead(&gate, 1);
    assert!(gate.is_pending(&fp(1)));
}

#[tokio::test]
async fn leader_can_await_its_own_outcome() {
    let gate = SynthesisGate::new();
    let ticket = lead(&gate, 3);
    let own = ticket.waiter();

    let handle = tokio::spawn(async move {
        ticket.publish(Ok(entry(3)));
    });
    let got = own.wait().await.unwrap();
    handle.await.unwrap();
    assert_eq!(got.fingerprint, fp(3));
}

#[tokio::test]
async fn dropped_follower_does_not_disturb_others() {
    let gate = SynthesisGate::new();
    let ticket = lead(&gate, 4);
    let gone = follow(&gate, 4);
    let stays = follow(&gate, 4);
    drop(gone);

    assert_eq!(gate.waiters(&fp(4)), 1);
    ticket.publish(Ok(entry(4)));
    assert!(stays.wait().await.is_ok());
}

#[tokio::test]
async fn panicking_leader_fails_followers() {
    let gate = SynthesisGate::new();
    let ticket = lead(&gate, 5);
    let waiter = follow(&gate, 5);

    let task = tokio::spawn(async move {
        let _ticket = ticket;
        panic!("model crashed");
    });
    assert!(task.await.is_err());

    assert!(matches!(
        waiter.wait().await,
        Err(HuginnError::SynthesisFailed(_))
    ));
    assert_eq!(gate.in_flight(), 0);
}
