//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

mod common;

use std::sync::Arc;

use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};

use common::{StubModel, block_on};
use huginn::telemetry;
use huginn::{Huginn, HuginnError, SpeechGateway, SynthesisRequest};

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counters with `name` whose `label` equals `value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn gauge(snapshot: &SnapshotVec, name: &str) -> Option<f64> {
    snapshot
        .iter()
        .find(|(key, _, _, _)| key.kind() == MetricKind::Gauge && key.key().name() == name)
        .and_then(|(_, _, _, value)| match value {
            DebugValue::Gauge(v) => Some(v.into_inner()),
            _ => None,
        })
}

/// Run `scenario` against a gateway with a local recorder installed.
///
/// A current-thread runtime keeps the gateway's spawned synthesis tasks on
/// the recorder's thread.
fn record<F, Fut>(gateway: SpeechGateway, scenario: F) -> SnapshotVec
where
    F: FnOnce(SpeechGateway) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    metrics::with_local_recorder(&recorder, || block_on(scenario(gateway)));
    snapshotter.snapshot().into_vec()
}

fn hello() -> SynthesisRequest {
    SynthesisRequest::builder("Hello").build().unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn miss_then_hit_records_cache_and_synthesis_metrics() {
    let gw = Huginn::builder()
        .model(Arc::new(StubModel::new()))
        .build()
        .unwrap();

    let snapshot = record(gw, |gw| async move {
        gw.get_or_generate(&hello()).await.unwrap();
        gw.get_or_generate(&hello()).await.unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_MISSES_TOTAL), 1);
    assert_eq!(counter_total(&snapshot, telemetry::CACHE_HITS_TOTAL), 1);
    assert_eq!(
        counter_with_label(&snapshot, telemetry::SYNTHESIS_TOTAL, "status", "ok"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::MODEL_LOADS_TOTAL, "variant", "english"),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::SYNTHESIS_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
    assert_eq!(gauge(&snapshot, telemetry::CACHE_ENTRIES), Some(1.0));
}

#[test]
fn failed_synthesis_records_error_status() {
    let model = StubModel::new().failing(HuginnError::SynthesisFailed("oom".into()));
    let gw = Huginn::builder().model(Arc::new(model)).build().unwrap();

    let snapshot = record(gw, |gw| async move {
        assert!(gw.get_or_generate(&hello()).await.is_err());
    });

    assert_eq!(
        counter_with_label(&snapshot, telemetry::SYNTHESIS_TOTAL, "status", "error"),
        1
    );
    assert_eq!(gauge(&snapshot, telemetry::CACHE_ENTRIES), None);
}

#[test]
fn evictions_and_clears_are_labelled() {
    let gw = Huginn::builder()
        .model(Arc::new(StubModel::new()))
        .max_entries(1)
        .build()
        .unwrap();

    let snapshot = record(gw, |gw| async move {
        gw.get_or_generate(&hello()).await.unwrap();
        gw.get_or_generate(&SynthesisRequest::builder("Bye").build().unwrap())
            .await
            .unwrap();
        gw.clear().await;
    });

    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_EVICTIONS_TOTAL, "reason", "capacity"),
        1
    );
    assert_eq!(
        counter_with_label(&snapshot, telemetry::CACHE_EVICTIONS_TOTAL, "reason", "clear"),
        1
    );
    assert_eq!(gauge(&snapshot, telemetry::CACHE_ENTRIES), Some(0.0));
    assert_eq!(gauge(&snapshot, telemetry::CACHE_BYTES), Some(0.0));
}

#[test]
fn oversize_artifact_records_rejection() {
    let gw = Huginn::builder()
        .model(Arc::new(StubModel::new().samples(1_000)))
        .max_bytes(100)
        .build()
        .unwrap();

    let snapshot = record(gw, |gw| async move {
        gw.get_or_generate(&hello()).await.unwrap();
    });

    assert_eq!(counter_total(&snapshot, telemetry::CACHE_REJECTIONS_TOTAL), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let gw = Huginn::builder()
        .model(Arc::new(StubModel::new()))
        .build()
        .unwrap();
    gw.get_or_generate(&hello()).await.unwrap();
}
