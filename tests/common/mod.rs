//! Shared test doubles for the speech model.
#![allow(dead_code)]

use std::future::Future;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use huginn::{GeneratedAudio, HuginnError, Result, SpeechModel, SynthesisRequest};

/// Sample rate of audio produced by [`StubModel`].
pub const SAMPLE_RATE: u32 = 24_000;

/// Scriptable model: counts calls, optionally blocks until released, and
/// either fails or returns `samples` samples whose value encodes the call
/// number (so two calls never produce identical audio).
pub struct StubModel {
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    failure: Option<HuginnError>,
    samples: usize,
}

impl StubModel {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: None,
            failure: None,
            samples: 240,
        }
    }

    /// A model whose calls block until a permit is added to the returned
    /// semaphore.
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let model = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::new()
        };
        (model, gate)
    }

    pub fn failing(mut self, err: HuginnError) -> Self {
        self.failure = Some(err);
        self
    }

    pub fn samples(mut self, n: usize) -> Self {
        self.samples = n;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechModel for StubModel {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, _request: &SynthesisRequest) -> Result<GeneratedAudio> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| HuginnError::SynthesisFailed(e.to_string()))?
                .forget();
        }
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let value = call as f32 / 100.0;
        Ok(GeneratedAudio::new(vec![value; self.samples], SAMPLE_RATE))
    }
}

/// A small valid mono 16-bit WAV file.
pub fn wav_bytes(samples: usize, seed: i16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
        for i in 0..samples {
            writer.write_sample(seed.wrapping_add(i as i16)).unwrap();
        }
        writer.finalize().unwrap();
    }
    buf
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Run `f` to completion on a fresh current-thread runtime.
///
/// Spawned tasks run on the calling thread, so thread-local metrics
/// recorders see everything they emit.
pub fn block_on<F: Future>(f: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(f)
}
