//! SpeechGateway - the cache façade in front of the speech model.
//!
//! `get_or_generate` fingerprints the request once, answers from the store
//! when it can, and otherwise funnels every concurrent caller for the same
//! fingerprint through one synthesis. The synthesis runs in its own task so
//! it finishes, caches and publishes even when the caller that started it
//! goes away.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{Instrument, Span, debug, info, instrument, warn};

use crate::cache::{Admission, CacheEntry, CacheStats, CacheStore, InsertOutcome, SynthesisGate};
use crate::fingerprint::{Fingerprint, Fingerprinter};
use crate::model::{LoadedModels, ModelPool, ModelVariant};
use crate::telemetry;
use crate::types::{AudioArtifact, RequestLimits, SynthesisRequest};
use crate::{HuginnError, Result};

/// Where a returned artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheSource {
    /// Served from the store without touching the model.
    Hit,
    /// This call led a fresh synthesis.
    Generated,
    /// This call joined a synthesis another caller started.
    Joined,
}

impl CacheSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheSource::Hit => "hit",
            CacheSource::Generated => "miss",
            CacheSource::Joined => "joined",
        }
    }
}

/// Successful result of [`SpeechGateway::get_or_generate`].
#[derive(Debug, Clone)]
pub struct Synthesized {
    pub entry: Arc<CacheEntry>,
    pub source: CacheSource,
}

impl Synthesized {
    fn new(entry: Arc<CacheEntry>, source: CacheSource) -> Self {
        Self { entry, source }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.entry.fingerprint
    }

    pub fn artifact(&self) -> &AudioArtifact {
        &self.entry.artifact
    }
}

/// What [`SpeechGateway::clear`] removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub entries_cleared: usize,
    pub models_unloaded: usize,
}

/// Snapshot of gateway state for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayStatus {
    pub cache: CacheStats,
    pub models: LoadedModels,
    pub in_flight: usize,
}

/// Request-scoped speech synthesis cache.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct SpeechGateway {
    store: Arc<CacheStore>,
    gate: SynthesisGate,
    models: Arc<ModelPool>,
    fingerprinter: Fingerprinter,
    limits: RequestLimits,
}

impl SpeechGateway {
    pub(crate) fn new(
        store: Arc<CacheStore>,
        gate: SynthesisGate,
        models: Arc<ModelPool>,
        fingerprinter: Fingerprinter,
        limits: RequestLimits,
    ) -> Self {
        Self {
            store,
            gate,
            models,
            fingerprinter,
            limits,
        }
    }

    /// Return the audio for `request`, synthesizing it at most once per
    /// fingerprint across all concurrent callers.
    ///
    /// Model failures surface as [`HuginnError::SynthesisFailed`] (or
    /// [`HuginnError::ModelUnavailable`]) to every caller waiting on the
    /// fingerprint and are never cached. Dropping the returned future stops
    /// this caller from waiting; it never cancels the synthesis.
    #[instrument(
        name = "huginn.get_or_generate",
        skip(self, request),
        fields(fingerprint, language = %request.language(), source)
    )]
    pub async fn get_or_generate(&self, request: &SynthesisRequest) -> Result<Synthesized> {
        let fingerprint = self.fingerprinter.fingerprint(request);
        let span = Span::current();
        span.record("fingerprint", tracing::field::display(fingerprint));

        if let Some(entry) = self.store.lookup(&fingerprint) {
            span.record("source", CacheSource::Hit.as_str());
            debug!("cache hit");
            return Ok(Synthesized::new(entry, CacheSource::Hit));
        }

        match self.gate.acquire_or_join(fingerprint) {
            Admission::Follower(waiter) => {
                span.record("source", CacheSource::Joined.as_str());
                metrics::counter!(telemetry::SINGLE_FLIGHT_JOINS_TOTAL).increment(1);
                debug!("joining in-flight synthesis");
                let entry = waiter.wait().await?;
                Ok(Synthesized::new(entry, CacheSource::Joined))
            }
            Admission::Leader(ticket) => {
                // The previous leader may have published between our lookup
                // and acquiring the gate.
                if let Some(entry) = self.store.recheck(&fingerprint) {
                    span.record("source", CacheSource::Hit.as_str());
                    ticket.publish(Ok(Arc::clone(&entry)));
                    return Ok(Synthesized::new(entry, CacheSource::Hit));
                }

                span.record("source", CacheSource::Generated.as_str());
                let waiter = ticket.waiter();
                let job = SynthesisJob {
                    store: Arc::clone(&self.store),
                    models: Arc::clone(&self.models),
                    request: request.clone(),
                    fingerprint,
                    generation: self.store.generation(),
                };
                tokio::spawn(
                    async move {
                        let outcome = job.run().await;
                        ticket.publish(outcome);
                    }
                    .instrument(span.clone()),
                );

                let entry = waiter.wait().await?;
                Ok(Synthesized::new(entry, CacheSource::Generated))
            }
        }
    }

    /// Drop every cached artifact and unload every model.
    ///
    /// Syntheses already running still complete and reach the callers that
    /// joined them, but their results are not stored and later callers do
    /// not join them.
    #[instrument(name = "huginn.clear", skip(self))]
    pub async fn clear(&self) -> ClearReport {
        let entries_cleared = self.store.clear();
        let detached = self.gate.detach_all();
        let models_unloaded = self.models.clear().await;
        info!(entries_cleared, detached, models_unloaded, "cache cleared");
        ClearReport {
            entries_cleared,
            models_unloaded,
        }
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            cache: self.store.stats(),
            models: self.models.loaded(),
            in_flight: self.gate.in_flight(),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    /// Number of fingerprints currently being synthesized.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// The key `request` is cached under.
    pub fn fingerprint(&self, request: &SynthesisRequest) -> Fingerprint {
        self.fingerprinter.fingerprint(request)
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn gate(&self) -> &SynthesisGate {
        &self.gate
    }

    pub fn models(&self) -> &ModelPool {
        &self.models
    }
}

/// One leader's synthesis, owned by a spawned task.
struct SynthesisJob {
    store: Arc<CacheStore>,
    models: Arc<ModelPool>,
    request: SynthesisRequest,
    fingerprint: Fingerprint,
    generation: u64,
}

impl SynthesisJob {
    async fn run(self) -> Result<Arc<CacheEntry>> {
        let artifact = match self.synthesize().await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(error = %e, "synthesis failed");
                return Err(e);
            }
        };

        let entry = Arc::new(CacheEntry::new(self.fingerprint, artifact));
        match self
            .store
            .insert_if_current(Arc::clone(&entry), self.generation)
        {
            // First computed output stays canonical.
            InsertOutcome::AlreadyCached => Ok(self.store.peek(&self.fingerprint).unwrap_or(entry)),
            InsertOutcome::Inserted { evicted } => {
                debug!(bytes = entry.size_bytes(), evicted, "cached");
                Ok(entry)
            }
            InsertOutcome::Rejected { .. } | InsertOutcome::Stale => Ok(entry),
        }
    }

    async fn synthesize(&self) -> Result<AudioArtifact> {
        let variant = ModelVariant::for_language(self.request.language());
        let model = self.models.get(variant).await?;

        let start = Instant::now();
        let result = model
            .generate(&self.request)
            .await
            .and_then(|audio| AudioArtifact::encode(&audio))
            .map_err(HuginnError::into_synthesis_failure);

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::SYNTHESIS_TOTAL,
            "variant" => variant.as_str(),
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::SYNTHESIS_DURATION_SECONDS,
            "variant" => variant.as_str(),
        )
        .record(start.elapsed().as_secs_f64());

        if let Ok(artifact) = &result {
            debug!(
                model = model.name(),
                samples = artifact.num_samples(),
                elapsed_secs = start.elapsed().as_secs_f64(),
                "synthesized"
            );
        }
        result
    }
}
