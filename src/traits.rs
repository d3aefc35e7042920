//! Seams to the external speech model.

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::model::ModelVariant;
use crate::types::{GeneratedAudio, SynthesisRequest};

/// An opaque text-to-speech model.
///
/// Implementations wrap whatever actually produces audio: a local inference
/// runtime, a worker process, a remote service. The call may take seconds
/// and is never made while a cache lock is held. It is not assumed to be
/// cancellable; the gateway always lets it run to completion.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Synthesize speech for an already-validated request.
    ///
    /// Errors surface to every caller waiting on the same fingerprint as
    /// [`HuginnError::SynthesisFailed`](crate::HuginnError::SynthesisFailed)
    /// and are never cached.
    async fn generate(&self, request: &SynthesisRequest) -> Result<GeneratedAudio>;
}

/// Produces model handles on demand, one per [`ModelVariant`].
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SpeechModel>>;
}

/// Loader that hands out the same model for every variant.
pub struct FixedModelLoader {
    model: Arc<dyn SpeechModel>,
}

impl FixedModelLoader {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ModelLoader for FixedModelLoader {
    async fn load(&self, _variant: ModelVariant) -> Result<Arc<dyn SpeechModel>> {
        Ok(Arc::clone(&self.model))
    }
}
