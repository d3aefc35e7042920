//! Builder for configuring gateway instances

use std::sync::Arc;

use super::SpeechGateway;
use crate::cache::{CacheConfig, CacheStore, SynthesisGate};
use crate::fingerprint::Fingerprinter;
use crate::model::ModelPool;
use crate::providers::{RemoteConfig, RemoteModelLoader};
use crate::traits::{FixedModelLoader, ModelLoader, SpeechModel};
use crate::types::RequestLimits;
use crate::{HuginnError, Result};

/// Main entry point for creating gateway instances.
pub struct Huginn;

impl Huginn {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> HuginnBuilder {
        HuginnBuilder::new()
    }
}

/// Builder for configuring gateway instances.
pub struct HuginnBuilder {
    loader: Option<Arc<dyn ModelLoader>>,
    remote: Option<RemoteConfig>,
    cache: CacheConfig,
    limits: RequestLimits,
}

impl HuginnBuilder {
    pub fn new() -> Self {
        Self {
            loader: None,
            remote: None,
            cache: CacheConfig::default(),
            limits: RequestLimits::default(),
        }
    }

    /// Use one model for every language.
    pub fn model(mut self, model: Arc<dyn SpeechModel>) -> Self {
        self.loader = Some(Arc::new(FixedModelLoader::new(model)));
        self
    }

    /// Load models lazily, per variant, through `loader`.
    pub fn model_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Synthesize through a remote inference worker.
    ///
    /// Ignored when [`model`](Self::model) or
    /// [`model_loader`](Self::model_loader) is also set.
    pub fn remote(mut self, config: RemoteConfig) -> Self {
        self.remote = Some(config);
        self
    }

    /// Replace the whole cache configuration.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Set the maximum number of cached artifacts.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.cache.max_entries = n;
        self
    }

    /// Set the maximum total artifact bytes.
    pub fn max_bytes(mut self, n: u64) -> Self {
        self.cache.max_bytes = n;
        self
    }

    /// Set the float rounding precision used for fingerprints.
    pub fn float_precision(mut self, digits: u32) -> Self {
        self.cache.float_precision = digits;
        self
    }

    /// Set the limits applied when building requests from untrusted input.
    pub fn request_limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<SpeechGateway> {
        let loader: Arc<dyn ModelLoader> = match (self.loader, self.remote) {
            (Some(loader), _) => loader,
            (None, Some(remote)) => Arc::new(RemoteModelLoader::new(remote)?),
            (None, None) => return Err(HuginnError::NoModel),
        };

        let fingerprinter = Fingerprinter::new(self.cache.float_precision)?;

        Ok(SpeechGateway::new(
            Arc::new(CacheStore::new(&self.cache)),
            SynthesisGate::new(),
            Arc::new(ModelPool::new(loader)),
            fingerprinter,
            self.limits,
        ))
    }
}

impl Default for HuginnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
