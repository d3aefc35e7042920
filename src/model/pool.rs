//! Lazily loaded model handles, one per variant.
//!
//! Backed by moka's async cache: concurrent first requests for the same
//! variant share a single load, failed loads are not cached, and
//! [`ModelPool::clear`] unloads everything so the next request reloads.

use std::sync::Arc;
use std::time::Instant;

use moka::future::Cache;
use tracing::{info, warn};

use super::{LoadedModels, ModelVariant};
use crate::telemetry;
use crate::traits::{ModelLoader, SpeechModel};
use crate::{HuginnError, Result};

/// Thread-safe pool of loaded [`SpeechModel`] handles.
pub struct ModelPool {
    loader: Arc<dyn ModelLoader>,
    models: Cache<ModelVariant, Arc<dyn SpeechModel>>,
}

impl ModelPool {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            // Two variants; capacity is never the limiting factor.
            models: Cache::new(8),
        }
    }

    /// Get the model for `variant`, loading it on first use.
    pub async fn get(&self, variant: ModelVariant) -> Result<Arc<dyn SpeechModel>> {
        self.models
            .try_get_with(variant, self.load(variant))
            .await
            .map_err(|e: Arc<HuginnError>| (*e).clone())
    }

    async fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SpeechModel>> {
        info!(%variant, "loading model");
        let start = Instant::now();
        let result = self.loader.load(variant).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::MODEL_LOADS_TOTAL,
            "variant" => variant.as_str(),
            "status" => status,
        )
        .increment(1);
        match &result {
            Ok(model) => info!(
                %variant,
                model = model.name(),
                elapsed_secs = start.elapsed().as_secs_f64(),
                "model loaded"
            ),
            Err(e) => warn!(%variant, error = %e, "model load failed"),
        }
        result
    }

    /// Whether a model for `variant` is currently loaded.
    pub fn is_loaded(&self, variant: ModelVariant) -> bool {
        self.models.contains_key(&variant)
    }

    pub fn loaded(&self) -> LoadedModels {
        LoadedModels {
            english: self.is_loaded(ModelVariant::English),
            multilingual: self.is_loaded(ModelVariant::Multilingual),
        }
    }

    /// Unload every model. Returns how many were loaded.
    pub async fn clear(&self) -> usize {
        let loaded = self.models.iter().count();
        self.models.invalidate_all();
        self.models.run_pending_tasks().await;
        loaded
    }
}
