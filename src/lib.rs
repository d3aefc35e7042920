//! Huginn - single-flight result cache for neural text-to-speech
//!
//! Speech synthesis is slow and expensive, and the same sentence with the
//! same voice settings is requested over and over. This crate puts a
//! request-scoped cache in front of an opaque speech model:
//!
//! - every request is reduced to a deterministic [`Fingerprint`] of its
//!   text, language, voice parameters and reference-audio content
//! - finished audio lives in a bounded LRU [`CacheStore`]
//! - concurrent requests for the same fingerprint share one model call
//!   through the [`SynthesisGate`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use huginn::{Huginn, RemoteConfig, SynthesisRequest, VoiceParams};
//!
//! #[tokio::main]
//! async fn main() -> huginn::Result<()> {
//!     let gateway = Huginn::builder()
//!         .remote(RemoteConfig::new("http://127.0.0.1:8001"))
//!         .max_entries(512)
//!         .build()?;
//!
//!     let request = SynthesisRequest::builder("Hello there!")
//!         .params(VoiceParams::default().expressiveness(0.7))
//!         .build()?;
//!
//!     let audio = gateway.get_or_generate(&request).await?;
//!     println!("{} bytes ({:?})", audio.artifact().size_bytes(), audio.source);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod model;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use cache::{CacheConfig, CacheEntry, CacheStats, CacheStore, InsertOutcome, SynthesisGate};
pub use error::{HuginnError, Result};
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use gateway::{
    CacheSource, ClearReport, GatewayStatus, Huginn, HuginnBuilder, SpeechGateway, Synthesized,
};
pub use model::{LoadedModels, ModelPool, ModelVariant};
pub use providers::{RemoteConfig, RemoteModel, RemoteModelLoader, RetryConfig};
pub use traits::{FixedModelLoader, ModelLoader, SpeechModel};
pub use version::{PKG_VERSION, version_string};

// Re-export all types
pub use types::{
    AudioArtifact, DEFAULT_LANGUAGE, GeneratedAudio, ReferenceAudio, RequestLimits,
    SUPPORTED_LANGUAGES, SynthesisRequest, SynthesisRequestBuilder, VOICE_PROFILES, VoiceParams,
    VoiceProfile,
};
