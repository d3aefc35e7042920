//! Public types for the Huginn API.

mod audio;
mod request;
mod voice;

pub use audio::{AudioArtifact, GeneratedAudio};
pub use request::{
    DEFAULT_LANGUAGE, ReferenceAudio, RequestLimits, SUPPORTED_LANGUAGES, SynthesisRequest,
    SynthesisRequestBuilder, VoiceParams,
};
pub use voice::{VOICE_PROFILES, VoiceProfile};
