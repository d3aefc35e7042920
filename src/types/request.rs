//! Synthesis request types and their validation.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::voice::VoiceProfile;
use crate::{HuginnError, Result};

/// Language ids the multilingual model accepts. `"en"` uses the English model.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "ar", "da", "de", "el", "en", "es", "fi", "fr", "he", "hi", "it", "ja", "ko", "ms", "nl", "no",
    "pl", "pt", "ru", "sv", "sw", "tr", "zh",
];

/// Language used when a request does not name one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Voice parameters forwarded to the model.
///
/// Field names follow what they control; the wire names used by the model
/// backend (`exaggeration`, `cfg_weight`) are applied at the transport edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// Emotional exaggeration, 0.0–2.0. Default: 0.5.
    pub expressiveness: f32,
    /// Classifier-free guidance weight, 0.0–1.0. Default: 0.5.
    pub guidance_weight: f32,
    /// Sampling temperature, (0.0, 5.0]. Default: 0.7.
    pub temperature: f32,
    /// Playback speed multiplier, 0.25–4.0. Default: 1.0.
    pub speed_factor: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            expressiveness: 0.5,
            guidance_weight: 0.5,
            temperature: 0.7,
            speed_factor: 1.0,
        }
    }
}

impl VoiceParams {
    pub fn expressiveness(mut self, value: f32) -> Self {
        self.expressiveness = value;
        self
    }

    pub fn guidance_weight(mut self, value: f32) -> Self {
        self.guidance_weight = value;
        self
    }

    pub fn temperature(mut self, value: f32) -> Self {
        self.temperature = value;
        self
    }

    pub fn speed_factor(mut self, value: f32) -> Self {
        self.speed_factor = value;
        self
    }

    /// Check every parameter against its allowed range.
    pub fn validate(&self) -> Result<()> {
        check_range("expressiveness", self.expressiveness, 0.0, 2.0, true)?;
        check_range("guidance_weight", self.guidance_weight, 0.0, 1.0, true)?;
        check_range("temperature", self.temperature, 0.0, 5.0, false)?;
        check_range("speed_factor", self.speed_factor, 0.25, 4.0, true)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32, min_inclusive: bool) -> Result<()> {
    let above_min = if min_inclusive {
        value >= min
    } else {
        value > min
    };
    if !value.is_finite() || !above_min || value > max {
        let open = if min_inclusive { '[' } else { '(' };
        return Err(HuginnError::InvalidRequest(format!(
            "{name} must be in {open}{min}, {max}], got {value}"
        )));
    }
    Ok(())
}

/// Uploaded reference audio for voice cloning.
///
/// The SHA-256 digest is computed once on construction and is the audio's
/// identity for fingerprinting; the filename it arrived under is irrelevant.
#[derive(Clone)]
pub struct ReferenceAudio {
    bytes: Bytes,
    digest: [u8; 32],
}

impl ReferenceAudio {
    /// Wrap uploaded bytes, hashing them. Does not validate the container;
    /// see [`RequestLimits`] for that.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let digest: [u8; 32] = Sha256::digest(&bytes).into();
        Self { bytes, digest }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// SHA-256 digest of the audio bytes.
    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    /// Hex-encoded digest.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }
}

impl std::fmt::Debug for ReferenceAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceAudio")
            .field("len", &self.bytes.len())
            .field("digest", &self.digest_hex())
            .finish()
    }
}

impl PartialEq for ReferenceAudio {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

/// Bounds applied when a request is built.
#[derive(Debug, Clone)]
pub struct RequestLimits {
    /// Maximum text length in characters. Default: 1,000.
    pub max_text_chars: usize,
    /// Maximum reference audio size in bytes. Default: 10 MiB.
    pub max_reference_bytes: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_text_chars: 1_000,
            max_reference_bytes: 10 * 1024 * 1024,
        }
    }
}

impl RequestLimits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.max_text_chars = n;
        self
    }

    pub fn max_reference_bytes(mut self, n: usize) -> Self {
        self.max_reference_bytes = n;
        self
    }
}

/// A validated synthesis request. Immutable once built.
///
/// ```rust
/// # use huginn::{SynthesisRequest, VoiceParams};
/// let request = SynthesisRequest::builder("Hello")
///     .params(VoiceParams::default().expressiveness(0.8))
///     .build()
///     .unwrap();
/// assert_eq!(request.language(), "en");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    text: Arc<str>,
    language: Arc<str>,
    params: VoiceParams,
    reference_audio: Option<ReferenceAudio>,
}

impl SynthesisRequest {
    pub fn builder(text: impl Into<String>) -> SynthesisRequestBuilder {
        SynthesisRequestBuilder::new(text)
    }

    /// Text to speak, verbatim.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    pub fn reference_audio(&self) -> Option<&ReferenceAudio> {
        self.reference_audio.as_ref()
    }

    /// Whether this request needs the multilingual model.
    pub fn is_multilingual(&self) -> bool {
        &*self.language != DEFAULT_LANGUAGE
    }
}

/// Builder for [`SynthesisRequest`].
#[derive(Debug, Clone)]
pub struct SynthesisRequestBuilder {
    text: String,
    language: Option<String>,
    params: VoiceParams,
    reference_audio: Option<ReferenceAudio>,
}

impl SynthesisRequestBuilder {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
            params: VoiceParams::default(),
            reference_audio: None,
        }
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn params(mut self, params: VoiceParams) -> Self {
        self.params = params;
        self
    }

    /// Use the parameters of a named preset.
    pub fn profile(mut self, profile: &VoiceProfile) -> Self {
        self.params = profile.params;
        self
    }

    pub fn reference_audio(mut self, audio: ReferenceAudio) -> Self {
        self.reference_audio = Some(audio);
        self
    }

    /// Validate against [`RequestLimits::default()`].
    pub fn build(self) -> Result<SynthesisRequest> {
        self.build_with(&RequestLimits::default())
    }

    /// Validate against explicit limits.
    pub fn build_with(self, limits: &RequestLimits) -> Result<SynthesisRequest> {
        if self.text.trim().is_empty() {
            return Err(HuginnError::InvalidRequest("text cannot be empty".into()));
        }
        let chars = self.text.chars().count();
        if chars > limits.max_text_chars {
            return Err(HuginnError::InvalidRequest(format!(
                "text too long ({chars} characters, max {})",
                limits.max_text_chars
            )));
        }

        let language = self
            .language
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return Err(HuginnError::InvalidRequest(format!(
                "unsupported language '{language}'"
            )));
        }

        self.params.validate()?;

        if let Some(audio) = &self.reference_audio {
            validate_reference_audio(audio, limits)?;
        }

        Ok(SynthesisRequest {
            text: self.text.into(),
            language: language.into(),
            params: self.params,
            reference_audio: self.reference_audio,
        })
    }
}

/// Reference audio must be a non-empty, readable WAV container within the
/// size limit.
fn validate_reference_audio(audio: &ReferenceAudio, limits: &RequestLimits) -> Result<()> {
    if audio.is_empty() {
        return Err(HuginnError::InvalidRequest(
            "reference audio is empty".into(),
        ));
    }
    if audio.len() > limits.max_reference_bytes {
        return Err(HuginnError::InvalidRequest(format!(
            "reference audio too large ({} bytes, max {})",
            audio.len(),
            limits.max_reference_bytes
        )));
    }
    let reader = hound::WavReader::new(Cursor::new(audio.bytes().as_ref())).map_err(|e| {
        HuginnError::InvalidRequest(format!("unreadable reference audio: {e}"))
    })?;
    if reader.duration() == 0 {
        return Err(HuginnError::InvalidRequest(
            "reference audio contains no samples".into(),
        ));
    }
    Ok(())
}
