//! Huginn error types

/// Huginn error types.
///
/// `Clone` so that a single synthesis outcome can be handed to every caller
/// waiting on the same fingerprint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HuginnError {
    // Request errors
    /// Malformed text, out-of-range parameters or unreadable reference audio.
    /// Rejected before fingerprinting; never reaches the cache.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Synthesis errors
    /// The external model raised. Shared by all waiters, never cached.
    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("model returned no audio")]
    EmptyAudio,

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("audio error: {0}")]
    Audio(String),

    // Transport errors
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    // Configuration errors
    #[error("no speech model configured")]
    NoModel,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HuginnError {
    /// Normalise an error raised by a model into the synthesis taxonomy.
    ///
    /// Anything that is not already a synthesis-side error becomes
    /// [`HuginnError::SynthesisFailed`].
    pub fn into_synthesis_failure(self) -> Self {
        match self {
            e @ (HuginnError::SynthesisFailed(_)
            | HuginnError::EmptyAudio
            | HuginnError::ModelUnavailable(_)) => e,
            other => HuginnError::SynthesisFailed(other.to_string()),
        }
    }

    /// Whether retrying the same backend call right away may succeed.
    ///
    /// Narrower than [`is_retryable`](Self::is_retryable): a model that
    /// raised is not called again for the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HuginnError::ModelUnavailable(_) | HuginnError::Timeout(_)
        )
    }

    /// Whether the backend refused the call or never received it, so no
    /// work was started. The only failures safe to retry for generation.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, HuginnError::ModelUnavailable(_))
    }

    /// Whether a later identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HuginnError::SynthesisFailed(_)
                | HuginnError::EmptyAudio
                | HuginnError::ModelUnavailable(_)
                | HuginnError::Timeout(_)
        )
    }
}

impl From<hound::Error> for HuginnError {
    fn from(err: hound::Error) -> Self {
        HuginnError::Audio(err.to_string())
    }
}

/// Result type alias for Huginn operations
pub type Result<T> = std::result::Result<T, HuginnError>;
