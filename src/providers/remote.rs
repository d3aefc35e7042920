//! HTTP client for an external inference worker.
//!
//! The worker owns the neural model and exposes two endpoints:
//!
//! - `GET {base_url}/health`: any 2xx means the model can be used
//! - `POST {base_url}/generate`: JSON request, WAV response body

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::retry::{Operation, RetryConfig, RetryingSpeechModel, with_retry};
use crate::model::ModelVariant;
use crate::traits::{ModelLoader, SpeechModel};
use crate::types::{GeneratedAudio, SynthesisRequest};
use crate::{HuginnError, Result};

/// Default worker address.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8001";

/// Connection settings for the inference worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Per-call timeout. Default: 120s.
    pub timeout: Duration,
    pub retry: RetryConfig,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(120),
            retry: RetryConfig::default(),
        }
    }
}

impl RemoteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Loads [`RemoteModel`] handles after checking the worker is up.
pub struct RemoteModelLoader {
    http: Client,
    config: RemoteConfig,
}

impl RemoteModelLoader {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| HuginnError::Configuration(format!("http client: {e}")))?;
        Ok(Self { http, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    async fn check_health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url());
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.config.timeout))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(HuginnError::ModelUnavailable(format!(
                "worker health check returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    #[instrument(name = "remote.load", skip(self), fields(base_url = %self.config.base_url))]
    async fn load(&self, variant: ModelVariant) -> Result<Arc<dyn SpeechModel>> {
        with_retry(&self.config.retry, variant.as_str(), Operation::Health, || {
            self.check_health()
        })
        .await?;

        let model: Arc<dyn SpeechModel> = Arc::new(RemoteModel {
            http: self.http.clone(),
            generate_url: format!("{}/generate", self.base_url()),
            name: format!("remote-{variant}"),
            variant,
            timeout: self.config.timeout,
        });
        if self.config.retry.max_attempts > 1 {
            Ok(Arc::new(RetryingSpeechModel::new(
                model,
                variant.as_str(),
                self.config.retry.clone(),
            )))
        } else {
            Ok(model)
        }
    }
}

/// One model variant served by the inference worker.
pub struct RemoteModel {
    http: Client,
    generate_url: String,
    name: String,
    variant: ModelVariant,
    timeout: Duration,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    text: &'a str,
    language: &'a str,
    exaggeration: f32,
    cfg_weight: f32,
    temperature: f32,
    speed_factor: f32,
    multilingual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_prompt: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    detail: String,
}

#[async_trait]
impl SpeechModel for RemoteModel {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "remote.generate", skip(self, request), fields(model = %self.name))]
    async fn generate(&self, request: &SynthesisRequest) -> Result<GeneratedAudio> {
        let params = request.params();
        let body = GenerateBody {
            text: request.text(),
            language: request.language(),
            exaggeration: params.expressiveness,
            cfg_weight: params.guidance_weight,
            temperature: params.temperature,
            speed_factor: params.speed_factor,
            multilingual: self.variant == ModelVariant::Multilingual,
            audio_prompt: request.reference_audio().map(|a| BASE64.encode(a.bytes())),
        };

        let response = self
            .http
            .post(&self.generate_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let response = check_status(response, self.timeout).await?;

        let wav = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        debug!(bytes = wav.len(), "received audio");
        GeneratedAudio::from_wav(&wav)
    }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> HuginnError {
    if err.is_timeout() {
        HuginnError::Timeout(timeout)
    } else if err.is_connect() {
        HuginnError::ModelUnavailable(err.to_string())
    } else {
        HuginnError::SynthesisFailed(err.to_string())
    }
}

/// Map a worker status to the error taxonomy.
///
/// `ModelUnavailable` is reserved for statuses where the worker did not take
/// the call (502, 503); a 504 may leave work running and counts as a timeout.
async fn check_status(response: Response, timeout: Duration) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);

    Err(match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            HuginnError::ModelUnavailable(format!("worker returned {status}: {message}"))
        }
        StatusCode::GATEWAY_TIMEOUT => HuginnError::Timeout(timeout),
        _ => HuginnError::SynthesisFailed(format!("worker returned {status}: {message}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ReferenceAudio;

    #[test]
    fn body_uses_worker_field_names() {
        let request = SynthesisRequest::builder("Hola").language("es").build().unwrap();
        let params = request.params();
        let body = GenerateBody {
            text: request.text(),
            language: request.language(),
            exaggeration: params.expressiveness,
            cfg_weight: params.guidance_weight,
            temperature: params.temperature,
            speed_factor: params.speed_factor,
            multilingual: true,
            audio_prompt: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["text"], "Hola");
        assert_eq!(json["language"], "es");
        assert_eq!(json["multilingual"], true);
        assert!(json.get("audio_prompt").is_none());
        assert!(json.get("cfg_weight").is_some());
    }

    #[test]
    fn error_body_accepts_detail_or_error() {
        let a: ErrorBody = serde_json::from_str(r#"{"detail":"cuda oom"}"#).unwrap();
        let b: ErrorBody = serde_json::from_str(r#"{"error":"cuda oom"}"#).unwrap();
        assert_eq!(a.detail, b.detail);
    }

    #[test]
    fn reference_audio_is_base64_encoded() {
        let audio = ReferenceAudio::new(vec![0u8, 1, 2, 255]);
        assert_eq!(BASE64.encode(audio.bytes()), "AAEC/w==");
    }
}
