//! Route handlers.

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::cache::CacheStats;
use crate::gateway::ClearReport;
use crate::model::LoadedModels;
use crate::types::{
    ReferenceAudio, SUPPORTED_LANGUAGES, SynthesisRequest, VOICE_PROFILES, VoiceParams,
    VoiceProfile,
};
use crate::{HuginnError, PKG_VERSION, version_string};

const WAV_DISPOSITION: &str = "attachment; filename=generated.wav";

/// Raw multipart fields of a synthesis form.
#[derive(Debug, Default)]
struct SynthesisForm {
    text: Option<String>,
    language: Option<String>,
    voice: Option<String>,
    expressiveness: Option<f32>,
    guidance_weight: Option<f32>,
    temperature: Option<f32>,
    speed_factor: Option<f32>,
    reference_audio: Option<Bytes>,
}

impl SynthesisForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == "reference_audio" {
                let bytes = field.bytes().await.map_err(|e| {
                    ApiError::bad_request(format!("reference_audio read error: {e}"))
                })?;
                // Browsers send an empty part when no file was chosen.
                if !bytes.is_empty() {
                    form.reference_audio = Some(bytes);
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("{name} read error: {e}")))?;
            match name.as_str() {
                "text" => form.text = Some(value),
                "language" => form.language = Some(value.trim().to_string()),
                "voice" => form.voice = Some(value.trim().to_string()),
                "exaggeration" => form.expressiveness = Some(parse_number(&name, &value)?),
                "cfg_weight" => form.guidance_weight = Some(parse_number(&name, &value)?),
                "temperature" => form.temperature = Some(parse_number(&name, &value)?),
                "speed_factor" => form.speed_factor = Some(parse_number(&name, &value)?),
                _ => {}
            }
        }
        Ok(form)
    }

    /// Profile parameters (or defaults) overridden by explicit fields.
    fn params(&self) -> Result<VoiceParams, ApiError> {
        let mut params = match self.voice.as_deref().filter(|v| !v.is_empty()) {
            Some(name) => {
                VoiceProfile::find(name)
                    .ok_or_else(|| ApiError::bad_request(format!("unknown voice '{name}'")))?
                    .params
            }
            None => VoiceParams::default(),
        };
        if let Some(v) = self.expressiveness {
            params = params.expressiveness(v);
        }
        if let Some(v) = self.guidance_weight {
            params = params.guidance_weight(v);
        }
        if let Some(v) = self.temperature {
            params = params.temperature(v);
        }
        if let Some(v) = self.speed_factor {
            params = params.speed_factor(v);
        }
        Ok(params)
    }

    fn into_request(self, state: &AppState) -> Result<SynthesisRequest, ApiError> {
        let params = self.params()?;
        let text = self
            .text
            .ok_or_else(|| ApiError::bad_request("text is required"))?;

        let mut builder = SynthesisRequest::builder(text).params(params);
        if let Some(language) = self.language.filter(|l| !l.is_empty()) {
            builder = builder.language(language);
        }
        if let Some(audio) = self.reference_audio {
            builder = builder.reference_audio(ReferenceAudio::new(audio));
        }
        Ok(builder.build_with(state.gateway.limits())?)
    }
}

fn parse_number(name: &str, value: &str) -> Result<f32, ApiError> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("{name} must be a number, got '{value}'")))
}

/// `POST /synthesize`: multipart form in, WAV out.
pub(super) async fn synthesize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let request = SynthesisForm::read(multipart).await?.into_request(&state)?;

    // Waiting for a permit counts against the request timeout.
    let synthesized = tokio::time::timeout(state.request_timeout, async {
        let _permit = state
            .permits
            .acquire()
            .await
            .map_err(|_| HuginnError::ModelUnavailable("server shutting down".into()))?;
        state.gateway.get_or_generate(&request).await
    })
    .await
    .map_err(|_| {
        warn!(
            timeout_secs = state.request_timeout.as_secs_f64(),
            "request timed out; any started synthesis continues in background"
        );
        HuginnError::Timeout(state.request_timeout)
    })??;

    let fingerprint = HeaderValue::from_str(&synthesized.fingerprint().to_hex())
        .map_err(|e| ApiError::internal(e.to_string()))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/wav"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static(WAV_DISPOSITION),
    );
    headers.insert("x-cache", HeaderValue::from_static(synthesized.source.as_str()));
    headers.insert("x-fingerprint", fingerprint);

    Ok((headers, synthesized.artifact().wav().clone()).into_response())
}

#[derive(Debug, Serialize)]
pub(super) struct RootResponse {
    message: String,
    endpoints: Endpoints,
}

#[derive(Debug, Serialize)]
struct Endpoints {
    synthesize: &'static str,
    health: &'static str,
    clear_cache: &'static str,
    info: &'static str,
    voices: &'static str,
}

/// `GET /`
pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("huginn speech synthesis cache {PKG_VERSION}"),
        endpoints: Endpoints {
            synthesize: "/synthesize",
            health: "/health",
            clear_cache: "/clear_cache",
            info: "/api/info",
            voices: "/voices",
        },
    })
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
    version: String,
    cache: CacheStats,
    models_loaded: LoadedModels,
    in_flight: usize,
}

/// `GET /health`
pub(super) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = state.gateway.status();
    Json(HealthResponse {
        status: "healthy",
        version: version_string(),
        cache: status.cache,
        models_loaded: status.models,
        in_flight: status.in_flight,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct ClearResponse {
    message: &'static str,
    #[serde(flatten)]
    report: ClearReport,
}

/// `POST /clear_cache`
pub(super) async fn clear_cache(State(state): State<AppState>) -> Json<ClearResponse> {
    let report = state.gateway.clear().await;
    info!(
        entries = report.entries_cleared,
        models = report.models_unloaded,
        "cleared via api"
    );
    Json(ClearResponse {
        message: "Cache cleared successfully",
        report,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct InfoResponse {
    name: &'static str,
    version: &'static str,
    features: &'static [&'static str],
    supported_languages: &'static [&'static str],
}

/// `GET /api/info`
pub(super) async fn api_info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "huginn",
        version: PKG_VERSION,
        features: &[
            "Text-to-Speech",
            "Voice Cloning",
            "Multilingual Support",
            "Result Caching",
        ],
        supported_languages: SUPPORTED_LANGUAGES,
    })
}

#[derive(Debug, Serialize)]
pub(super) struct VoicesResponse {
    voices: &'static [VoiceProfile],
}

/// `GET /voices`
pub(super) async fn list_voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: VOICE_PROFILES,
    })
}
