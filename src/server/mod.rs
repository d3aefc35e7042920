//! HTTP daemon surface.
//!
//! This module provides:
//! - Configuration types and file resolution (`config`)
//! - The axum router and handlers (`handlers`)
//! - Error-to-status mapping (`error`)
//!
//! The router holds an `Arc<SpeechGateway>`; every request goes through the
//! same cache, gate and model pool.

pub mod config;
mod error;
mod handlers;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;

use crate::SpeechGateway;

pub use error::ApiError;

/// Multipart overhead allowed on top of the reference-audio limit.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<SpeechGateway>,
    pub permits: Arc<Semaphore>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        gateway: Arc<SpeechGateway>,
        max_concurrent_requests: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            permits: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
            request_timeout,
        }
    }
}

/// Build the HTTP router.
pub fn router(state: AppState) -> Router {
    let body_limit = state
        .gateway
        .limits()
        .max_reference_bytes
        .saturating_add(FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::root))
        .route("/synthesize", post(handlers::synthesize))
        .route("/health", get(handlers::health))
        .route("/clear_cache", post(handlers::clear_cache))
        .route("/api/info", get(handlers::api_info))
        .route("/voices", get(handlers::list_voices))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
