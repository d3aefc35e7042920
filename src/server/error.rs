//! Mapping from [`HuginnError`] to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::HuginnError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    detail: String,
}

/// An error rendered as `{"detail": "..."}` with a matching status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl From<HuginnError> for ApiError {
    fn from(err: HuginnError) -> Self {
        let status = match &err {
            HuginnError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            HuginnError::ModelUnavailable(_) | HuginnError::NoModel => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            HuginnError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HuginnError::SynthesisFailed(_)
            | HuginnError::EmptyAudio
            | HuginnError::Audio(_)
            | HuginnError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            detail: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn status_follows_error_kind() {
        let cases = [
            (HuginnError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (HuginnError::SynthesisFailed("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (HuginnError::ModelUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (HuginnError::Timeout(Duration::from_secs(1)), StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }
}
