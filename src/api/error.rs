use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use super::models::ErrorResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing content id")]
    MissingIdentifier,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("payload too large: {0} bytes")]
    PayloadTooLarge(usize),
    #[error("extraction exhausted: {message}")]
    ExtractionExhausted {
        message: String,
        fallback_url: Option<String>,
    },
    #[error("{message}")]
    StreamRelayFailure {
        message: String,
        fallback_url: Option<String>,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingIdentifier | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ExtractionExhausted { .. }
            | ApiError::StreamRelayFailure { .. }
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingIdentifier => "MISSING_IDENTIFIER",
            ApiError::InvalidParameter(_) => "INVALID_PARAMETER",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::ExtractionExhausted { .. } => "EXTRACTION_EXHAUSTED",
            ApiError::StreamRelayFailure { .. } => "STREAM_RELAY_FAILURE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn fallback_url(&self) -> Option<&str> {
        match self {
            ApiError::ExtractionExhausted { fallback_url, .. }
            | ApiError::StreamRelayFailure { fallback_url, .. } => fallback_url.as_deref(),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
            fallback_url: self.fallback_url().map(String::from),
        };

        (status, Json(body)).into_response()
    }
}
