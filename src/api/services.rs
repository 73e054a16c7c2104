use axum::{
    Json,
    extract::{Query, RawQuery, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures::future::join_all;
use http_body_util::BodyExt;
use std::collections::HashMap;
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{LocatedResponse, ProbeResponse, ProbeStatus, ResolveParams, ResolvedLink},
    state::AppState,
    validation::{ApiRequest, parse_request},
};
use crate::resolver::MediaKind;
use crate::tunnel::{RelayRequest, TunnelError, headers};

/// Resolve endpoint (GET /api/resolve)
pub async fn resolve_get(
    State(state): State<AppState>,
    Query(params): Query<ResolveParams>,
) -> Result<Response, ApiError> {
    handle(&state, params).await
}

/// Resolve endpoint (POST /api/resolve)
///
/// Accepts the same keys as the GET form, in the query string, in an
/// `application/x-www-form-urlencoded` body, or both. Body values win.
pub async fn resolve_post(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<Response, ApiError> {
    let body_bytes = read_body(body, state.config.server.max_form_bytes).await?;

    if !body_bytes.is_empty() {
        let content_type = headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::InvalidParameter("missing Content-Type header".into()))?;
        super::utils::parse_form_content_type(content_type)?;
    }

    let query_pairs = url::form_urlencoded::parse(query.as_deref().unwrap_or_default().as_bytes());
    let body_pairs = url::form_urlencoded::parse(&body_bytes);
    let params = ResolveParams::from_pairs(query_pairs.chain(body_pairs));

    handle(&state, params).await
}

/// Dispatch on the interpreted request
///
/// ## Modes:
/// - proxy: stream an arbitrary mirror URL back (CORS bypass)
/// - probe: resolve each requested kind, answer with JSON links
/// - tunnel: relay the bytes, or with `get_url` answer with the URL only
async fn handle(state: &AppState, params: ResolveParams) -> Result<Response, ApiError> {
    match parse_request(params)? {
        ApiRequest::Proxy { url } => {
            let relay = state.tunnel.proxy(&url).await.map_err(|e| relay_error(e, None))?;
            Ok(relay.into_response())
        }
        ApiRequest::Probe { content_id, kind } => {
            let response = probe(state, &content_id, kind).await;
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        ApiRequest::Tunnel { request, url_only } => {
            let fallback_url = fallback_for(state, &request);
            if url_only {
                let located = state
                    .tunnel
                    .locate(&request)
                    .await
                    .map_err(|e| relay_error(e, fallback_url))?;
                let body = LocatedResponse {
                    url: located.url,
                    title: located.title,
                    filename: located.filename,
                };
                Ok((StatusCode::OK, Json(body)).into_response())
            } else {
                let relay = state
                    .tunnel
                    .relay(&request)
                    .await
                    .map_err(|e| relay_error(e, fallback_url))?;
                info!(
                    content_id = ?request.content_id,
                    origin = %relay.origin(),
                    length = ?relay.content_length(),
                    "Tunnel streaming"
                );
                Ok(relay.into_response())
            }
        }
    }
}

/// Probe mode: every requested kind resolved concurrently, each through the
/// full phase chain. Exhaustion is reported in-band, never as an HTTP error.
async fn probe(state: &AppState, content_id: &str, kind: MediaKind) -> ProbeResponse {
    let kinds = kind.expand();
    let runs = join_all(kinds.iter().map(|&k| state.chain.run(content_id, k))).await;

    let mut response = ProbeResponse {
        audio: None,
        video: None,
        fallback_url: state.config.fallback.link_for(content_id),
        status: ProbeStatus::FallbackRequired,
        errors: None,
    };
    let mut errors = Vec::new();

    for (&k, run) in kinds.iter().zip(runs) {
        match run.into_result() {
            Ok(candidate) => {
                let stem = headers::sanitize_filename(Some(&candidate.title), Some(content_id));
                let link = ResolvedLink {
                    url: candidate.source_url,
                    filename: headers::filename_for(&stem, k),
                };
                match k {
                    MediaKind::Audio => response.audio = Some(link),
                    _ => response.video = Some(link),
                }
            }
            Err(e) => errors.push(format!("{k}: {e}")),
        }
    }

    if response.audio.is_some() || response.video.is_some() {
        response.status = ProbeStatus::Ready;
    } else {
        warn!(content_id, %kind, "Probe found no stream, fallback required");
    }
    if !errors.is_empty() {
        response.errors = Some(errors);
    }
    response
}

fn fallback_for(state: &AppState, request: &RelayRequest) -> Option<String> {
    request
        .content_id
        .as_deref()
        .map(|id| state.config.fallback.link_for(id))
}

fn relay_error(error: TunnelError, fallback_url: Option<String>) -> ApiError {
    match error {
        TunnelError::Resolution(e) => ApiError::ExtractionExhausted {
            message: e.to_string(),
            fallback_url,
        },
        TunnelError::StreamRelayFailure(msg) => ApiError::StreamRelayFailure {
            message: format!("stream relay failed: {msg}"),
            fallback_url,
        },
        TunnelError::MissingSource => ApiError::MissingIdentifier,
        TunnelError::InvalidUrl(msg) => ApiError::InvalidParameter(msg),
    }
}

/// Reads the request body and enforces the form size limit
async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Vec<u8>, ApiError> {
    let data = body
        .collect()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?
        .to_bytes()
        .to_vec();

    super::utils::validate_body_size(&data, max_size)?;

    Ok(data)
}

/// Health check endpoint (GET /health)
///
/// Reports the resolver wiring and the process counters. Returns 503 when
/// no extraction phase is configured.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());

    let phases = state.chain.backends();
    let resolver_status = if phases.is_empty() {
        "unhealthy".to_string()
    } else {
        let names: Vec<_> = phases.iter().map(|b| b.as_str()).collect();
        format!("healthy ({})", names.join(", "))
    };
    components.insert("resolver".to_string(), resolver_status);

    let all_healthy = components.values().all(|status| status.starts_with("healthy"));
    let (overall_status, status_code) = if all_healthy {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = super::models::HealthResponse {
        status: overall_status.to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    };

    (status_code, Json(response))
}
