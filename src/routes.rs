use std::{collections::HashSet, sync::Arc};

use axum::{
    Json, Router,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, Method,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    config::ConfigError,
    dispatcher::Dispatcher,
    error::ResolveError,
    model::{DownloadVideoBody, ResolveRequest, ResolvedMedia, Source},
};

pub const LIVENESS_MESSAGE: &str = "ClipGrab resolver API is live";

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    // No total timeout, so long transfers are not cut off.
    pub stream_client: reqwest::Client,
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/download-video", post(download_video))
        .route("/stream-video", post(stream_video))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health() -> &'static str {
    LIVENESS_MESSAGE
}

fn parse_request(
    payload: Result<Json<DownloadVideoBody>, JsonRejection>,
) -> Result<ResolveRequest, ResolveError> {
    let Json(body) = payload.map_err(|rejection| {
        debug!("Rejected request body: {rejection}");
        ResolveError::invalid_request(format!("Invalid request body: {}", rejection.body_text()))
    })?;

    ResolveRequest::try_from(body)
}

async fn download_video(
    State(state): State<AppState>,
    payload: Result<Json<DownloadVideoBody>, JsonRejection>,
) -> Result<Json<ResolvedMedia>, ResolveError> {
    let request = parse_request(payload)?;
    let media = state.dispatcher.resolve(&request).await?;
    Ok(Json(media))
}

async fn stream_video(
    State(state): State<AppState>,
    payload: Result<Json<DownloadVideoBody>, JsonRejection>,
) -> Result<Response, ResolveError> {
    let request = parse_request(payload)?;
    if Dispatcher::select_source(&request)? != Source::YouTube {
        return Err(ResolveError::UnsupportedPlatform);
    }

    let media = state.dispatcher.resolve(&request).await?;

    let upstream = state
        .stream_client
        .get(&media.download_url)
        .send()
        .await
        .map_err(|error| {
            warn!("Error opening media stream for {}: {error}", media.filename);
            ResolveError::unreachable("Cannot reach media host")
        })?;

    let status = upstream.status();
    if !status.is_success() {
        warn!("Media host answered {status} for {}", media.filename);
        return Err(ResolveError::upstream_failed(format!(
            "Media host answered {status}"
        )));
    }

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, media_content_type(upstream.headers(), &media));
    if let Some(length) = upstream.content_length() {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }
    headers.insert(
        CONTENT_DISPOSITION,
        HeaderValue::from_str(&build_content_disposition(&media.filename))
            .map_err(|_| ResolveError::upstream_failed("Could not build download headers"))?,
    );

    info!("Streaming {} to client", media.filename);
    Ok((headers, Body::from_stream(upstream.bytes_stream())).into_response())
}

// Audio-only renditions are m4a or webm; the host's media type wins over the
// nominal one for the requested format.
fn media_content_type(upstream: &HeaderMap, media: &ResolvedMedia) -> HeaderValue {
    upstream
        .get(CONTENT_TYPE)
        .filter(|value| {
            value.to_str().is_ok_and(|value| {
                let value = value.to_ascii_lowercase();
                value.starts_with("audio/") || value.starts_with("video/")
            })
        })
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(media.format.content_type()))
}

pub fn build_cors_layer(allowed_origins: &[String]) -> Result<CorsLayer, ConfigError> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]);

    if allowed_origins.is_empty() {
        return Ok(layer.allow_origin(Any));
    }

    let normalized_origins = allowed_origins
        .iter()
        .map(|origin| {
            normalize_origin(origin).ok_or_else(|| {
                ConfigError::invalid("ALLOWED_ORIGINS", origin, "expected https://host[:port]")
            })
        })
        .collect::<Result<HashSet<_>, _>>()?;
    info!(
        "CORS allow-list loaded with {} origin(s): {:?}",
        normalized_origins.len(),
        normalized_origins
    );

    let allowed = Arc::new(normalized_origins);
    Ok(layer.allow_origin(AllowOrigin::predicate(
        move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .ok()
                .and_then(normalize_origin)
                .is_some_and(|value| allowed.contains(&value))
        },
    )))
}

fn normalize_origin(value: &str) -> Option<String> {
    let parsed = Url::parse(value).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let scheme = parsed.scheme();
    if !matches!(scheme, "http" | "https") {
        return None;
    }
    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return None;
    }

    // `Url` already drops the scheme's default port.
    match parsed.port() {
        Some(port) => Some(format!("{scheme}://{host}:{port}")),
        None => Some(format!("{scheme}://{host}")),
    }
}

fn build_content_disposition(filename: &str) -> String {
    let safe_ascii = sanitize_ascii_filename(filename);
    format!(
        "attachment; filename=\"{safe_ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

fn sanitize_ascii_filename(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() || matches!(character, '.' | '-' | '_') {
                character
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        "video.mp4".to_string()
    } else {
        sanitized
    }
}
