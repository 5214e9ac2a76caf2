//! HTTP server exposing channel feeds as RSS.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/{channel}` | Assemble the channel's feed and return RSS |
//! | `GET`  | `/watch` | Resolve a video's media URL and redirect to it |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/{channel}` accepts `limit`, `format`, and `mimeType` query
//! parameters; each falls back to its configured default. An invalid or
//! zero `limit` is treated as unset rather than rejected, so a
//! misconfigured podcast client still gets a feed.
//!
//! # Error Contract
//!
//! Error responses are JSON:
//!
//! ```json
//! { "error": { "code": "upstream", "message": "could not read channel information" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `upstream` (502),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted: feeds are public
//! documents and browser-based podcast players fetch them cross-origin.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::cache::VideoCache;
use crate::config::Config;
use crate::feed::FeedService;
use crate::rss::{render_rss, FeedOptions};
use crate::youtube::YoutubeClient;
use crate::ytdlp;

/// Shared application state passed to all route handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
struct AppState {
    /// Application configuration (wrapped in `Arc` for cheap cloning
    /// across handlers).
    config: Arc<Config>,
    /// Feed service with the process-wide cache handle injected.
    service: Arc<FeedService>,
}

/// Starts the HTTP server.
///
/// Binds to the address configured in `[server].bind` and registers all
/// route handlers. The server runs until the process is terminated.
pub async fn run_server(config: &Config, cache: Arc<dyn VideoCache>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let client = YoutubeClient::new(config.api_key()?, config.api.page_size);
    let state = AppState {
        config: Arc::new(config.clone()),
        service: Arc::new(FeedService::new(client, cache)),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/watch", get(handle_watch))
        .route("/{channel}", get(handle_channel))
        .layer(cors)
        .with_state(state);

    println!("tubecast listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

/// Inner error detail with a machine-readable code and human-readable
/// message.
#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"upstream"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Constructs a 404 Not Found error.
fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

/// Constructs a 502 error for failures against the upstream API or the
/// media URL resolver.
fn upstream_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream".to_string(),
        message: message.into(),
    }
}

/// Constructs a 500 Internal Server Error.
fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Maps feed assembly failures to HTTP statuses. An unknown channel is the
/// client's mistake; everything else that went wrong happened between us
/// and the upstream API.
fn classify_feed_error(err: anyhow::Error) -> AppError {
    let msg = format!("{err:#}");
    if msg.contains("could not find channel") {
        not_found(msg)
    } else {
        upstream_error("could not read channel information".to_string())
    }
}

// ============ GET /health ============

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    /// Always `"ok"` when the server is running.
    status: String,
    /// The crate version from `Cargo.toml`.
    version: String,
}

/// Handler for `GET /health`.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /{channel} ============

#[derive(Deserialize)]
struct ChannelQuery {
    limit: Option<String>,
    format: Option<String>,
    #[serde(rename = "mimeType")]
    mime_type: Option<String>,
}

/// Handler for `GET /{channel}`.
///
/// Assembles the channel's feed (live + cache) and renders it as RSS with
/// enclosures pointing back at this server's `/watch` endpoint.
async fn handle_channel(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(query): Query<ChannelQuery>,
) -> Result<Response, AppError> {
    info!(%channel, "GET /{{channel}}");

    let limit = query
        .limit
        .as_deref()
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|&limit| limit > 0)
        .unwrap_or(state.config.feed.default_limit);

    let feed = state
        .service
        .channel_feed(&channel, limit)
        .await
        .map_err(|err| {
            error!(%channel, error = format!("{err:#}"), "feed assembly failed");
            classify_feed_error(err)
        })?;

    let enclosure_base = url::Url::parse(&state.config.server.base_url)
        .map_err(|err| internal_error(format!("invalid base url: {err}")))?;
    let opts = FeedOptions {
        format: query.format,
        mime_type: query
            .mime_type
            .unwrap_or_else(|| state.config.feed.mime_type.clone()),
        enclosure_base: Some(enclosure_base),
    };

    let body = render_rss(&feed, &opts)
        .map_err(|err| internal_error(format!("could not render feed: {err}")))?;

    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        body,
    )
        .into_response())
}

// ============ GET /watch ============

#[derive(Deserialize)]
struct WatchQuery {
    v: Option<String>,
    format: Option<String>,
}

/// Handler for `GET /watch`.
///
/// Resolves the video's direct media URL through the configured downloader
/// command and redirects the client to it.
async fn handle_watch(
    State(state): State<AppState>,
    Query(query): Query<WatchQuery>,
) -> Result<Redirect, AppError> {
    let video_id = query
        .v
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request("missing video id"))?;
    info!(%video_id, "GET /watch");

    let format = query
        .format
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| state.config.feed.format.clone());

    let media_url = ytdlp::resolve_media_url(&state.config.feed.ytdl_command, &format, &video_id)
        .await
        .map_err(|err| {
            error!(%video_id, error = format!("{err:#}"), "media url resolution failed");
            upstream_error("extracting media url failed")
        })?;

    Ok(Redirect::temporary(&media_url))
}
