//! HTTP gateway for hudgate.
//!
//! Endpoints:
//!
//! - `POST /chat`        — Send a message, receive the reply as an SSE stream
//! - `POST /speak`       — Text-to-speech relay, streams `audio/mpeg`
//! - `GET  /search`      — Web search lookup (static fallback when offline)
//! - `POST /weather`     — Current-conditions lookup (demo fallback)
//! - `POST /rag/upload`  — Add a passage to the retrieval store
//! - `GET  /rag/query`   — Preview the context block for a query
//! - `POST /transcribe`  — Transcription placeholder
//! - `GET  /health`      — Liveness probe
//!
//! Built on Axum for high performance async HTTP.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use hudgate_core::error::SpeechError;
use hudgate_core::message::TurnRequest;
use hudgate_core::retrieval::{PassageStore, render_context_block};
use hudgate_core::upstream::StreamEvent;
use hudgate_retrieval::InMemoryPassageStore;
use hudgate_services::{SpeechSynthesizer, WeatherService, WebSearchService};
use hudgate_turn::TurnController;

/// How many passages `/rag/query` previews.
const RAG_PREVIEW_LIMIT: usize = 2;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub controller: TurnController,
    pub store: Arc<dyn PassageStore>,
    pub speech: SpeechSynthesizer,
    pub search: WebSearchService,
    pub weather: WeatherService,
    pub start_time: chrono::DateTime<chrono::Utc>,
}

pub type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
///
/// CORS is deliberately permissive — the gateway fronts a local HUD
/// frontend served from another origin. Request bodies are capped at 1 MB.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/speak", post(speak_handler))
        .route("/search", get(search_handler))
        .route("/weather", post(weather_handler))
        .route("/rag/upload", post(rag_upload_handler))
        .route("/rag/query", get(rag_query_handler))
        .route("/transcribe", post(transcribe_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the gateway state from configuration.
pub fn build_state(config: &hudgate_config::AppConfig) -> SharedState {
    let adapter = hudgate_providers::build_from_config(config);

    let store: Arc<dyn PassageStore> = if config.retrieval.seed_corpus {
        Arc::new(InMemoryPassageStore::with_seed_corpus())
    } else {
        Arc::new(InMemoryPassageStore::new())
    };

    let controller = TurnController::new(
        adapter,
        store.clone(),
        &config.personality,
        config.retrieval.limit,
    );

    Arc::new(GatewayState {
        controller,
        store,
        speech: SpeechSynthesizer::new(&config.speech),
        search: WebSearchService::new(&config.search),
        weather: WeatherService::new(&config.weather),
        start_time: chrono::Utc::now(),
    })
}

/// Start the gateway HTTP server.
pub async fn start(config: hudgate_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let state = build_state(&config);
    let app = build_router(state);

    info!(addr = %addr, provider = %config.provider, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Chat (SSE) ────────────────────────────────────────────────────────────

/// Serialize one canonical event as its SSE data payload.
fn event_payload(event: StreamEvent) -> String {
    match event {
        StreamEvent::TextDelta(text) => serde_json::json!({ "text": text }).to_string(),
        StreamEvent::Done => "[DONE]".to_string(),
        StreamEvent::Error(error) => serde_json::json!({ "error": error }).to_string(),
    }
}

/// `POST /chat` — run a turn, stream the reply as SSE events.
///
/// Events are forwarded as the upstream produces them; the connection
/// closes after the terminal `[DONE]` or error payload. Client disconnect
/// drops the stream, which cancels the upstream read.
async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<TurnRequest>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    info!(
        history = payload.history.len(),
        use_retrieval = payload.use_retrieval,
        "chat request"
    );

    let rx = state.controller.run(payload).await;
    let stream =
        ReceiverStream::new(rx).map(|event| Ok(SseEvent::default().data(event_payload(event))));

    Sse::new(stream)
}

// ── Speech ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SpeakRequest {
    text: String,
    #[serde(default)]
    voice_id: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// `POST /speak` — relay text-to-speech, streaming `audio/mpeg` bytes.
async fn speak_handler(
    State(state): State<SharedState>,
    Json(payload): Json<SpeakRequest>,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    let rx = state
        .speech
        .synthesize(&payload.text, payload.voice_id.as_deref())
        .await
        .map_err(|e| {
            let status = match &e {
                SpeechError::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
                SpeechError::Upstream { status, .. } => {
                    StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
                }
                SpeechError::Network(_) => StatusCode::BAD_GATEWAY,
            };
            error!(error = %e, "Speech synthesis failed");
            (status, Json(ErrorResponse { error: e.to_string() }))
        })?;

    let body = axum::body::Body::from_stream(ReceiverStream::new(rx));

    Ok((
        [(header::CONTENT_TYPE, "audio/mpeg")],
        body,
    )
        .into_response())
}

// ── Lookups ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_search_count")]
    count: usize,
}

fn default_search_count() -> usize {
    3
}

/// `GET /search?query=…&count=…` — web search with fallback.
async fn search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    Json(state.search.search(&params.query, params.count).await)
}

#[derive(Deserialize)]
struct WeatherRequest {
    latitude: f64,
    longitude: f64,
}

/// `POST /weather` — current conditions with demo fallback.
async fn weather_handler(
    State(state): State<SharedState>,
    Json(payload): Json<WeatherRequest>,
) -> impl IntoResponse {
    Json(
        state
            .weather
            .current(payload.latitude, payload.longitude)
            .await,
    )
}

// ── Retrieval ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RagUploadRequest {
    content: String,
    source: String,
}

#[derive(Serialize)]
struct RagUploadResponse {
    id: String,
    status: &'static str,
}

/// `POST /rag/upload` — append a passage to the store.
async fn rag_upload_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RagUploadRequest>,
) -> Result<Json<RagUploadResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.store.store(&payload.content, &payload.source).await {
        Ok(id) => Ok(Json(RagUploadResponse { id, status: "ok" })),
        Err(e) => {
            error!(error = %e, "Passage upload failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse { error: e.to_string() }),
            ))
        }
    }
}

#[derive(Deserialize)]
struct RagQueryParams {
    query: String,
}

#[derive(Serialize)]
struct RagQueryResponse {
    context: Option<String>,
}

/// `GET /rag/query?query=…` — preview the context block for a query.
async fn rag_query_handler(
    State(state): State<SharedState>,
    Query(params): Query<RagQueryParams>,
) -> Json<RagQueryResponse> {
    let passages = state.store.retrieve(&params.query, RAG_PREVIEW_LIMIT).await;
    Json(RagQueryResponse {
        context: render_context_block(&passages),
    })
}

// ── Misc ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TranscribeResponse {
    text: &'static str,
}

/// `POST /transcribe` — placeholder until a speech-to-text backend lands.
async fn transcribe_handler() -> Json<TranscribeResponse> {
    Json(TranscribeResponse {
        text: "This is a placeholder for the transcription service.",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    started_at: String,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        started_at: state.start_time.to_rfc3339(),
    })
}
